//! Hook for the audio microcode interpreter run on each audio list.

use crate::registers::AudioRegisters;

/// Executes one RSP audio task. Samples it produces reach the AI through
/// RDRAM and the usual `len_changed` path, not through this trait.
pub trait AudioListHandler: Send {
    fn process(&mut self, registers: &mut dyn AudioRegisters);
}

/// Handler used when no interpreter is plugged in.
#[derive(Default)]
pub struct SilentAudioList {
    lists: u64,
}

impl SilentAudioList {
    pub fn lists_seen(&self) -> u64 {
        self.lists
    }
}

impl AudioListHandler for SilentAudioList {
    fn process(&mut self, _registers: &mut dyn AudioRegisters) {
        self.lists += 1;
        log::trace!("audio list #{} skipped (no interpreter)", self.lists);
    }
}
