//! Recording backend shared by the bridge and lifecycle tests.

use crate::backend::{DriverKind, SoundBackend};
use crate::driver::BackendFactory;
use crate::registers::OwnedRegisters;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(DriverKind),
    Startup,
    Shutdown,
    Reset,
    SetFrequency(u32),
    Accept { first_word: u32, len: usize },
    Update(bool),
    Release,
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<Call>,
    remaining: u32,
    fail_creates: bool,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<RecorderState>>);

impl Recorder {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().calls.push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.0.lock().unwrap().calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().calls.clear();
    }

    pub fn set_remaining(&self, len: u32) {
        self.0.lock().unwrap().remaining = len;
    }

    pub fn fail_creates(&self, fail: bool) {
        self.0.lock().unwrap().fail_creates = fail;
    }

    pub fn factory(&self) -> BackendFactory {
        let recorder = self.clone();
        Box::new(move |kind| {
            recorder.push(Call::Create(kind));
            if recorder.0.lock().unwrap().fail_creates {
                return None;
            }
            Some(Box::new(RecordingBackend {
                recorder: recorder.clone(),
            }) as Box<dyn SoundBackend>)
        })
    }
}

struct RecordingBackend {
    recorder: Recorder,
}

impl SoundBackend for RecordingBackend {
    fn startup(&mut self) {
        self.recorder.push(Call::Startup);
    }

    fn shutdown(&mut self) {
        self.recorder.push(Call::Shutdown);
    }

    fn reset(&mut self) {
        self.recorder.push(Call::Reset);
    }

    fn set_frequency(&mut self, hz: u32) {
        self.recorder.push(Call::SetFrequency(hz));
    }

    fn accept_buffer(&mut self, buffer: &[u8]) {
        let first_word = buffer
            .get(..4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .unwrap_or(u32::MAX);
        self.recorder.push(Call::Accept {
            first_word,
            len: buffer.len(),
        });
    }

    fn query_remaining_length(&mut self) -> u32 {
        self.recorder.0.lock().unwrap().remaining
    }

    fn update(&mut self, wait: bool) {
        self.recorder.push(Call::Update(wait));
    }
}

impl Drop for RecordingBackend {
    fn drop(&mut self) {
        self.recorder.push(Call::Release);
    }
}

/// RDRAM where every 32-bit word holds its own byte address, so an
/// accepted buffer reveals the address it was read from.
pub fn addressed_registers(size: usize) -> OwnedRegisters {
    let mut regs = OwnedRegisters::new(size);
    for (i, word) in regs.rdram_mut().chunks_exact_mut(4).enumerate() {
        word.copy_from_slice(&((i * 4) as u32).to_le_bytes());
    }
    regs
}
