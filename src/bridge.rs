//! Translates AI register events into sound backend calls.

use crate::dma_carry::DmaCarry;
use crate::driver::SoundDriverManager;
use crate::frequency::{dac_frequency, standardize, SystemType};
use crate::registers::{AudioRegisters, AI_DACRATE_MASK, AI_DRAM_ADDR_MASK, AI_LEN_MASK};
use std::time::Duration;

// Yield when the host polls with audio disabled so it does not spin.
const IDLE_YIELD: Duration = Duration::from_millis(1);

pub struct AiBridge {
    driver: SoundDriverManager,
    registers: Option<Box<dyn AudioRegisters>>,
    carry: DmaCarry,
    // Last applied masked DAC rate; 0 forces the next change through.
    dac_rate: u32,
}

impl AiBridge {
    pub fn new(driver: SoundDriverManager) -> Self {
        Self {
            driver,
            registers: None,
            carry: DmaCarry::new(),
            dac_rate: 0,
        }
    }

    pub fn attach_registers(&mut self, registers: Box<dyn AudioRegisters>) {
        self.registers = Some(registers);
    }

    /// Drop the register view; its pointers do not outlive the session.
    pub fn detach_registers(&mut self) {
        self.registers = None;
    }

    pub fn registers_mut(&mut self) -> Option<&mut (dyn AudioRegisters + 'static)> {
        self.registers.as_deref_mut()
    }

    pub fn driver(&self) -> &SoundDriverManager {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut SoundDriverManager {
        &mut self.driver
    }

    pub fn dac_rate(&self) -> u32 {
        self.dac_rate
    }

    pub fn reset_dac_rate(&mut self) {
        self.dac_rate = 0;
    }

    pub fn carry_pending(&self) -> bool {
        self.carry.is_pending()
    }

    pub fn clear_carry(&mut self) {
        self.carry.clear();
    }

    /// AI_DACRATE_REG was written.
    pub fn on_dacrate_changed(&mut self, system: SystemType) {
        self.carry.clear();
        let (Some(regs), Some(backend)) = (self.registers.as_deref(), self.driver.backend_mut())
        else {
            return;
        };

        let raw = regs.dacrate();
        let masked = raw & AI_DACRATE_MASK;
        if masked == self.dac_rate {
            return;
        }
        if cfg!(debug_assertions) && masked != raw {
            log::warn!("Unknown/reserved bits set in AI_DACRATE_REG: 0x{:08X}", raw);
        }
        self.dac_rate = masked;

        let raw_freq = dac_frequency(masked, system);
        let freq = standardize(raw_freq);
        log::debug!(
            "DAC rate {} ({:?}) -> {} Hz (raw {} Hz)",
            masked,
            system,
            freq,
            raw_freq
        );
        backend.set_frequency(freq);
    }

    /// AI_LEN_REG was written: hand the programmed DMA buffer to the backend.
    pub fn on_len_changed(&mut self) {
        let Some(regs) = self.registers.as_deref() else {
            return;
        };
        let address = regs.dram_addr() & AI_DRAM_ADDR_MASK;
        let length = regs.len() & AI_LEN_MASK;

        let Some(backend) = self.driver.backend_mut() else {
            return;
        };
        let address = self.carry.apply(address, length);
        log::trace!("AI DMA 0x{:06X} len 0x{:05X}", address, length);

        match regs.rdram(address, length) {
            Some(buffer) => backend.accept_buffer(buffer),
            None => log::warn!(
                "AI DMA 0x{:06X}+0x{:05X} lies outside RDRAM; dropped",
                address,
                length
            ),
        }
    }

    /// AI_LEN_REG is being read back; returns the backend's remaining length.
    pub fn read_length(&mut self) -> u32 {
        let Some(backend) = self.driver.backend_mut() else {
            return 0;
        };
        let remaining = backend.query_remaining_length();
        if let Some(regs) = self.registers.as_deref_mut() {
            regs.set_len(remaining);
        }
        remaining
    }

    pub fn update(&mut self, wait: bool) {
        match self.driver.backend_mut() {
            Some(backend) => backend.update(wait),
            None => std::thread::sleep(IDLE_YIELD),
        }
    }
}
