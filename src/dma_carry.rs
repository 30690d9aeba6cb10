//! AI DMA "delayed carry" tracking.
//!
//! When a DMA buffer ends exactly on an 8KB boundary the AI's address
//! counter carries into the next page one interrupt late, so the buffer
//! programmed after it is observed 0x2000 bytes further on.

const CARRY_BOUNDARY_MASK: u32 = 0x1FFF;
const CARRY_OFFSET: u32 = 0x2000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DmaCarry {
    pending: bool,
}

impl DmaCarry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn clear(&mut self) {
        self.pending = false;
    }

    /// Apply any carry left by the previous buffer to `address` and latch
    /// the carry for the next one. Returns the effective DMA address.
    pub fn apply(&mut self, address: u32, length: u32) -> u32 {
        let address = if self.pending {
            address.wrapping_add(CARRY_OFFSET)
        } else {
            address
        };
        self.pending = address.wrapping_add(length) & CARRY_BOUNDARY_MASK == 0;
        address
    }
}
