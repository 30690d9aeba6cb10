//! View over the host-owned AI register block and RDRAM.

pub const AI_DRAM_ADDR_MASK: u32 = 0x00FF_FFF8;
pub const AI_LEN_MASK: u32 = 0x0003_FFF8;
pub const AI_DACRATE_MASK: u32 = 0x0000_3FFF;

/// Largest RDRAM image a host can expose (expansion pak fitted).
pub const RDRAM_MAX_SIZE: usize = 8 * 1024 * 1024;

/// RSP data and instruction memories.
pub const SP_DMEM_SIZE: usize = 0x1000;
pub const SP_IMEM_SIZE: usize = 0x1000;

/// Bytes of the cartridge header the host exposes.
pub const ROM_HEADER_SIZE: usize = 0x40;

/// The registers the AI plugin reads and writes back.
///
/// Values are raw; masking to the valid bit ranges is the caller's job.
pub trait AudioRegisters: Send {
    fn dram_addr(&self) -> u32;
    fn set_dram_addr(&mut self, value: u32);
    fn len(&self) -> u32;
    fn set_len(&mut self, value: u32);
    fn dacrate(&self) -> u32;
    fn set_dacrate(&mut self, value: u32);

    /// Borrow `len` bytes of RDRAM starting at `addr`, or `None` if the
    /// region falls outside the memory the host exposed.
    fn rdram(&self, addr: u32, len: u32) -> Option<&[u8]>;

    /// RSP data memory; holds the task descriptor for audio lists.
    fn dmem(&self) -> &[u8];
    fn dmem_mut(&mut self) -> &mut [u8];
    fn imem(&self) -> &[u8];

    /// Cartridge header, when the host provided one.
    fn rom_header(&self) -> Option<&[u8]>;
}

/// Register file backed by memory this process owns.
#[derive(Debug, Clone)]
pub struct OwnedRegisters {
    pub dram_addr: u32,
    pub len: u32,
    pub dacrate: u32,
    pub rdram: Vec<u8>,
    pub dmem: Box<[u8; SP_DMEM_SIZE]>,
    pub imem: Box<[u8; SP_IMEM_SIZE]>,
    pub rom_header: Option<[u8; ROM_HEADER_SIZE]>,
}

impl OwnedRegisters {
    pub fn new(rdram_size: usize) -> Self {
        Self {
            dram_addr: 0,
            len: 0,
            dacrate: 0,
            rdram: vec![0; rdram_size.min(RDRAM_MAX_SIZE)],
            dmem: Box::new([0; SP_DMEM_SIZE]),
            imem: Box::new([0; SP_IMEM_SIZE]),
            rom_header: None,
        }
    }

    pub fn rdram_mut(&mut self) -> &mut [u8] {
        &mut self.rdram
    }
}

impl Default for OwnedRegisters {
    fn default() -> Self {
        Self::new(4 * 1024 * 1024)
    }
}

impl AudioRegisters for OwnedRegisters {
    fn dram_addr(&self) -> u32 {
        self.dram_addr
    }

    fn set_dram_addr(&mut self, value: u32) {
        self.dram_addr = value;
    }

    fn len(&self) -> u32 {
        self.len
    }

    fn set_len(&mut self, value: u32) {
        self.len = value;
    }

    fn dacrate(&self) -> u32 {
        self.dacrate
    }

    fn set_dacrate(&mut self, value: u32) {
        self.dacrate = value;
    }

    fn rdram(&self, addr: u32, len: u32) -> Option<&[u8]> {
        let start = addr as usize;
        let end = start.checked_add(len as usize)?;
        self.rdram.get(start..end)
    }

    fn dmem(&self) -> &[u8] {
        &self.dmem[..]
    }

    fn dmem_mut(&mut self) -> &mut [u8] {
        &mut self.dmem[..]
    }

    fn imem(&self) -> &[u8] {
        &self.imem[..]
    }

    fn rom_header(&self) -> Option<&[u8]> {
        self.rom_header.as_ref().map(|h| &h[..])
    }
}
