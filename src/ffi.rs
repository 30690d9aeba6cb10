//! C ABI entry points loaded by the host emulator.
//!
//! Layouts and symbol names follow the host's audio plugin contract and
//! must not change. One plugin instance serves the whole process.

#![allow(non_snake_case)]

use crate::error::PluginError;
use crate::frequency::SystemType;
use crate::plugin::{MemoryLayout, Plugin};
use crate::registers::{
    AudioRegisters, RDRAM_MAX_SIZE, ROM_HEADER_SIZE, SP_DMEM_SIZE, SP_IMEM_SIZE,
};
use std::ffi::c_void;
use std::os::raw::c_char;
use std::sync::Mutex;

const NAME_LEN: usize = 100;

/// Register block and memory pointers handed over by `InitiateAudio`.
#[repr(C)]
pub struct AudioInfo {
    pub hwnd: *mut c_void,
    pub hinst: *mut c_void,
    pub memory_bswaped: i32,
    pub header: *mut u8,
    pub rdram: *mut u8,
    pub dmem: *mut u8,
    pub imem: *mut u8,
    pub mi_intr_reg: *mut u32,
    pub ai_dram_addr_reg: *mut u32,
    pub ai_len_reg: *mut u32,
    pub ai_control_reg: *mut u32,
    pub ai_status_reg: *mut u32,
    pub ai_dacrate_reg: *mut u32,
    pub ai_bitrate_reg: *mut u32,
    pub check_interrupts: Option<extern "C" fn()>,
}

#[repr(C)]
pub struct PluginInfo {
    pub version: u16,
    pub plugin_type: u16,
    pub name: [c_char; NAME_LEN],
    pub normal_memory: i32,
    pub memory_bswaped: i32,
}

/// Registers living in host memory.
pub struct HostRegisters {
    rdram: *const u8,
    dmem: *mut u8,
    imem: *const u8,
    header: *const u8,
    dram_addr: *mut u32,
    len: *mut u32,
    dacrate: *mut u32,
}

// SAFETY: the host keeps these pointers valid from InitiateAudio until
// CloseDLL and only touches them from the thread that calls the plugin.
unsafe impl Send for HostRegisters {}

impl HostRegisters {
    pub fn from_info(info: &AudioInfo) -> Result<Self, PluginError> {
        if info.rdram.is_null() {
            return Err(PluginError::NullPointer("RDRAM"));
        }
        if info.ai_dram_addr_reg.is_null() {
            return Err(PluginError::NullPointer("AI_DRAM_ADDR_REG"));
        }
        if info.ai_len_reg.is_null() {
            return Err(PluginError::NullPointer("AI_LEN_REG"));
        }
        if info.ai_dacrate_reg.is_null() {
            return Err(PluginError::NullPointer("AI_DACRATE_REG"));
        }
        if info.dmem.is_null() {
            return Err(PluginError::NullPointer("DMEM"));
        }
        if info.imem.is_null() {
            return Err(PluginError::NullPointer("IMEM"));
        }
        Ok(Self {
            rdram: info.rdram,
            dmem: info.dmem,
            imem: info.imem,
            header: info.header,
            dram_addr: info.ai_dram_addr_reg,
            len: info.ai_len_reg,
            dacrate: info.ai_dacrate_reg,
        })
    }
}

impl AudioRegisters for HostRegisters {
    fn dram_addr(&self) -> u32 {
        unsafe { self.dram_addr.read_volatile() }
    }

    fn set_dram_addr(&mut self, value: u32) {
        unsafe { self.dram_addr.write_volatile(value) }
    }

    fn len(&self) -> u32 {
        unsafe { self.len.read_volatile() }
    }

    fn set_len(&mut self, value: u32) {
        unsafe { self.len.write_volatile(value) }
    }

    fn dacrate(&self) -> u32 {
        unsafe { self.dacrate.read_volatile() }
    }

    fn set_dacrate(&mut self, value: u32) {
        unsafe { self.dacrate.write_volatile(value) }
    }

    fn rdram(&self, addr: u32, len: u32) -> Option<&[u8]> {
        let start = addr as usize;
        let end = start.checked_add(len as usize)?;
        if end > RDRAM_MAX_SIZE {
            return None;
        }
        // SAFETY: the plugin contract carries no RDRAM size. Hosts with an
        // expansion pak map RDRAM_MAX_SIZE bytes; a 4 MiB host relies on the
        // game never pointing AI DMA past its memory.
        Some(unsafe { std::slice::from_raw_parts(self.rdram.add(start), len as usize) })
    }

    fn dmem(&self) -> &[u8] {
        // SAFETY: DMEM and IMEM are checked non-null and always 4 KiB.
        unsafe { std::slice::from_raw_parts(self.dmem, SP_DMEM_SIZE) }
    }

    fn dmem_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.dmem, SP_DMEM_SIZE) }
    }

    fn imem(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.imem, SP_IMEM_SIZE) }
    }

    fn rom_header(&self) -> Option<&[u8]> {
        if self.header.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(self.header, ROM_HEADER_SIZE) })
    }
}

static PLUGIN: Mutex<Option<Plugin>> = Mutex::new(None);

fn with_plugin<R>(f: impl FnOnce(&mut Plugin) -> R) -> R {
    // A panic mid-call leaves plain data behind; keep serving the host.
    let mut guard = PLUGIN.lock().unwrap_or_else(|e| e.into_inner());
    f(guard.get_or_insert_with(Plugin::new))
}

fn fill_plugin_info(info: &mut PluginInfo) {
    let desc = Plugin::descriptor();
    info.version = desc.version;
    info.plugin_type = desc.plugin_type;
    info.normal_memory = desc.memory.contains(MemoryLayout::NORMAL) as i32;
    info.memory_bswaped = desc.memory.contains(MemoryLayout::BYTE_SWAPPED) as i32;
    info.name = [0; NAME_LEN];
    let bytes = desc.name.as_bytes();
    let n = bytes.len().min(NAME_LEN - 1);
    for (dst, &src) in info.name.iter_mut().zip(&bytes[..n]) {
        *dst = src as c_char;
    }
}

#[no_mangle]
pub extern "C" fn GetDllInfo(info: *mut PluginInfo) {
    // SAFETY: the host passes a writable PLUGIN_INFO or null.
    if let Some(info) = unsafe { info.as_mut() } {
        fill_plugin_info(info);
    }
}

#[no_mangle]
pub extern "C" fn InitiateAudio(info: AudioInfo) -> i32 {
    let registers = match HostRegisters::from_info(&info) {
        Ok(r) => r,
        Err(e) => {
            log::error!("InitiateAudio rejected: {}", e);
            // The previous session's pointers may already be gone.
            with_plugin(|p| p.end_session());
            return 0;
        }
    };
    with_plugin(|p| p.start_session(Box::new(registers))) as i32
}

#[no_mangle]
pub extern "C" fn CloseDLL() {
    with_plugin(|p| p.end_session());
}

#[no_mangle]
pub extern "C" fn RomOpen() {
    with_plugin(|p| p.rom_opened());
}

#[no_mangle]
pub extern "C" fn RomClosed() {
    with_plugin(|p| p.rom_closed());
}

#[no_mangle]
pub extern "C" fn ProcessAList() {
    with_plugin(|p| p.process_audio_list());
}

#[no_mangle]
pub extern "C" fn AiDacrateChanged(system_type: i32) {
    let Some(system) = SystemType::from_raw(system_type) else {
        panic!("AiDacrateChanged: host passed unknown system type {}", system_type);
    };
    with_plugin(|p| p.dacrate_changed(system));
}

#[no_mangle]
pub extern "C" fn AiLenChanged() {
    with_plugin(|p| p.len_changed());
}

#[no_mangle]
pub extern "C" fn AiReadLength() -> u32 {
    with_plugin(|p| p.read_length())
}

#[no_mangle]
pub extern "C" fn AiUpdate(wait: i32) {
    with_plugin(|p| p.update(wait != 0));
}

#[no_mangle]
pub extern "C" fn DllAbout(parent: *mut c_void) {
    with_plugin(|p| p.about(parent));
}

#[no_mangle]
pub extern "C" fn DllConfig(parent: *mut c_void) {
    with_plugin(|p| p.config(parent));
}

#[no_mangle]
pub extern "C" fn DllTest(parent: *mut c_void) {
    with_plugin(|p| p.test(parent));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    fn empty_info() -> AudioInfo {
        AudioInfo {
            hwnd: ptr::null_mut(),
            hinst: ptr::null_mut(),
            memory_bswaped: 1,
            header: ptr::null_mut(),
            rdram: ptr::null_mut(),
            dmem: ptr::null_mut(),
            imem: ptr::null_mut(),
            mi_intr_reg: ptr::null_mut(),
            ai_dram_addr_reg: ptr::null_mut(),
            ai_len_reg: ptr::null_mut(),
            ai_control_reg: ptr::null_mut(),
            ai_status_reg: ptr::null_mut(),
            ai_dacrate_reg: ptr::null_mut(),
            ai_bitrate_reg: ptr::null_mut(),
            check_interrupts: None,
        }
    }

    #[test]
    fn null_register_pointers_are_rejected() {
        let mut rdram = vec![0u8; 16];
        let mut info = empty_info();
        assert!(matches!(
            HostRegisters::from_info(&info),
            Err(PluginError::NullPointer("RDRAM"))
        ));
        info.rdram = rdram.as_mut_ptr();
        assert!(matches!(
            HostRegisters::from_info(&info),
            Err(PluginError::NullPointer("AI_DRAM_ADDR_REG"))
        ));
    }

    struct HostMemory {
        rdram: Vec<u8>,
        dmem: Vec<u8>,
        imem: Vec<u8>,
        addr: u32,
        len: u32,
        rate: u32,
    }

    impl HostMemory {
        fn new() -> Self {
            Self {
                rdram: vec![0; 0x1000],
                dmem: vec![0; SP_DMEM_SIZE],
                imem: vec![0; SP_IMEM_SIZE],
                addr: 0,
                len: 0,
                rate: 1103,
            }
        }

        fn info(&mut self) -> AudioInfo {
            let mut info = empty_info();
            info.rdram = self.rdram.as_mut_ptr();
            info.dmem = self.dmem.as_mut_ptr();
            info.imem = self.imem.as_mut_ptr();
            info.ai_dram_addr_reg = &mut self.addr;
            info.ai_len_reg = &mut self.len;
            info.ai_dacrate_reg = &mut self.rate;
            info
        }
    }

    #[test]
    fn scratch_memory_pointers_are_required() {
        let mut host = HostMemory::new();
        let mut info = host.info();
        info.dmem = ptr::null_mut();
        assert!(matches!(
            HostRegisters::from_info(&info),
            Err(PluginError::NullPointer("DMEM"))
        ));
        let mut info = host.info();
        info.imem = ptr::null_mut();
        assert!(matches!(
            HostRegisters::from_info(&info),
            Err(PluginError::NullPointer("IMEM"))
        ));
    }

    #[test]
    fn scratch_memories_map_host_buffers() {
        let mut host = HostMemory::new();
        host.imem[0x10] = 0xAB;
        let mut header = [0u8; ROM_HEADER_SIZE];
        header[0] = 0x80;
        let mut info = host.info();
        let mut regs = HostRegisters::from_info(&info).unwrap();
        assert_eq!(regs.dmem().len(), SP_DMEM_SIZE);
        assert_eq!(regs.imem()[0x10], 0xAB);
        assert!(regs.rom_header().is_none());
        regs.dmem_mut()[0xFF0] = 0x42;
        drop(regs);
        assert_eq!(host.dmem[0xFF0], 0x42);

        info = host.info();
        info.header = header.as_mut_ptr();
        let regs = HostRegisters::from_info(&info).unwrap();
        assert_eq!(regs.rom_header().map(|h| h[0]), Some(0x80));
    }

    #[test]
    fn rejected_initiate_tears_down_previous_session() {
        let mut host = HostMemory::new();
        assert_eq!(InitiateAudio(host.info()), 1);
        assert!(with_plugin(|p| p.active_driver()).is_some());

        let mut bad = host.info();
        bad.rdram = ptr::null_mut();
        assert_eq!(InitiateAudio(bad), 0);
        assert_eq!(with_plugin(|p| p.active_driver()), None);
        assert!(with_plugin(|p| p.registers_mut().is_none()));
        assert_eq!(AiReadLength(), 0);
        AiLenChanged();
        CloseDLL();
    }

    #[test]
    fn host_registers_read_and_write_through() {
        let mut rdram: Vec<u8> = (0..64).collect();
        let mut dmem = vec![0u8; SP_DMEM_SIZE];
        let mut imem = vec![0u8; SP_IMEM_SIZE];
        let (mut addr, mut len, mut rate) = (0x20u32, 0x10u32, 1103u32);
        let mut info = empty_info();
        info.rdram = rdram.as_mut_ptr();
        info.dmem = dmem.as_mut_ptr();
        info.imem = imem.as_mut_ptr();
        info.ai_dram_addr_reg = &mut addr;
        info.ai_len_reg = &mut len;
        info.ai_dacrate_reg = &mut rate;

        let mut regs = HostRegisters::from_info(&info).unwrap();
        assert_eq!(regs.dram_addr(), 0x20);
        assert_eq!(regs.dacrate(), 1103);
        assert_eq!(regs.rdram(0x20, 4), Some(&[0x20u8, 0x21, 0x22, 0x23][..]));
        assert!(regs.rdram(RDRAM_MAX_SIZE as u32 - 4, 8).is_none());
        regs.set_len(0x400);
        drop(regs);
        assert_eq!(len, 0x400);
    }

    #[test]
    fn plugin_info_matches_contract() {
        let mut info = PluginInfo {
            version: 0,
            plugin_type: 0,
            name: [0x7f; NAME_LEN],
            normal_memory: 7,
            memory_bswaped: 7,
        };
        GetDllInfo(&mut info);
        assert_eq!(info.version, 0x0101);
        assert_eq!(info.plugin_type, 3);
        assert_eq!(info.normal_memory, 0);
        assert_eq!(info.memory_bswaped, 1);
        let name: Vec<u8> = info
            .name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        assert_eq!(name, crate::plugin::PLUGIN_NAME.as_bytes());
        assert_eq!(info.name[NAME_LEN - 1], 0);
        GetDllInfo(ptr::null_mut());
    }
}
