use n64_ai_audio::frequency::dac_frequency;
use n64_ai_audio::platform::HostPlatform;
use n64_ai_audio::registers::AI_LEN_MASK;
use n64_ai_audio::{
    flags, standardize, DriverKind, MemorySettingsStore, OwnedRegisters, Plugin, Settings,
    SoundDriverManager, SystemType,
};
use std::process;

// Drives one complete AI session against a real driver without an emulator.
// Usage:
//   cargo run --bin ai_probe -- --driver null --dacrate 1103 --system ntsc --buffers 64
// AI_QUIET=1 suppresses the per-buffer lines.

const RDRAM_SIZE: usize = 4 * 1024 * 1024;
const BUFFER_BASE: u32 = 0x0010_0000;
const TONE_HZ: f64 = 440.0;

struct Args {
    driver: DriverKind,
    dacrate: u32,
    system: SystemType,
    buffers: u32,
    len: u32,
}

fn parse_u32_hex_or_dec(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(stripped) = s.strip_prefix("0x") {
        u32::from_str_radix(stripped, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn parse_system(s: &str) -> Option<SystemType> {
    match s.to_ascii_lowercase().as_str() {
        "ntsc" => Some(SystemType::Ntsc),
        "pal" => Some(SystemType::Pal),
        "mpal" => Some(SystemType::Mpal),
        other => other.parse().ok().and_then(SystemType::from_raw),
    }
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        driver: DriverKind::Null,
        dacrate: 1103,
        system: SystemType::Ntsc,
        buffers: 64,
        len: 0x0E00,
    };
    let mut it = std::env::args().skip(1);
    while let Some(a) = it.next() {
        let value = |it: &mut dyn Iterator<Item = String>| {
            it.next().ok_or_else(|| format!("{} requires a value", a))
        };
        match a.as_str() {
            "--driver" => {
                let v = value(&mut it)?;
                args.driver = DriverKind::parse(&v).ok_or(format!("unknown driver '{}'", v))?;
            }
            "--dacrate" => {
                let v = value(&mut it)?;
                args.dacrate = parse_u32_hex_or_dec(&v).ok_or(format!("bad dacrate '{}'", v))?;
            }
            "--system" => {
                let v = value(&mut it)?;
                args.system = parse_system(&v).ok_or(format!("unknown system '{}'", v))?;
            }
            "--buffers" => {
                let v = value(&mut it)?;
                args.buffers = parse_u32_hex_or_dec(&v).ok_or(format!("bad count '{}'", v))?;
            }
            "--len" => {
                let v = value(&mut it)?;
                let len = parse_u32_hex_or_dec(&v).ok_or(format!("bad length '{}'", v))?;
                args.len = len & AI_LEN_MASK;
            }
            "--help" | "-h" => {
                return Err(
                    "Usage: ai_probe [--driver null|rodio] [--dacrate N] [--system ntsc|pal|mpal] [--buffers N] [--len BYTES]"
                        .into(),
                )
            }
            s => return Err(format!("Unknown option: {}", s)),
        }
    }
    Ok(args)
}

// Two back-to-back DMA buffers of a sine tone in the host's word-swapped layout.
fn fill_tone(regs: &mut OwnedRegisters, len: u32, sample_rate: u32) {
    let frames = (len as usize / 4) * 2;
    let start = BUFFER_BASE as usize;
    let rdram = regs.rdram_mut();
    for i in 0..frames {
        let t = i as f64 / sample_rate.max(1) as f64;
        let s = ((t * TONE_HZ * std::f64::consts::TAU).sin() * 8000.0) as i16;
        let word = ((s as u16 as u32) << 16) | s as u16 as u32;
        let at = start + i * 4;
        match rdram.get_mut(at..at + 4) {
            Some(dst) => dst.copy_from_slice(&word.to_le_bytes()),
            None => break,
        }
    }
}

fn main() {
    let args = match parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(2);
        }
    };
    let _ = env_logger::try_init();
    let quiet = flags::quiet();

    let sample_rate = standardize(dac_frequency(args.dacrate & 0x3FFF, args.system));
    let mut regs = OwnedRegisters::new(RDRAM_SIZE);
    regs.dacrate = args.dacrate;
    fill_tone(&mut regs, args.len, sample_rate);

    let store = MemorySettingsStore::new(Settings {
        driver: args.driver,
        ..Settings::default()
    });
    let mut plugin = Plugin::with_parts(
        SoundDriverManager::new(),
        Box::new(store),
        Box::new(HostPlatform::new()),
    );

    if !plugin.start_session(Box::new(regs)) {
        eprintln!("Driver '{}' could not be started", args.driver.name());
        process::exit(1);
    }
    plugin.rom_opened();
    plugin.dacrate_changed(args.system);
    println!(
        "Driver: {}  DAC rate: {}  System: {:?}  Output: {} Hz",
        args.driver.name(),
        args.dacrate,
        args.system,
        sample_rate
    );

    for i in 0..args.buffers {
        let addr = BUFFER_BASE + (i % 2) * args.len;
        if let Some(r) = plugin.registers_mut() {
            r.set_dram_addr(addr);
            r.set_len(args.len);
        }
        plugin.len_changed();
        plugin.update(true);
        let remaining = plugin.read_length();
        if !quiet {
            println!(
                "buffer {:3}: addr=0x{:06X} len=0x{:04X} remaining=0x{:04X} carry={}",
                i,
                addr,
                args.len,
                remaining,
                plugin.bridge().carry_pending()
            );
        }
    }

    plugin.rom_closed();
    plugin.end_session();
    println!("Session closed cleanly");
}
