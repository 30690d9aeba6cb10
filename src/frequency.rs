//! DAC rate to output sample rate conversion.

/// Video timing standard reported by the host with each DAC rate change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemType {
    Ntsc,
    Pal,
    Mpal,
}

impl SystemType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(SystemType::Ntsc),
            1 => Some(SystemType::Pal),
            2 => Some(SystemType::Mpal),
            _ => None,
        }
    }

    /// Video clock in Hz that the AI divides down to get its sample clock.
    pub fn video_clock(self) -> u32 {
        match self {
            SystemType::Ntsc => 48_681_812,
            SystemType::Pal => 49_656_530,
            SystemType::Mpal => 48_628_316,
        }
    }
}

// (low, high, snapped) with exclusive bounds; first match wins.
const STANDARD_RATES: [(u32, u32, u32); 7] = [
    (7_000, 9_000, 8_000),
    (10_000, 12_000, 11_025),
    (18_000, 20_000, 19_000),
    (21_000, 23_000, 22_050),
    (31_000, 33_000, 32_000),
    (43_000, 45_000, 44_100),
    (47_000, 49_000, 48_000),
];

/// Raw output frequency for an already masked DAC rate.
pub fn dac_frequency(masked_rate: u32, system: SystemType) -> u32 {
    system.video_clock() / (masked_rate + 1)
}

/// Snap `freq` to a nearby standard sample rate, or return it unchanged.
pub fn standardize(freq: u32) -> u32 {
    for &(low, high, snapped) in STANDARD_RATES.iter() {
        if freq > low && freq < high {
            return snapped;
        }
    }
    log::debug!("Unable to standardize frequency {} Hz", freq);
    freq
}
