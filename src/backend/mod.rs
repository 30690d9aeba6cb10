//! Sound backends and the contract the AI bridge drives them through.

use serde::{Deserialize, Serialize};

mod null;
#[cfg(feature = "rodio-backend")]
mod rodio_device;

pub use null::NullBackend;
#[cfg(feature = "rodio-backend")]
pub use rodio_device::RodioBackend;

/// Capabilities every output backend provides.
///
/// Calls always come from one thread and never overlap; backends that
/// render on their own thread must hand data across internally.
pub trait SoundBackend: Send {
    fn startup(&mut self);
    fn shutdown(&mut self);
    /// Drop queued audio but keep the device open.
    fn reset(&mut self);
    fn set_frequency(&mut self, hz: u32);
    /// Queue one DMA buffer of word-swapped stereo frames.
    fn accept_buffer(&mut self, buffer: &[u8]);
    /// Bytes left in the buffer currently playing.
    fn query_remaining_length(&mut self) -> u32;
    /// Periodic tick; when `wait` is set, block until the queue has room.
    fn update(&mut self, wait: bool);
}

/// Persisted identifier of the backend to instantiate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Silent output that still paces the emulated FIFO.
    #[default]
    Null,
    Rodio,
}

impl DriverKind {
    pub fn name(self) -> &'static str {
        match self {
            DriverKind::Null => "null",
            DriverKind::Rodio => "rodio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "null" | "none" | "nosound" => Some(DriverKind::Null),
            "rodio" => Some(DriverKind::Rodio),
            _ => None,
        }
    }
}

/// Bytes per stereo 16-bit frame as the AI DMA delivers them.
pub const FRAME_BYTES: usize = 4;

/// Split a DMA buffer into (left, right) frames.
///
/// RDRAM is exposed word-swapped, so each native `u32` holds the left
/// sample in its upper half and the right sample in its lower half.
pub fn decode_frames(buffer: &[u8]) -> Vec<(i16, i16)> {
    buffer
        .chunks_exact(FRAME_BYTES)
        .map(|w| {
            let right = i16::from_le_bytes([w[0], w[1]]);
            let left = i16::from_le_bytes([w[2], w[3]]);
            (left, right)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_frames_swaps_halves() {
        let word: u32 = (0x1234u32 << 16) | 0xFFFE;
        let mut buf = word.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0xAA, 0xBB]); // trailing partial frame ignored
        assert_eq!(decode_frames(&buf), vec![(0x1234, -2)]);
    }

    #[test]
    fn driver_kind_names_round_trip() {
        for kind in [DriverKind::Null, DriverKind::Rodio] {
            assert_eq!(DriverKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(DriverKind::parse(" NoSound "), Some(DriverKind::Null));
        assert_eq!(DriverKind::parse("directsound"), None);
    }

    #[test]
    fn driver_kind_serializes_snake_case() {
        let json = serde_json::to_string(&DriverKind::Rodio).unwrap();
        assert_eq!(json, "\"rodio\"");
    }
}
