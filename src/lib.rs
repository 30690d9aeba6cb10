//! Audio Interface (AI) plugin for N64 emulators.
//!
//! Turns the host's AI register notifications into buffers, sample rate
//! changes and pacing calls on a swappable sound backend.

pub mod backend;
pub mod bridge;
pub mod dma_carry;
pub mod driver;
pub mod error;
pub mod ffi;
pub mod flags;
pub mod frequency;
pub mod hle;
pub mod platform;
pub mod plugin;
pub mod registers;
pub mod settings;

#[cfg(test)]
mod test_support;

pub use backend::{DriverKind, SoundBackend};
pub use bridge::AiBridge;
pub use driver::SoundDriverManager;
pub use error::{PluginError, Result};
pub use frequency::{standardize, SystemType};
pub use plugin::{Plugin, SessionState};
pub use registers::{AudioRegisters, OwnedRegisters};
pub use settings::{JsonSettingsStore, MemorySettingsStore, Settings, SettingsStore};
