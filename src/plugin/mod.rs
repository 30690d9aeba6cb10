//! Session lifecycle of the AI plugin as driven by the host emulator.

use crate::backend::DriverKind;
use crate::bridge::AiBridge;
use crate::driver::SoundDriverManager;
use crate::error::Result;
use crate::flags;
use crate::frequency::SystemType;
use crate::hle::{AudioListHandler, SilentAudioList};
use crate::platform::{HostPlatform, ParentWindow, Platform};
use crate::registers::AudioRegisters;
use crate::settings::{JsonSettingsStore, Settings, SettingsStore};
use bitflags::bitflags;


pub const PLUGIN_NAME: &str = concat!("N64 AI Audio ", env!("CARGO_PKG_VERSION"));
/// Plugin interface version reported to hosts; older hosts reject anything else.
pub const PLUGIN_VERSION: u16 = 0x0101;
pub const PLUGIN_TYPE_AUDIO: u16 = 3;

bitflags! {
    /// RDRAM layouts the plugin can consume.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryLayout: u8 {
        const NORMAL = 0b01;
        const BYTE_SWAPPED = 0b10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: &'static str,
    pub plugin_type: u16,
    pub version: u16,
    pub memory: MemoryLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    RomRunning,
}

pub struct Plugin {
    state: SessionState,
    // Driver selection changed through `config`; consumed at rom_closed.
    backend_changed: bool,
    settings: Settings,
    bridge: AiBridge,
    store: Box<dyn SettingsStore>,
    platform: Box<dyn Platform>,
    audio_list: Box<dyn AudioListHandler>,
}

impl Plugin {
    pub fn new() -> Self {
        Self::with_parts(
            SoundDriverManager::new(),
            Box::new(JsonSettingsStore::new(flags::config_path())),
            Box::new(HostPlatform::new()),
        )
    }

    pub fn with_parts(
        driver: SoundDriverManager,
        store: Box<dyn SettingsStore>,
        platform: Box<dyn Platform>,
    ) -> Self {
        let settings = store.load();
        Self {
            state: SessionState::Uninitialized,
            backend_changed: false,
            settings,
            bridge: AiBridge::new(driver),
            store,
            platform,
            audio_list: Box::new(SilentAudioList::default()),
        }
    }

    pub fn set_audio_list_handler(&mut self, handler: Box<dyn AudioListHandler>) {
        self.audio_list = handler;
    }

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor {
            name: PLUGIN_NAME,
            plugin_type: PLUGIN_TYPE_AUDIO,
            version: PLUGIN_VERSION,
            memory: MemoryLayout::BYTE_SWAPPED,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn backend_swap_pending(&self) -> bool {
        self.backend_changed
    }

    pub fn active_driver(&self) -> Option<DriverKind> {
        self.bridge.driver().active_kind()
    }

    pub fn registers_mut(&mut self) -> Option<&mut (dyn AudioRegisters + 'static)> {
        self.bridge.registers_mut()
    }

    pub fn bridge(&self) -> &AiBridge {
        &self.bridge
    }

    fn reload_settings(&mut self) {
        self.settings = self.store.load();
    }

    /// Begin a session on the host's register block. Returns false when no
    /// backend could be created; register events are then ignored.
    pub fn start_session(&mut self, registers: Box<dyn AudioRegisters>) -> bool {
        if self.bridge.driver().is_active() {
            log::info!("Session restarted without close; tearing down previous backend");
            self.bridge.driver_mut().destroy();
        }

        self.platform.maybe_enable_console();
        self.reload_settings();
        if self.settings.use_res_timer {
            self.platform.maybe_raise_timer_resolution();
        }

        self.bridge.attach_registers(registers);
        self.bridge.reset_dac_rate();
        self.backend_changed = false;
        self.state = SessionState::Ready;

        let driver = self.settings.driver;
        if !self.bridge.driver_mut().create(driver) {
            log::error!("No sound backend available; audio disabled for this session");
            return false;
        }
        if let Some(backend) = self.bridge.driver_mut().backend_mut() {
            backend.startup();
        }
        self.bridge.clear_carry();
        log::info!("Session started with '{}' driver", driver.name());
        true
    }

    pub fn end_session(&mut self) {
        self.bridge.driver_mut().destroy();
        self.bridge.detach_registers();
        self.bridge.reset_dac_rate();
        self.bridge.clear_carry();
        self.platform.restore_timer_resolution();
        self.state = SessionState::Uninitialized;
        log::info!("Session closed");
    }

    pub fn rom_opened(&mut self) {
        if self.state == SessionState::Uninitialized {
            log::warn!("ROM opened before the plugin was initiated");
            return;
        }
        self.state = SessionState::RomRunning;
        self.reload_settings();
        log::info!("ROM opened");
    }

    pub fn rom_closed(&mut self) {
        if self.state != SessionState::Uninitialized {
            self.state = SessionState::Ready;
        }
        self.reload_settings();
        self.bridge.reset_dac_rate();
        log::info!("ROM closed");

        let Some(active) = self.bridge.driver().active_kind() else {
            return;
        };
        if self.backend_changed || active != self.settings.driver {
            self.swap_backend(self.settings.driver);
        } else if let Some(backend) = self.bridge.driver_mut().backend_mut() {
            backend.reset();
        }
    }

    fn swap_backend(&mut self, driver: DriverKind) {
        log::info!("Switching sound driver to '{}'", driver.name());
        self.backend_changed = false;
        let manager = self.bridge.driver_mut();
        manager.destroy();
        if !manager.create(driver) {
            log::error!("Replacement driver unavailable; audio disabled until next initiate");
            return;
        }
        if let Some(backend) = manager.backend_mut() {
            backend.startup();
        }
        self.bridge.clear_carry();
    }

    pub fn process_audio_list(&mut self) {
        if self.state != SessionState::RomRunning || !self.bridge.driver().is_active() {
            return;
        }
        if let Some(registers) = self.bridge.registers_mut() {
            self.audio_list.process(registers);
        }
    }

    pub fn dacrate_changed(&mut self, system: SystemType) {
        self.bridge.on_dacrate_changed(system);
    }

    pub fn len_changed(&mut self) {
        self.bridge.on_len_changed();
    }

    pub fn read_length(&mut self) -> u32 {
        self.bridge.read_length()
    }

    pub fn update(&mut self, wait: bool) {
        self.bridge.update(wait && self.settings.sync_audio);
    }

    /// Persist a new driver selection; it takes effect at the next ROM close.
    pub fn select_driver(&mut self, driver: DriverKind) -> Result<()> {
        self.settings.driver = driver;
        self.store.save(&self.settings)?;
        self.note_driver_selection();
        Ok(())
    }

    fn note_driver_selection(&mut self) {
        if let Some(active) = self.bridge.driver().active_kind() {
            if active != self.settings.driver {
                log::info!(
                    "Driver '{}' selected; switching after the ROM closes",
                    self.settings.driver.name()
                );
                self.backend_changed = true;
            }
        }
    }

    pub fn about(&self, parent: ParentWindow) {
        self.platform.show_native_dialog(parent, "About", PLUGIN_NAME);
    }

    /// Re-read the persisted settings the user edited and report them.
    pub fn config(&mut self, parent: ParentWindow) {
        self.reload_settings();
        self.note_driver_selection();
        let text = format!(
            "Sound driver: {}\nTimer resolution boost: {}\nSync audio: {}",
            self.settings.driver.name(),
            self.settings.use_res_timer,
            self.settings.sync_audio
        );
        self.platform.show_native_dialog(parent, "Configuration", &text);
    }

    pub fn test(&self, parent: ParentWindow) {
        let status = match self.active_driver() {
            Some(kind) => format!("{}\nActive driver: {}", PLUGIN_NAME, kind.name()),
            None => format!("{}\nNo active driver", PLUGIN_NAME),
        };
        self.platform.show_native_dialog(parent, "Test", &status);
    }
}

impl Default for Plugin {
    fn default() -> Self {
        Self::new()
    }
}
