//! Owns the single live sound backend and knows how to build each kind.

use crate::backend::{DriverKind, NullBackend, SoundBackend};

pub type BackendFactory = Box<dyn FnMut(DriverKind) -> Option<Box<dyn SoundBackend>> + Send>;

struct ActiveBackend {
    kind: DriverKind,
    backend: Box<dyn SoundBackend>,
}

pub struct SoundDriverManager {
    factory: BackendFactory,
    active: Option<ActiveBackend>,
}

impl SoundDriverManager {
    pub fn new() -> Self {
        Self::with_factory(Box::new(create_builtin))
    }

    pub fn with_factory(factory: BackendFactory) -> Self {
        Self {
            factory,
            active: None,
        }
    }

    /// Instantiate a backend for `kind`. Any live backend is destroyed
    /// first. Returns false (audio disabled) when nothing could be built.
    pub fn create(&mut self, kind: DriverKind) -> bool {
        self.destroy();
        match (self.factory)(kind) {
            Some(backend) => {
                log::info!("Sound driver '{}' created", kind.name());
                self.active = Some(ActiveBackend { kind, backend });
                true
            }
            None => {
                log::error!("Sound driver '{}' could not be created", kind.name());
                false
            }
        }
    }

    /// Shut down and release the live backend, if any.
    pub fn destroy(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.backend.shutdown();
            log::info!("Sound driver '{}' destroyed", active.kind.name());
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_kind(&self) -> Option<DriverKind> {
        self.active.as_ref().map(|a| a.kind)
    }

    pub fn backend_mut(&mut self) -> Option<&mut (dyn SoundBackend + 'static)> {
        self.active.as_mut().map(|a| a.backend.as_mut())
    }
}

impl Default for SoundDriverManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SoundDriverManager {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn create_builtin(kind: DriverKind) -> Option<Box<dyn SoundBackend>> {
    match kind {
        DriverKind::Null => Some(Box::new(NullBackend::new())),
        DriverKind::Rodio => create_rodio(),
    }
}

#[cfg(feature = "rodio-backend")]
fn create_rodio() -> Option<Box<dyn SoundBackend>> {
    match crate::backend::RodioBackend::new() {
        Ok(b) => Some(Box::new(b)),
        Err(e) => {
            log::error!("rodio backend unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "rodio-backend"))]
fn create_rodio() -> Option<Box<dyn SoundBackend>> {
    log::error!("rodio backend requested but this build lacks the rodio-backend feature");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Probe(Arc<Mutex<Vec<&'static str>>>);

    impl SoundBackend for Probe {
        fn startup(&mut self) {}
        fn shutdown(&mut self) {
            self.0.lock().unwrap().push("shutdown");
        }
        fn reset(&mut self) {}
        fn set_frequency(&mut self, _hz: u32) {}
        fn accept_buffer(&mut self, _buffer: &[u8]) {}
        fn query_remaining_length(&mut self) -> u32 {
            0
        }
        fn update(&mut self, _wait: bool) {}
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.0.lock().unwrap().push("drop");
        }
    }

    #[test]
    fn builtin_null_backend_is_always_available() {
        let mut mgr = SoundDriverManager::new();
        assert!(mgr.create(DriverKind::Null));
        assert_eq!(mgr.active_kind(), Some(DriverKind::Null));
        assert!(mgr.backend_mut().is_some());
        mgr.destroy();
        assert!(!mgr.is_active());
        // destroying twice is harmless
        mgr.destroy();
    }

    #[test]
    fn factory_failure_leaves_no_backend() {
        let mut mgr = SoundDriverManager::with_factory(Box::new(|_| None));
        assert!(!mgr.create(DriverKind::Rodio));
        assert!(!mgr.is_active());
        assert!(mgr.backend_mut().is_none());
    }

    #[test]
    fn create_replaces_and_destroy_shuts_down_before_release() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let factory_log = log.clone();
        let mut mgr = SoundDriverManager::with_factory(Box::new(move |_| {
            Some(Box::new(Probe(factory_log.clone())) as Box<dyn SoundBackend>)
        }));
        assert!(mgr.create(DriverKind::Null));
        assert!(mgr.create(DriverKind::Null));
        assert_eq!(*log.lock().unwrap(), vec!["shutdown", "drop"]);
        drop(mgr);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["shutdown", "drop", "shutdown", "drop"]
        );
    }
}
