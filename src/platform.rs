//! Host-OS hooks the plugin may use; each is a no-op where unsupported.

use std::ffi::c_void;

/// Opaque parent window handle passed through from the host.
pub type ParentWindow = *mut c_void;

pub trait Platform: Send {
    /// Route diagnostics somewhere visible.
    fn maybe_enable_console(&mut self);
    fn maybe_raise_timer_resolution(&mut self);
    fn restore_timer_resolution(&mut self);
    fn show_native_dialog(&self, parent: ParentWindow, title: &str, text: &str);
}

#[derive(Default)]
pub struct HostPlatform {
    timer_raised: bool,
}

impl HostPlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Platform for HostPlatform {
    fn maybe_enable_console(&mut self) {
        if !crate::flags::console() {
            return;
        }
        #[cfg(windows)]
        win::alloc_console();
        if env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .try_init()
            .is_ok()
        {
            log::debug!("Logging to console enabled");
        }
    }

    fn maybe_raise_timer_resolution(&mut self) {
        if self.timer_raised {
            return;
        }
        #[cfg(windows)]
        {
            self.timer_raised = win::begin_timer_period();
        }
        #[cfg(not(windows))]
        {
            log::trace!("timer resolution tuning not needed on this platform");
        }
    }

    fn restore_timer_resolution(&mut self) {
        if !self.timer_raised {
            return;
        }
        #[cfg(windows)]
        win::end_timer_period();
        self.timer_raised = false;
    }

    fn show_native_dialog(&self, parent: ParentWindow, title: &str, text: &str) {
        #[cfg(windows)]
        win::message_box(parent, title, text);
        #[cfg(not(windows))]
        {
            let _ = parent;
            println!("{}: {}", title, text);
        }
    }
}

impl Drop for HostPlatform {
    fn drop(&mut self) {
        self.restore_timer_resolution();
    }
}

#[cfg(windows)]
mod win {
    use std::ffi::{c_void, CString};
    use std::os::raw::c_char;

    const TIMER_PERIOD_MS: u32 = 1;
    const TIMERR_NOERROR: u32 = 0;
    const MB_OK: u32 = 0;

    #[link(name = "winmm")]
    extern "system" {
        fn timeBeginPeriod(period: u32) -> u32;
        fn timeEndPeriod(period: u32) -> u32;
    }

    #[link(name = "kernel32")]
    extern "system" {
        fn AllocConsole() -> i32;
    }

    #[link(name = "user32")]
    extern "system" {
        fn MessageBoxA(hwnd: *mut c_void, text: *const c_char, caption: *const c_char, ty: u32)
            -> i32;
    }

    pub fn alloc_console() {
        // Fails harmlessly when a console is already attached
        unsafe {
            let _ = AllocConsole();
        }
    }

    pub fn begin_timer_period() -> bool {
        unsafe { timeBeginPeriod(TIMER_PERIOD_MS) == TIMERR_NOERROR }
    }

    pub fn end_timer_period() {
        unsafe {
            let _ = timeEndPeriod(TIMER_PERIOD_MS);
        }
    }

    pub fn message_box(parent: *mut c_void, title: &str, text: &str) {
        let (Ok(title), Ok(text)) = (CString::new(title), CString::new(text)) else {
            return;
        };
        unsafe {
            let _ = MessageBoxA(parent, text.as_ptr(), title.as_ptr(), MB_OK);
        }
    }
}
