//! Platform adapters implementing the ports.
//!
//! macOS is the only supported platform: the event tap, accessibility
//! traversal, and overlay panel live under [`macos`]. The hotkey adapter is
//! platform-neutral because the `global-hotkey` crate already is.

pub mod hotkeys;

#[cfg(target_os = "macos")]
pub mod macos;

use crate::config::ConfigHandle;
use crate::error::Result;
use crate::ports::Ports;

/// Build the real port bundle for this machine.
#[cfg(target_os = "macos")]
pub fn build_ports(config: ConfigHandle) -> Result<Ports> {
    macos::build_ports(config)
}

#[cfg(not(target_os = "macos"))]
pub fn build_ports(_config: ConfigHandle) -> Result<Ports> {
    Err(crate::error::Error::Internal(
        "keywarp requires macOS (accessibility, event tap, and overlay APIs)".into(),
    ))
}

/// Run the main-thread loop until [`stop_main_loop`] is called.
///
/// On macOS this pumps the main CFRunLoop, which Carbon hotkey events and
/// libdispatch main-queue work (overlay drawing) both require.
#[cfg(target_os = "macos")]
pub fn run_main_loop() {
    core_foundation::runloop::CFRunLoop::run_current();
}

#[cfg(target_os = "macos")]
pub fn stop_main_loop() {
    core_foundation::runloop::CFRunLoop::get_main().stop();
}

#[cfg(not(target_os = "macos"))]
mod parked {
    use std::sync::{Condvar, Mutex, OnceLock};

    pub(super) fn gate() -> &'static (Mutex<bool>, Condvar) {
        static GATE: OnceLock<(Mutex<bool>, Condvar)> = OnceLock::new();
        GATE.get_or_init(|| (Mutex::new(false), Condvar::new()))
    }
}

#[cfg(not(target_os = "macos"))]
pub fn run_main_loop() {
    let (lock, condvar) = parked::gate();
    let mut stopped = lock.lock().unwrap_or_else(|e| e.into_inner());
    while !*stopped {
        stopped = condvar
            .wait(stopped)
            .unwrap_or_else(|e| e.into_inner());
    }
}

#[cfg(not(target_os = "macos"))]
pub fn stop_main_loop() {
    let (lock, condvar) = parked::gate();
    *lock.lock().unwrap_or_else(|e| e.into_inner()) = true;
    condvar.notify_all();
}
