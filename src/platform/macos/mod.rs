//! macOS adapters: event tap, accessibility/input, overlay panel.

pub mod accessibility;
pub mod event_tap;
pub mod overlay;

use crate::config::ConfigHandle;
use crate::error::{Result, ResultExt};
use crate::ports::{AccessibilityPort, Ports};

/// Build the real macOS port bundle. Call from the main thread before the
/// main run loop starts (the hotkey manager and panel require it).
pub fn build_ports(config: ConfigHandle) -> Result<Ports> {
    let accessibility = accessibility::MacAccessibility::new(config);
    accessibility
        .as_ref()
        .check_permissions()
        .warn_on_err();
    Ok(Ports {
        accessibility: accessibility.clone(),
        overlay: overlay::OverlayPanel::new(),
        event_tap: event_tap::EventTap::spawn()?,
        hotkeys: crate::platform::hotkeys::GlobalHotkeys::new()?,
    })
}

/// Queue a closure onto the main dispatch queue. The daemon's main thread
/// pumps the main CFRunLoop, which drains this queue.
pub fn on_main(work: impl FnOnce() + Send + 'static) {
    use std::os::raw::c_void;

    #[repr(C)]
    struct DispatchQueue {
        _private: [u8; 0],
    }

    extern "C" {
        static _dispatch_main_q: DispatchQueue;
        fn dispatch_async_f(
            queue: *const DispatchQueue,
            context: *mut c_void,
            work: extern "C" fn(*mut c_void),
        );
    }

    extern "C" fn trampoline(context: *mut c_void) {
        // SAFETY: the pointer was produced by Box::into_raw below and is
        // consumed exactly once.
        let work = unsafe { Box::from_raw(context as *mut Box<dyn FnOnce() + Send>) };
        work();
    }

    let boxed: Box<Box<dyn FnOnce() + Send>> = Box::new(Box::new(work));
    unsafe {
        dispatch_async_f(
            &_dispatch_main_q,
            Box::into_raw(boxed) as *mut c_void,
            trampoline,
        );
    }
}
