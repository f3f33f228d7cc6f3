//! CGEventTap adapter: exclusive keyboard capture.
//!
//! The tap runs on a dedicated thread with its own CFRunLoop. The OS-level
//! tap stays installed for the process lifetime; the port's enable/disable
//! flips an atomic that decides per event whether it is translated,
//! forwarded to the handler, and swallowed, or passed through untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use core_foundation::mach_port::CFMachPortRef;
use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventType, EventField,
};
use foreign_types::ForeignType;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::keys::{self, Key};
use crate::ports::{EventTapPort, KeyHandler};

/// Virtual key codes with fixed control-byte translations.
const VK_RETURN: i64 = 36;
const VK_TAB: i64 = 48;
const VK_DELETE: i64 = 51;
const VK_ESCAPE: i64 = 53;

/// Wrapper for CFMachPortRef that is Send + Sync.
/// SAFETY: the mach port is only touched from the tap callback and the event
/// loop thread, which are the same thread.
struct SendableMachPortRef(Option<CFMachPortRef>);
unsafe impl Send for SendableMachPortRef {}
unsafe impl Sync for SendableMachPortRef {}

pub struct EventTap {
    capturing: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<KeyHandler>>>,
    running: Arc<AtomicBool>,
    run_loop: Arc<Mutex<Option<SendableRunLoop>>>,
    _thread: JoinHandle<()>,
}

/// CFRunLoop handle usable from the owner thread for shutdown.
/// SAFETY: CFRunLoopStop is documented thread-safe.
struct SendableRunLoop(CFRunLoop);
unsafe impl Send for SendableRunLoop {}
unsafe impl Sync for SendableRunLoop {}

impl EventTap {
    /// Install the tap and start its run-loop thread. Fails when the OS
    /// refuses the tap (missing accessibility permissions).
    pub fn spawn() -> Result<Arc<Self>> {
        let capturing = Arc::new(AtomicBool::new(false));
        let handler: Arc<Mutex<Option<KeyHandler>>> = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let run_loop = Arc::new(Mutex::new(None));

        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();
        let thread = {
            let capturing = capturing.clone();
            let handler = handler.clone();
            let running = running.clone();
            let run_loop = run_loop.clone();
            std::thread::Builder::new()
                .name("keywarp-event-tap".into())
                .spawn(move || {
                    event_loop(capturing, handler, running, run_loop, ready_tx);
                })
                .map_err(|err| Error::Internal(format!("event tap thread: {err}")))?
        };

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => Ok(Arc::new(Self {
                capturing,
                handler,
                running,
                run_loop,
                _thread: thread,
            })),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(Error::Internal("event tap thread did not start".into())),
        }
    }
}

impl Drop for EventTap {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(run_loop) = self.run_loop.lock().take() {
            run_loop.0.stop();
        }
    }
}

impl EventTapPort for EventTap {
    fn enable(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(Error::Internal("event tap thread is gone".into()));
        }
        self.capturing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&self) {
        self.capturing.store(false, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn set_handler(&self, handler: KeyHandler) {
        *self.handler.lock() = Some(handler);
    }
}

fn event_loop(
    capturing: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<KeyHandler>>>,
    running: Arc<AtomicBool>,
    run_loop_storage: Arc<Mutex<Option<SendableRunLoop>>>,
    ready_tx: std::sync::mpsc::Sender<Result<()>>,
) {
    let current = CFRunLoop::get_current();
    *run_loop_storage.lock() = Some(SendableRunLoop(current.clone()));

    // Shared mach port ref so the callback can re-enable the tap when the OS
    // disables it (timeout or user input).
    let mach_port_ref: Arc<Mutex<SendableMachPortRef>> =
        Arc::new(Mutex::new(SendableMachPortRef(None)));
    let mach_port_for_callback = mach_port_ref.clone();

    let tap_result = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        // Default (not listen-only): captured keys must not reach the app.
        CGEventTapOptions::Default,
        vec![CGEventType::KeyDown],
        move |_proxy, event_type, event: &CGEvent| {
            match event_type {
                CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                    warn!("event tap disabled by the OS, re-enabling");
                    reenable_tap(&mach_port_for_callback);
                    return None;
                }
                CGEventType::KeyDown => {}
                _ => return None,
            }

            if !capturing.load(Ordering::SeqCst) {
                // Idle: pass the event through untouched.
                return None;
            }

            if let Some(key) = translate(event) {
                let handler = handler.lock().clone();
                if let Some(handler) = handler {
                    handler(key);
                }
            }
            // Swallow: turning the event into a null event stops delivery.
            swallow(event);
            None
        },
    );

    let tap = match tap_result {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create event tap; accessibility permissions may be missing");
            let _ = ready_tx.send(Err(Error::PermissionDenied));
            return;
        }
    };

    mach_port_ref.lock().0 = Some(tap.mach_port.as_concrete_TypeRef());

    let source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready_tx.send(Err(Error::Internal(
                "failed to create run loop source for event tap".into(),
            )));
            return;
        }
    };
    unsafe {
        current.add_source(&source, kCFRunLoopCommonModes);
    }
    tap.enable();
    info!("event tap installed");
    let _ = ready_tx.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        let result = CFRunLoop::run_in_mode(
            unsafe { kCFRunLoopDefaultMode },
            Duration::from_millis(100),
            true,
        );
        if matches!(
            result,
            core_foundation::runloop::CFRunLoopRunResult::Stopped
        ) {
            break;
        }
    }
    debug!("event tap loop exiting");
}

fn reenable_tap(mach_port_ref: &Arc<Mutex<SendableMachPortRef>>) {
    extern "C" {
        fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    }
    if let Some(port) = mach_port_ref.lock().0 {
        unsafe {
            CGEventTapEnable(port, true);
        }
    }
}

/// Consume the event so the focused application never sees it.
fn swallow(event: &CGEvent) {
    extern "C" {
        fn CGEventSetType(event: core_graphics::sys::CGEventRef, event_type: u32);
    }
    const K_CG_EVENT_NULL: u32 = 0;
    unsafe {
        CGEventSetType(event.as_ptr(), K_CG_EVENT_NULL);
    }
}

/// Translate a key-down event into the canonical [`Key`] form: fixed control
/// bytes for escape/tab/return/backspace, control bytes for Ctrl-chords, and
/// layout-aware printable characters otherwise.
fn translate(event: &CGEvent) -> Option<Key> {
    let key_code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
    match key_code {
        VK_ESCAPE => return Some(Key::Control(keys::ESCAPE)),
        VK_TAB => return Some(Key::Control(keys::TAB)),
        VK_RETURN => return Some(Key::Control(keys::ENTER)),
        VK_DELETE => return Some(Key::Control(keys::BACKSPACE)),
        _ => {}
    }

    let character = unicode_character(event)?;
    let flags = event.get_flags();
    if flags.contains(CGEventFlags::CGEventFlagControl) && character.is_ascii() {
        let byte = (character.to_ascii_uppercase() as u8) & 0x1F;
        return Some(Key::Control(byte));
    }
    if character.is_ascii_control() {
        return Some(Key::Control(character as u8));
    }
    Some(Key::Char(character))
}

/// First character the event would type, accounting for keyboard layout and
/// modifiers.
fn unicode_character(event: &CGEvent) -> Option<char> {
    extern "C" {
        fn CGEventKeyboardGetUnicodeString(
            event: core_graphics::sys::CGEventRef,
            max_len: libc::c_ulong,
            actual_len: *mut libc::c_ulong,
            buffer: *mut u16,
        );
    }

    const BUFFER_SIZE: usize = 8;
    let mut buffer = [0u16; BUFFER_SIZE];
    let mut actual_len: libc::c_ulong = 0;
    unsafe {
        CGEventKeyboardGetUnicodeString(
            event.as_ptr(),
            BUFFER_SIZE as libc::c_ulong,
            &mut actual_len,
            buffer.as_mut_ptr(),
        );
    }
    let len = (actual_len as usize).min(BUFFER_SIZE);
    if len == 0 {
        return None;
    }
    String::from_utf16_lossy(&buffer[..len]).chars().next()
}
