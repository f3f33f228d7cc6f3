//! Accessibility and input-injection adapter.
//!
//! Element enumeration walks the AX tree of the frontmost application.
//! Pointer input is injected with CGEvents; screens come from CoreGraphics
//! display APIs; the frontmost app and notifications go through AppKit and
//! osascript.

#![allow(non_upper_case_globals)]

use std::os::raw::c_void;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cocoa::base::{id, nil};
use core_foundation::array::{CFArrayGetCount, CFArrayGetValueAtIndex, CFArrayRef};
use core_foundation::base::{CFRelease, CFTypeRef, TCFType};
use core_foundation::string::{CFString, CFStringRef};
use core_graphics::display::CGDisplay;
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::{CGPoint, CGSize};
use objc::{class, msg_send, sel, sel_impl};
use tracing::{debug, warn};

use crate::config::ConfigHandle;
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use crate::ports::{AccessibilityPort, ClickKind, Element, ElementFilter};

/// Caps on the AX walk so a pathological tree cannot wedge activation.
const MAX_TREE_DEPTH: usize = 32;
const MAX_ELEMENTS: usize = 2048;

type AXUIElementRef = *const c_void;
type AXValueRef = *const c_void;
type AXError = i32;

const kAXErrorSuccess: AXError = 0;
const kAXValueCGPointType: u32 = 1;
const kAXValueCGSizeType: u32 = 2;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXUIElementCreateApplication(pid: libc::pid_t) -> AXUIElementRef;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: *mut CFTypeRef,
    ) -> AXError;
    fn AXValueGetValue(value: AXValueRef, value_type: u32, out: *mut c_void) -> bool;
}

#[link(name = "Carbon", kind = "framework")]
extern "C" {
    fn IsSecureEventInputEnabled() -> bool;
}

extern "C" {
    fn CGEventCreateScrollWheelEvent2(
        source: *const c_void,
        units: u32,
        wheel_count: u32,
        wheel1: i32,
        wheel2: i32,
        wheel3: i32,
    ) -> core_graphics::sys::CGEventRef;
    fn CGEventPost(tap: u32, event: core_graphics::sys::CGEventRef);
}

const kCGScrollEventUnitPixel: u32 = 0;
const kCGHIDEventTap: u32 = 0;

pub struct MacAccessibility {
    config: ConfigHandle,
}

impl MacAccessibility {
    pub fn new(config: ConfigHandle) -> Arc<Self> {
        Arc::new(Self { config })
    }

    fn event_source(&self) -> Result<CGEventSource> {
        CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|()| Error::AccessibilityFailed("cannot create event source".into()))
    }

    fn post_mouse(&self, event_type: CGEventType, button: CGMouseButton, point: Point) -> Result<()> {
        let source = self.event_source()?;
        let event = CGEvent::new_mouse_event(
            source,
            event_type,
            CGPoint::new(point.x as f64, point.y as f64),
            button,
        )
        .map_err(|()| Error::AccessibilityFailed("cannot create mouse event".into()))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn frontmost_app(&self) -> Result<(libc::pid_t, String)> {
        unsafe {
            let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
            let app: id = msg_send![workspace, frontmostApplication];
            if app == nil {
                return Err(Error::AccessibilityFailed("no frontmost application".into()));
            }
            let pid: libc::pid_t = msg_send![app, processIdentifier];
            let bundle: id = msg_send![app, bundleIdentifier];
            let bundle_id = if bundle == nil {
                String::new()
            } else {
                ns_string_to_string(bundle)
            };
            Ok((pid, bundle_id))
        }
    }
}

impl AccessibilityPort for MacAccessibility {
    fn clickable_elements(
        &self,
        filter: &ElementFilter,
        timeout: Duration,
    ) -> Result<Vec<Element>> {
        let (pid, _) = self.frontmost_app()?;
        let screen = self.active_screen_bounds()?;
        let deadline = Instant::now() + timeout;

        let app = unsafe { AXUIElementCreateApplication(pid) };
        if app.is_null() {
            return Err(Error::AccessibilityFailed("AX application handle".into()));
        }
        let mut collected = Vec::new();
        let walked = walk_element(app, filter, &screen, deadline, 0, &mut collected);
        unsafe { CFRelease(app as CFTypeRef) };
        walked.map_err(|err| match err {
            Error::Timeout { .. } => Error::timeout("element enumeration", timeout),
            other => other,
        })?;

        debug!(count = collected.len(), "AX elements collected");
        Ok(collected)
    }

    fn scrollable_elements(&self) -> Result<Vec<Element>> {
        let filter = ElementFilter {
            roles: vec!["AXScrollArea".to_string()],
            min_size: 16,
            include_offscreen: false,
        };
        self.clickable_elements(&filter, Duration::from_secs(5))
    }

    fn perform_action_at_point(&self, kind: ClickKind, point: Point) -> Result<()> {
        match kind {
            ClickKind::Left => {
                self.post_mouse(CGEventType::LeftMouseDown, CGMouseButton::Left, point)?;
                self.post_mouse(CGEventType::LeftMouseUp, CGMouseButton::Left, point)
            }
            ClickKind::Right => {
                self.post_mouse(CGEventType::RightMouseDown, CGMouseButton::Right, point)?;
                self.post_mouse(CGEventType::RightMouseUp, CGMouseButton::Right, point)
            }
            ClickKind::Middle => {
                self.post_mouse(CGEventType::OtherMouseDown, CGMouseButton::Center, point)?;
                self.post_mouse(CGEventType::OtherMouseUp, CGMouseButton::Center, point)
            }
            ClickKind::Down => {
                self.post_mouse(CGEventType::LeftMouseDown, CGMouseButton::Left, point)
            }
            ClickKind::Up => self.post_mouse(CGEventType::LeftMouseUp, CGMouseButton::Left, point),
        }
    }

    fn scroll(&self, delta_x: i32, delta_y: i32) -> Result<()> {
        unsafe {
            let event = CGEventCreateScrollWheelEvent2(
                std::ptr::null(),
                kCGScrollEventUnitPixel,
                2,
                delta_y,
                delta_x,
                0,
            );
            if event.is_null() {
                return Err(Error::AccessibilityFailed("cannot create scroll event".into()));
            }
            CGEventPost(kCGHIDEventTap, event);
            CFRelease(event as CFTypeRef);
        }
        Ok(())
    }

    fn cursor_position(&self) -> Result<Point> {
        let source = self.event_source()?;
        let event = CGEvent::new(source)
            .map_err(|()| Error::AccessibilityFailed("cannot read cursor".into()))?;
        let location = event.location();
        Ok(Point::new(location.x as i32, location.y as i32))
    }

    fn move_cursor(&self, point: Point) -> Result<()> {
        self.post_mouse(CGEventType::MouseMoved, CGMouseButton::Left, point)
    }

    fn active_screen_bounds(&self) -> Result<Rect> {
        let cursor = self.cursor_position()?;
        let displays = CGDisplay::active_displays()
            .map_err(|err| Error::AccessibilityFailed(format!("display list: {err}")))?;
        let mut main_bounds = None;
        for display_id in displays {
            let display = CGDisplay::new(display_id);
            let bounds = cg_rect_to_rect(display.bounds());
            if main_bounds.is_none() {
                main_bounds = Some(bounds);
            }
            if bounds.contains_point(cursor) {
                return Ok(bounds);
            }
        }
        main_bounds.ok_or_else(|| Error::AccessibilityFailed("no active display".into()))
    }

    fn focused_app_bundle_id(&self, timeout: Duration) -> Result<String> {
        // The lookup is fast, but a wedged WindowServer can stall it; honor
        // the deadline by doing it off-thread.
        let (tx, rx) = std::sync::mpsc::channel();
        let this = Self {
            config: self.config.clone(),
        };
        std::thread::Builder::new()
            .name("keywarp-frontmost".into())
            .spawn(move || {
                let _ = tx.send(this.frontmost_app().map(|(_, bundle)| bundle));
            })
            .map_err(|err| Error::Internal(format!("frontmost lookup thread: {err}")))?;
        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(_) => Err(Error::timeout("focused app lookup", timeout)),
        }
    }

    fn is_app_excluded(&self, bundle_id: &str) -> bool {
        self.config
            .get()
            .exclusions
            .app_bundle_ids
            .iter()
            .any(|excluded| excluded == bundle_id)
    }

    fn check_permissions(&self) -> Result<()> {
        if macos_accessibility_client::accessibility::application_is_trusted() {
            Ok(())
        } else {
            Err(Error::PermissionDenied)
        }
    }

    fn is_secure_input_enabled(&self) -> bool {
        unsafe { IsSecureEventInputEnabled() }
    }

    fn post_notification(&self, title: &str, body: &str) {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            escape_osascript(body),
            escape_osascript(title)
        );
        let result = std::process::Command::new("osascript")
            .arg("-e")
            .arg(script)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
        if let Err(err) = result {
            warn!(error = %err, "osascript notification failed");
        }
    }
}

fn cg_rect_to_rect(rect: core_graphics::geometry::CGRect) -> Rect {
    Rect::new(
        rect.origin.x as i32,
        rect.origin.y as i32,
        rect.size.width as i32,
        rect.size.height as i32,
    )
}

fn escape_osascript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn ns_string_to_string(ns_string: id) -> String {
    unsafe {
        let utf8: *const libc::c_char = msg_send![ns_string, UTF8String];
        if utf8.is_null() {
            String::new()
        } else {
            std::ffi::CStr::from_ptr(utf8).to_string_lossy().into_owned()
        }
    }
}

fn copy_attribute(element: AXUIElementRef, name: &str) -> Option<CFTypeRef> {
    let attribute = CFString::new(name);
    let mut value: CFTypeRef = std::ptr::null();
    let err = unsafe {
        AXUIElementCopyAttributeValue(element, attribute.as_concrete_TypeRef(), &mut value)
    };
    if err == kAXErrorSuccess && !value.is_null() {
        Some(value)
    } else {
        None
    }
}

fn string_attribute(element: AXUIElementRef, name: &str) -> Option<String> {
    let value = copy_attribute(element, name)?;
    let string =
        unsafe { CFString::wrap_under_create_rule(value as CFStringRef) }.to_string();
    Some(string)
}

fn frame_attribute(element: AXUIElementRef) -> Option<Rect> {
    let position = copy_attribute(element, "AXPosition")?;
    let mut point = CGPoint::new(0.0, 0.0);
    let got_point = unsafe {
        let ok = AXValueGetValue(
            position,
            kAXValueCGPointType,
            &mut point as *mut CGPoint as *mut c_void,
        );
        CFRelease(position);
        ok
    };

    let size = copy_attribute(element, "AXSize")?;
    let mut cg_size = CGSize::new(0.0, 0.0);
    let got_size = unsafe {
        let ok = AXValueGetValue(
            size,
            kAXValueCGSizeType,
            &mut cg_size as *mut CGSize as *mut c_void,
        );
        CFRelease(size);
        ok
    };

    if got_point && got_size {
        Some(Rect::new(
            point.x as i32,
            point.y as i32,
            cg_size.width as i32,
            cg_size.height as i32,
        ))
    } else {
        None
    }
}

/// Depth-first walk honoring the deadline and the element caps.
fn walk_element(
    element: AXUIElementRef,
    filter: &ElementFilter,
    screen: &Rect,
    deadline: Instant,
    depth: usize,
    out: &mut Vec<Element>,
) -> Result<()> {
    if depth > MAX_TREE_DEPTH || out.len() >= MAX_ELEMENTS {
        return Ok(());
    }
    if Instant::now() >= deadline {
        return Err(Error::timeout("element enumeration", Duration::ZERO));
    }

    if let Some(role) = string_attribute(element, "AXRole") {
        let role_matches = filter.roles.is_empty() || filter.roles.iter().any(|r| r == &role);
        if role_matches {
            if let Some(bounds) = frame_attribute(element) {
                let on_screen = filter.include_offscreen || screen.contains_point(bounds.center());
                if bounds.width >= filter.min_size && bounds.height >= filter.min_size && on_screen
                {
                    out.push(Element {
                        role,
                        title: string_attribute(element, "AXTitle"),
                        bounds,
                    });
                }
            }
        }
    }

    let Some(children) = copy_attribute(element, "AXChildren") else {
        return Ok(());
    };
    let children = children as CFArrayRef;
    let count = unsafe { CFArrayGetCount(children) };
    for i in 0..count {
        let child = unsafe { CFArrayGetValueAtIndex(children, i) } as AXUIElementRef;
        if child.is_null() {
            continue;
        }
        let result = walk_element(child, filter, screen, deadline, depth + 1, out);
        if result.is_err() {
            unsafe { CFRelease(children as CFTypeRef) };
            return result;
        }
    }
    unsafe { CFRelease(children as CFTypeRef) };
    Ok(())
}
