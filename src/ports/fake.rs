//! In-memory port fakes used by the controller and mode test suites.
//!
//! The fakes record every observable side effect (cursor moves, clicks,
//! scrolls, overlay draws, tap transitions) so tests can assert the exact
//! sequencing the spec requires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{
    AccessibilityPort, ClickKind, Color, Element, ElementFilter, EventTapPort, GridDraw,
    HintDraw, HotkeyCallback, HotkeyPort, KeyHandler, OverlayPort, Ports,
};
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use crate::keys::Key;

/// Fake accessibility surface with scriptable element lists and failure modes.
#[derive(Default)]
pub struct FakeAccessibility {
    pub cursor: Mutex<Point>,
    pub screen: Mutex<Rect>,
    pub elements: Mutex<Vec<Element>>,
    pub bundle_id: Mutex<String>,
    pub excluded: Mutex<Vec<String>>,
    pub secure_input: AtomicBool,
    pub permissions_ok: AtomicBool,
    /// When set, `focused_app_bundle_id` simulates hitting its deadline.
    pub exclusion_times_out: AtomicBool,
    /// When set, `clickable_elements` simulates hitting its deadline.
    pub enumeration_times_out: AtomicBool,

    pub moves: Mutex<Vec<Point>>,
    pub actions: Mutex<Vec<(ClickKind, Point)>>,
    pub scrolls: Mutex<Vec<(i32, i32)>>,
    pub notifications: Mutex<Vec<(String, String)>>,
}

impl FakeAccessibility {
    pub fn new(screen: Rect, cursor: Point) -> Self {
        let fake = Self::default();
        *fake.screen.lock() = screen;
        *fake.cursor.lock() = cursor;
        fake.permissions_ok.store(true, Ordering::SeqCst);
        fake
    }

    pub fn set_elements(&self, elements: Vec<Element>) {
        *self.elements.lock() = elements;
    }

    pub fn last_move(&self) -> Option<Point> {
        self.moves.lock().last().copied()
    }
}

impl AccessibilityPort for FakeAccessibility {
    fn clickable_elements(
        &self,
        filter: &ElementFilter,
        timeout: Duration,
    ) -> Result<Vec<Element>> {
        if self.enumeration_times_out.load(Ordering::SeqCst) {
            return Err(Error::timeout("element enumeration", timeout));
        }
        let screen = *self.screen.lock();
        Ok(self
            .elements
            .lock()
            .iter()
            .filter(|e| {
                (filter.roles.is_empty() || filter.roles.contains(&e.role))
                    && e.bounds.width >= filter.min_size
                    && e.bounds.height >= filter.min_size
                    && (filter.include_offscreen || screen.contains_point(e.center()))
            })
            .cloned()
            .collect())
    }

    fn scrollable_elements(&self) -> Result<Vec<Element>> {
        Ok(self
            .elements
            .lock()
            .iter()
            .filter(|e| e.role == "AXScrollArea")
            .cloned()
            .collect())
    }

    fn perform_action_at_point(&self, kind: ClickKind, point: Point) -> Result<()> {
        self.actions.lock().push((kind, point));
        Ok(())
    }

    fn scroll(&self, delta_x: i32, delta_y: i32) -> Result<()> {
        self.scrolls.lock().push((delta_x, delta_y));
        Ok(())
    }

    fn cursor_position(&self) -> Result<Point> {
        Ok(*self.cursor.lock())
    }

    fn move_cursor(&self, point: Point) -> Result<()> {
        *self.cursor.lock() = point;
        self.moves.lock().push(point);
        Ok(())
    }

    fn active_screen_bounds(&self) -> Result<Rect> {
        Ok(*self.screen.lock())
    }

    fn focused_app_bundle_id(&self, timeout: Duration) -> Result<String> {
        if self.exclusion_times_out.load(Ordering::SeqCst) {
            return Err(Error::timeout("focused app lookup", timeout));
        }
        Ok(self.bundle_id.lock().clone())
    }

    fn is_app_excluded(&self, bundle_id: &str) -> bool {
        self.excluded.lock().iter().any(|id| id == bundle_id)
    }

    fn check_permissions(&self) -> Result<()> {
        if self.permissions_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::PermissionDenied)
        }
    }

    fn is_secure_input_enabled(&self) -> bool {
        self.secure_input.load(Ordering::SeqCst)
    }

    fn post_notification(&self, title: &str, body: &str) {
        self.notifications
            .lock()
            .push((title.to_string(), body.to_string()));
    }
}

/// Every overlay call, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCall {
    SetBounds(Rect),
    ShowHints(Vec<HintDraw>),
    ShowGrid(GridDraw),
    DrawRecursiveGrid {
        bounds: Rect,
        depth: u32,
        cols: u32,
        rows: u32,
    },
    DrawScrollHighlight(Rect),
    DrawActionHighlight(Rect),
    Hide,
    Refresh,
}

#[derive(Default)]
pub struct FakeOverlay {
    pub visible: AtomicBool,
    pub calls: Mutex<Vec<OverlayCall>>,
    /// When set, every draw call fails.
    pub failing: AtomicBool,
}

impl FakeOverlay {
    fn record(&self, call: OverlayCall) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::OverlayFailed("fake overlay failure".into()));
        }
        self.calls.lock().push(call);
        Ok(())
    }

    pub fn last_call(&self) -> Option<OverlayCall> {
        self.calls.lock().last().cloned()
    }

    pub fn calls_of<F: Fn(&OverlayCall) -> bool>(&self, pred: F) -> Vec<OverlayCall> {
        self.calls.lock().iter().filter(|c| pred(c)).cloned().collect()
    }
}

impl OverlayPort for FakeOverlay {
    fn set_bounds(&self, bounds: Rect) -> Result<()> {
        self.record(OverlayCall::SetBounds(bounds))
    }

    fn show_hints(&self, hints: &[HintDraw]) -> Result<()> {
        self.visible.store(true, Ordering::SeqCst);
        self.record(OverlayCall::ShowHints(hints.to_vec()))
    }

    fn show_grid(&self, grid: &GridDraw) -> Result<()> {
        self.visible.store(true, Ordering::SeqCst);
        self.record(OverlayCall::ShowGrid(grid.clone()))
    }

    fn draw_recursive_grid(
        &self,
        bounds: Rect,
        depth: u32,
        _keys: &str,
        cols: u32,
        rows: u32,
    ) -> Result<()> {
        self.visible.store(true, Ordering::SeqCst);
        self.record(OverlayCall::DrawRecursiveGrid {
            bounds,
            depth,
            cols,
            rows,
        })
    }

    fn draw_scroll_highlight(&self, rect: Rect, _color: Color, _width: i32) -> Result<()> {
        self.visible.store(true, Ordering::SeqCst);
        self.record(OverlayCall::DrawScrollHighlight(rect))
    }

    fn draw_action_highlight(&self, rect: Rect, _color: Color, _width: i32) -> Result<()> {
        self.visible.store(true, Ordering::SeqCst);
        self.record(OverlayCall::DrawActionHighlight(rect))
    }

    fn hide(&self) -> Result<()> {
        self.visible.store(false, Ordering::SeqCst);
        self.record(OverlayCall::Hide)
    }

    fn refresh(&self) -> Result<()> {
        self.record(OverlayCall::Refresh)
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

/// Fake event tap. Tests drive keystrokes through [`FakeEventTap::press`],
/// which goes through the installed handler exactly like the real tap.
#[derive(Default)]
pub struct FakeEventTap {
    enabled: AtomicBool,
    handler: Mutex<Option<KeyHandler>>,
    /// When set, `enable` fails (simulates a tap the OS refuses to create).
    pub fail_enable: AtomicBool,
}

impl FakeEventTap {
    pub fn press(&self, key: Key) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(key);
        }
    }
}

impl EventTapPort for FakeEventTap {
    fn enable(&self) -> Result<()> {
        if self.fail_enable.load(Ordering::SeqCst) {
            return Err(Error::Internal("event tap refused to enable".into()));
        }
        self.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_handler(&self, handler: KeyHandler) {
        *self.handler.lock() = Some(handler);
    }
}

#[derive(Default)]
pub struct FakeHotkeys {
    registered: Mutex<HashMap<String, HotkeyCallback>>,
}

impl FakeHotkeys {
    pub fn trigger(&self, binding: &str) {
        let callback = self.registered.lock().get(binding).cloned();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn registered_bindings(&self) -> Vec<String> {
        let mut bindings: Vec<String> = self.registered.lock().keys().cloned().collect();
        bindings.sort();
        bindings
    }
}

impl HotkeyPort for FakeHotkeys {
    fn register(&self, binding: &str, callback: HotkeyCallback) -> Result<()> {
        self.registered.lock().insert(binding.to_string(), callback);
        Ok(())
    }

    fn unregister(&self, binding: &str) -> Result<()> {
        self.registered.lock().remove(binding);
        Ok(())
    }

    fn unregister_all(&self) {
        self.registered.lock().clear();
    }

    fn is_registered(&self, binding: &str) -> bool {
        self.registered.lock().contains_key(binding)
    }
}

/// A fully-faked port bundle plus direct handles to each fake.
pub struct FakeWorld {
    pub accessibility: Arc<FakeAccessibility>,
    pub overlay: Arc<FakeOverlay>,
    pub event_tap: Arc<FakeEventTap>,
    pub hotkeys: Arc<FakeHotkeys>,
}

impl FakeWorld {
    pub fn new(screen: Rect, cursor: Point) -> Self {
        Self {
            accessibility: Arc::new(FakeAccessibility::new(screen, cursor)),
            overlay: Arc::new(FakeOverlay::default()),
            event_tap: Arc::new(FakeEventTap::default()),
            hotkeys: Arc::new(FakeHotkeys::default()),
        }
    }

    pub fn ports(&self) -> Ports {
        Ports {
            accessibility: self.accessibility.clone(),
            overlay: self.overlay.clone(),
            event_tap: self.event_tap.clone(),
            hotkeys: self.hotkeys.clone(),
        }
    }
}
