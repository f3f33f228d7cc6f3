//! Ports consumed by the daemon core.
//!
//! The OS-level collaborators (accessibility tree, overlay window, keyboard
//! event tap, global hotkey source) sit behind these object-safe traits. The
//! macOS adapters live in `crate::platform`; the test suites run the whole
//! controller against the in-memory fakes in [`fake`].

#[cfg(test)]
pub mod fake;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::keys::Key;

/// An element reported by the accessibility tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub role: String,
    pub title: Option<String>,
    pub bounds: Rect,
}

impl Element {
    pub fn center(&self) -> Point {
        self.bounds.center()
    }
}

/// Filter applied during accessibility element collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFilter {
    /// Accepted roles; empty accepts everything.
    pub roles: Vec<String>,
    /// Elements smaller than this on either axis are dropped.
    pub min_size: i32,
    /// Keep elements whose center lies outside the active screen.
    pub include_offscreen: bool,
}

impl Default for ElementFilter {
    fn default() -> Self {
        Self {
            roles: Vec::new(),
            min_size: 4,
            include_offscreen: false,
        }
    }
}

/// Mouse action kinds performed at a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClickKind {
    Left,
    Right,
    Middle,
    Down,
    Up,
}

/// RGBA color used by the highlight draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// A hint ready for rendering: label, how much of it is already matched,
/// and where it anchors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintDraw {
    pub label: String,
    pub matched: usize,
    pub position: Point,
    pub bounds: Rect,
}

/// One flat-grid cell ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCellDraw {
    pub label: String,
    pub matched: usize,
    pub bounds: Rect,
    /// Unmatched cells are dimmed, or dropped when `hide_unmatched` is set.
    pub visible: bool,
}

/// The open 3x3 subgrid inside a fully-matched cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubgridDraw {
    pub bounds: Rect,
    /// Row-major subcell keys, 9 of them.
    pub keys: Vec<char>,
}

/// Full flat-grid frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridDraw {
    pub bounds: Rect,
    pub cells: Vec<GridCellDraw>,
    pub subgrid: Option<SubgridDraw>,
}

/// The overlay window: a process-wide singleton behind this port.
pub trait OverlayPort: Send + Sync {
    /// Resize the overlay to the active screen and clear its contents.
    fn set_bounds(&self, bounds: Rect) -> Result<()>;
    fn show_hints(&self, hints: &[HintDraw]) -> Result<()>;
    fn show_grid(&self, grid: &GridDraw) -> Result<()>;
    fn draw_recursive_grid(&self, bounds: Rect, depth: u32, keys: &str, cols: u32, rows: u32)
        -> Result<()>;
    fn draw_scroll_highlight(&self, rect: Rect, color: Color, width: i32) -> Result<()>;
    fn draw_action_highlight(&self, rect: Rect, color: Color, width: i32) -> Result<()>;
    fn hide(&self) -> Result<()>;
    fn refresh(&self) -> Result<()>;
    fn is_visible(&self) -> bool;
}

/// Accessibility and input injection surface.
pub trait AccessibilityPort: Send + Sync {
    /// Enumerate clickable elements on the active screen. Bounded by
    /// `timeout`; implementations return [`crate::error::Error::Timeout`]
    /// when enumeration exceeds it.
    fn clickable_elements(&self, filter: &ElementFilter, timeout: Duration)
        -> Result<Vec<Element>>;
    fn scrollable_elements(&self) -> Result<Vec<Element>>;
    fn perform_action_at_point(&self, kind: ClickKind, point: Point) -> Result<()>;
    /// Scroll by pixel deltas at the current cursor position.
    fn scroll(&self, delta_x: i32, delta_y: i32) -> Result<()>;
    fn cursor_position(&self) -> Result<Point>;
    fn move_cursor(&self, point: Point) -> Result<()>;
    /// Bounds of the screen hosting the cursor.
    fn active_screen_bounds(&self) -> Result<Rect>;
    /// Bundle identifier of the frontmost app, bounded by `timeout`.
    fn focused_app_bundle_id(&self, timeout: Duration) -> Result<String>;
    fn is_app_excluded(&self, bundle_id: &str) -> bool;
    fn check_permissions(&self) -> Result<()>;
    fn is_secure_input_enabled(&self) -> bool;
    /// Post a user-visible notification (used for secure-input refusals).
    fn post_notification(&self, title: &str, body: &str);
}

/// Handler invoked for every key captured while the tap is enabled.
pub type KeyHandler = Arc<dyn Fn(Key) + Send + Sync>;

/// The global keyboard event tap: a process-wide singleton.
pub trait EventTapPort: Send + Sync {
    fn enable(&self) -> Result<()>;
    fn disable(&self);
    fn is_enabled(&self) -> bool;
    /// Install the single key handler. Installing again replaces it.
    fn set_handler(&self, handler: KeyHandler);
}

/// Callback invoked when a registered hotkey fires.
pub type HotkeyCallback = Arc<dyn Fn() + Send + Sync>;

/// Global hotkey registration, keyed by the binding string.
pub trait HotkeyPort: Send + Sync {
    fn register(&self, binding: &str, callback: HotkeyCallback) -> Result<()>;
    fn unregister(&self, binding: &str) -> Result<()>;
    fn unregister_all(&self);
    fn is_registered(&self, binding: &str) -> bool;
}

/// The full port bundle handed to the controller and daemon wiring.
#[derive(Clone)]
pub struct Ports {
    pub accessibility: Arc<dyn AccessibilityPort>,
    pub overlay: Arc<dyn OverlayPort>,
    pub event_tap: Arc<dyn EventTapPort>,
    pub hotkeys: Arc<dyn HotkeyPort>,
}
