//! The interactive navigation modes.
//!
//! Exactly one mode is current at any instant; the controller owns the
//! current [`ActiveMode`] and pumps every captured keystroke into it. All
//! modes share the same lifecycle: `activate`, `handle_key` until the
//! outcome says otherwise, then `partial_cleanup` (re-activation) or `exit`.

mod action;
mod grid;
mod hints;
mod recursive;
mod scroll;

pub use action::{ActionKeys, ActionMode};
pub use grid::GridMode;
pub use hints::HintsMode;
pub use recursive::RecursiveMode;
pub use scroll::ScrollMode;

use std::sync::Arc;
use std::time::Duration;

use strum::{Display, EnumString};

use crate::actions::Dispatcher;
use crate::config::Config;
use crate::keys::Key;
use crate::ports::{AccessibilityPort, Color, OverlayPort};

/// Top-level navigation state tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Mode {
    Idle,
    Hints,
    Grid,
    RecursiveGrid,
    Scroll,
    Action,
}

/// Deadline for accessibility element enumeration during activation.
pub const ENUMERATION_DEADLINE: Duration = Duration::from_secs(5);

/// Border highlight shown while action keys are live.
pub const ACTION_HIGHLIGHT_COLOR: Color = Color::rgba(0xFF, 0x95, 0x00, 0xFF);
/// Scroll-position indicator color.
pub const SCROLL_HIGHLIGHT_COLOR: Color = Color::rgba(0x34, 0xC7, 0x59, 0xFF);
/// Highlight stroke width in pixels.
pub const HIGHLIGHT_WIDTH: i32 = 3;
/// Side of the square scroll-position indicator.
pub const SCROLL_INDICATOR_SIZE: i32 = 48;

/// What the controller should do after a keystroke was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Keep the mode running.
    Stay,
    /// The mode committed (or finished); tear down and return to Idle. The
    /// cursor stays at the committed point rather than being restored.
    Committed,
    /// Committed with no pending action: re-enter the same mode on the same
    /// screen so the user can chain commits.
    Reactivate,
}

/// Dependencies handed to a mode at activation. The config is a snapshot; a
/// live reload never changes a running mode's semantics.
#[derive(Clone)]
pub struct ModeContext {
    pub accessibility: Arc<dyn AccessibilityPort>,
    pub overlay: Arc<dyn OverlayPort>,
    pub dispatcher: Dispatcher,
    pub config: Arc<Config>,
}

/// The currently-running mode. A closed enum keeps dispatch exhaustive; new
/// modes extend the enum rather than registering callbacks.
pub enum ActiveMode {
    Idle,
    Hints(HintsMode),
    Grid(GridMode),
    RecursiveGrid(RecursiveMode),
    Scroll(ScrollMode),
    Action(ActionMode),
}

impl ActiveMode {
    pub fn tag(&self) -> Mode {
        match self {
            ActiveMode::Idle => Mode::Idle,
            ActiveMode::Hints(_) => Mode::Hints,
            ActiveMode::Grid(_) => Mode::Grid,
            ActiveMode::RecursiveGrid(_) => Mode::RecursiveGrid,
            ActiveMode::Scroll(_) => Mode::Scroll,
            ActiveMode::Action(_) => Mode::Action,
        }
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        match self {
            ActiveMode::Idle => KeyOutcome::Stay,
            ActiveMode::Hints(mode) => mode.handle_key(key),
            ActiveMode::Grid(mode) => mode.handle_key(key),
            ActiveMode::RecursiveGrid(mode) => mode.handle_key(key),
            ActiveMode::Scroll(mode) => mode.handle_key(key),
            ActiveMode::Action(mode) => mode.handle_key(key),
        }
    }

    /// Clear overlay contents and stop mode-local polling, but keep keyboard
    /// capture and cursor state. Used when re-entering the same mode.
    pub fn partial_cleanup(&mut self) {
        match self {
            ActiveMode::Idle => {}
            ActiveMode::Hints(mode) => mode.partial_cleanup(),
            ActiveMode::Grid(mode) => mode.partial_cleanup(),
            ActiveMode::RecursiveGrid(mode) => mode.partial_cleanup(),
            ActiveMode::Scroll(mode) => mode.partial_cleanup(),
            ActiveMode::Action(mode) => mode.partial_cleanup(),
        }
    }

    /// Mode-specific teardown on the way back to Idle.
    pub fn exit(&mut self) {
        match self {
            ActiveMode::Idle => {}
            ActiveMode::Hints(mode) => mode.exit(),
            ActiveMode::Grid(mode) => mode.exit(),
            ActiveMode::RecursiveGrid(mode) => mode.exit(),
            ActiveMode::Scroll(mode) => mode.exit(),
            ActiveMode::Action(mode) => mode.exit(),
        }
    }
}
