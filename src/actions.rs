//! Abstract cursor actions and their translation onto the accessibility port.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::ports::{AccessibilityPort, ClickKind};

/// Hard deadline for `Exec` commands.
const EXEC_DEADLINE: Duration = Duration::from_secs(30);
/// Poll interval while waiting for an `Exec` child.
const EXEC_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    /// Wheel-convention deltas: positive y scrolls up, positive x scrolls left.
    pub fn deltas(&self, amount: i32) -> (i32, i32) {
        match self {
            ScrollDirection::Up => (0, amount),
            ScrollDirection::Down => (0, -amount),
            ScrollDirection::Left => (amount, 0),
            ScrollDirection::Right => (-amount, 0),
        }
    }
}

/// An action deferred until the active mode commits a point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum PendingAction {
    LeftClick,
    RightClick,
    MiddleClick,
    MouseDown,
    MouseUp,
    MoveMouse,
    Scroll {
        direction: ScrollDirection,
        amount: i32,
    },
    Exec {
        command: String,
    },
}

impl PendingAction {
    /// Parse the wire name used by the control channel.
    pub fn from_wire(name: &str, command: Option<&str>) -> Result<Self> {
        match name {
            "left-click" => Ok(Self::LeftClick),
            "right-click" => Ok(Self::RightClick),
            "middle-click" => Ok(Self::MiddleClick),
            "mouse-down" => Ok(Self::MouseDown),
            "mouse-up" => Ok(Self::MouseUp),
            "move-mouse" => Ok(Self::MoveMouse),
            "exec" => command
                .map(|c| Self::Exec {
                    command: c.to_string(),
                })
                .ok_or_else(|| Error::InvalidInput("exec requires a command".into())),
            other => Err(Error::InvalidInput(format!("unknown action '{other}'"))),
        }
    }
}

impl std::fmt::Display for PendingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeftClick => write!(f, "left-click"),
            Self::RightClick => write!(f, "right-click"),
            Self::MiddleClick => write!(f, "middle-click"),
            Self::MouseDown => write!(f, "mouse-down"),
            Self::MouseUp => write!(f, "mouse-up"),
            Self::MoveMouse => write!(f, "move-mouse"),
            Self::Scroll { direction, amount } => write!(f, "scroll({direction:?}, {amount})"),
            Self::Exec { command } => write!(f, "exec({command})"),
        }
    }
}

/// Translates [`PendingAction`]s into port calls.
#[derive(Clone)]
pub struct Dispatcher {
    accessibility: Arc<dyn AccessibilityPort>,
    exec_deadline: Duration,
}

impl Dispatcher {
    pub fn new(accessibility: Arc<dyn AccessibilityPort>) -> Self {
        Self {
            accessibility,
            exec_deadline: EXEC_DEADLINE,
        }
    }

    #[cfg(test)]
    pub fn with_exec_deadline(mut self, deadline: Duration) -> Self {
        self.exec_deadline = deadline;
        self
    }

    /// Perform `action` at `point`.
    pub fn dispatch(&self, action: &PendingAction, point: Point) -> Result<()> {
        debug!(action = %action, %point, "dispatching action");
        match action {
            PendingAction::LeftClick => self
                .accessibility
                .perform_action_at_point(ClickKind::Left, point),
            PendingAction::RightClick => self
                .accessibility
                .perform_action_at_point(ClickKind::Right, point),
            PendingAction::MiddleClick => self
                .accessibility
                .perform_action_at_point(ClickKind::Middle, point),
            PendingAction::MouseDown => self
                .accessibility
                .perform_action_at_point(ClickKind::Down, point),
            PendingAction::MouseUp => self
                .accessibility
                .perform_action_at_point(ClickKind::Up, point),
            PendingAction::MoveMouse => self.accessibility.move_cursor(point),
            PendingAction::Scroll { direction, amount } => {
                let (dx, dy) = direction.deltas(*amount);
                self.accessibility.scroll(dx, dy)
            }
            PendingAction::Exec { command } => self.exec(command),
        }
    }

    /// Run `command` through the shell, capturing the exit status only.
    /// The child is killed at the deadline.
    fn exec(&self, command: &str) -> Result<()> {
        let mut child = std::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|err| Error::Internal(format!("failed to spawn '{command}': {err}")))?;

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!(command, %status, "exec finished");
                    return Ok(());
                }
                Ok(None) => {
                    if started.elapsed() >= self.exec_deadline {
                        warn!(command, "exec deadline hit, killing child");
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(Error::timeout("exec action", self.exec_deadline));
                    }
                    std::thread::sleep(EXEC_POLL);
                }
                Err(err) => {
                    return Err(Error::Internal(format!("waiting on '{command}': {err}")));
                }
            }
        }
    }
}
