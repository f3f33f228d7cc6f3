//! Cursor capture and restore across mode transitions and screen changes.

use crate::geometry::{remap_point, Point, Rect};

/// Cursor state created when a mode is first entered from Idle and consumed
/// (restored or explicitly skipped) on the way back. Never leaked: the
/// controller resets it on every return to Idle.
#[derive(Debug, Clone, Default)]
pub struct CursorState {
    captured: Option<Captured>,
    skip_next_restore: bool,
}

#[derive(Debug, Clone, Copy)]
struct Captured {
    pos: Point,
    screen: Rect,
}

impl CursorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `(pos, screen)` unless already captured; re-activation of the
    /// same mode keeps the original capture so chained commits still restore
    /// to where the user started.
    pub fn capture(&mut self, pos: Point, screen: Rect) {
        if self.captured.is_none() {
            self.captured = Some(Captured { pos, screen });
        }
    }

    pub fn is_captured(&self) -> bool {
        self.captured.is_some()
    }

    /// Arm the skip flag: the next restore opportunity is consumed without
    /// moving the cursor (scroll mode and committed points stay put).
    pub fn set_skip_next_restore(&mut self) {
        self.skip_next_restore = true;
    }

    pub fn skip_next_restore(&self) -> bool {
        self.skip_next_restore
    }

    /// Where the cursor should be restored to, given the screen bounds at
    /// exit time. `None` when nothing was captured or the skip flag is set.
    /// Same-screen restores are the identity; a changed screen remaps the
    /// captured point proportionally.
    pub fn restore_target(&self, current_screen: Rect) -> Option<Point> {
        if self.skip_next_restore {
            return None;
        }
        let captured = self.captured?;
        Some(remap_point(captured.pos, &captured.screen, &current_screen))
    }

    pub fn reset(&mut self) {
        self.captured = None;
        self.skip_next_restore = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect::new(0, 0, 1920, 1080);

    #[test]
    fn capture_is_first_write_wins() {
        let mut state = CursorState::new();
        state.capture(Point::new(10, 10), SCREEN);
        state.capture(Point::new(500, 500), SCREEN);
        assert_eq!(state.restore_target(SCREEN), Some(Point::new(10, 10)));
    }

    #[test]
    fn same_screen_restore_is_identity() {
        let mut state = CursorState::new();
        state.capture(Point::new(123, 456), SCREEN);
        assert_eq!(state.restore_target(SCREEN), Some(Point::new(123, 456)));
    }

    #[test]
    fn changed_screen_remaps_proportionally() {
        let mut state = CursorState::new();
        state.capture(Point::new(960, 540), SCREEN);
        let other = Rect::new(1920, 0, 960, 540);
        assert_eq!(state.restore_target(other), Some(Point::new(2400, 270)));
    }

    #[test]
    fn skip_flag_suppresses_restore() {
        let mut state = CursorState::new();
        state.capture(Point::new(1, 2), SCREEN);
        state.set_skip_next_restore();
        assert_eq!(state.restore_target(SCREEN), None);
    }

    #[test]
    fn reset_clears_capture_and_skip() {
        let mut state = CursorState::new();
        state.capture(Point::new(1, 2), SCREEN);
        state.set_skip_next_restore();
        state.reset();
        assert!(!state.is_captured());
        assert!(!state.skip_next_restore());
        assert_eq!(state.restore_target(SCREEN), None);
    }

    #[test]
    fn restore_is_idempotent_across_cycles() {
        // Two successive capture/restore cycles from the same start point
        // return the same target.
        let start = Point::new(333, 777);
        let mut first = CursorState::new();
        first.capture(start, SCREEN);
        let restored = first.restore_target(SCREEN).unwrap();
        first.reset();

        let mut second = CursorState::new();
        second.capture(restored, SCREEN);
        assert_eq!(second.restore_target(SCREEN), Some(restored));
    }
}
