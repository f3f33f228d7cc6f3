//! Recursive grid mode: divide, descend, commit.

use crate::actions::PendingAction;
use crate::error::{Result, ResultExt};
use crate::keys::{self, Key};
use crate::rgrid::{RecursiveGrid, Step};

use super::{KeyOutcome, ModeContext};

pub struct RecursiveMode {
    ctx: ModeContext,
    pending: Option<PendingAction>,
    grid: Option<RecursiveGrid>,
    reset_key: Key,
}

impl RecursiveMode {
    pub fn new(ctx: ModeContext, pending: Option<PendingAction>) -> Result<Self> {
        let reset_key = keys::parse_key(&ctx.config.recursive_grid.reset_key)?;
        Ok(Self {
            ctx,
            pending,
            grid: None,
            reset_key,
        })
    }

    pub fn activate(&mut self) -> Result<()> {
        let screen = self.ctx.accessibility.active_screen_bounds()?;
        let grid = RecursiveGrid::new(screen, &self.ctx.config.recursive_grid);
        self.ctx.accessibility.move_cursor(screen.center())?;
        draw(&self.ctx, &grid)?;
        self.grid = Some(grid);
        Ok(())
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        let Some(grid) = self.grid.as_mut() else {
            return KeyOutcome::Stay;
        };

        // A screen change between keystrokes is handled on the next draw:
        // remap every rectangle proportionally so progress survives.
        if let Some(bounds) = self.ctx.accessibility.active_screen_bounds().log_err() {
            if bounds != grid.initial_bounds() {
                grid.remap(bounds);
                draw(&self.ctx, grid).log_err();
            }
        }

        let step = if key.is_backspace() {
            grid.backtrack()
        } else if keys::key_matches(key, self.reset_key) {
            grid.reset()
        } else if let Some(c) = key.char_lowercase() {
            grid.select(c)
        } else {
            return KeyOutcome::Stay;
        };

        match step {
            Step::Descended { cursor, .. }
            | Step::Backtracked { cursor, .. }
            | Step::Reset { cursor, .. } => {
                self.ctx.accessibility.move_cursor(cursor).log_err();
                draw(&self.ctx, grid).log_err();
                KeyOutcome::Stay
            }
            Step::Committed { point } => {
                self.ctx.accessibility.move_cursor(point).log_err();
                if let Some(action) = self.pending.take() {
                    self.ctx.dispatcher.dispatch(&action, point).log_err();
                }
                KeyOutcome::Committed
            }
            Step::Ignored => KeyOutcome::Stay,
        }
    }

    pub fn partial_cleanup(&mut self) {
        self.grid = None;
    }

    pub fn exit(&mut self) {
        self.grid = None;
    }
}

fn draw(ctx: &ModeContext, grid: &RecursiveGrid) -> Result<()> {
    ctx.overlay.draw_recursive_grid(
        grid.current_bounds(),
        grid.depth(),
        &grid.key_string(),
        grid.cols(),
        grid.rows(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Dispatcher;
    use crate::config::Config;
    use crate::geometry::{Point, Rect};
    use crate::ports::fake::{FakeWorld, OverlayCall};
    use crate::ports::ClickKind;
    use std::sync::Arc;

    const SCREEN: Rect = Rect::new(0, 0, 1920, 1080);

    fn mode(world: &FakeWorld, pending: Option<PendingAction>) -> RecursiveMode {
        let ctx = ModeContext {
            accessibility: world.accessibility.clone(),
            overlay: world.overlay.clone(),
            dispatcher: Dispatcher::new(world.accessibility.clone()),
            config: Arc::new(Config::default()),
        };
        RecursiveMode::new(ctx, pending).unwrap()
    }

    #[test]
    fn activation_centers_cursor_and_draws() {
        let world = FakeWorld::new(SCREEN, Point::new(5, 5));
        let mut rec = mode(&world, None);
        rec.activate().unwrap();
        assert_eq!(world.accessibility.last_move(), Some(Point::new(960, 540)));
        assert!(matches!(
            world.overlay.last_call(),
            Some(OverlayCall::DrawRecursiveGrid { depth: 0, .. })
        ));
    }

    #[test]
    fn descend_backtrack_reset_move_the_cursor() {
        let world = FakeWorld::new(SCREEN, Point::new(5, 5));
        let mut rec = mode(&world, None);
        rec.activate().unwrap();

        assert_eq!(rec.handle_key(Key::Char('u')), KeyOutcome::Stay);
        assert_eq!(world.accessibility.last_move(), Some(Point::new(480, 270)));

        assert_eq!(rec.handle_key(Key::Char('k')), KeyOutcome::Stay);
        assert_eq!(world.accessibility.last_move(), Some(Point::new(720, 405)));

        assert_eq!(rec.handle_key(Key::Control(crate::keys::BACKSPACE)), KeyOutcome::Stay);
        assert_eq!(world.accessibility.last_move(), Some(Point::new(480, 270)));

        // Default reset key Ctrl+R.
        assert_eq!(rec.handle_key(Key::Control(0x12)), KeyOutcome::Stay);
        assert_eq!(world.accessibility.last_move(), Some(Point::new(960, 540)));
    }

    #[test]
    fn undividable_selection_commits_and_dispatches() {
        let world = FakeWorld::new(Rect::new(0, 0, 50, 50), Point::new(5, 5));
        let mut rec = mode(&world, Some(PendingAction::LeftClick));
        rec.activate().unwrap();
        assert_eq!(rec.handle_key(Key::Char('u')), KeyOutcome::Committed);
        assert_eq!(world.accessibility.last_move(), Some(Point::new(12, 12)));
        assert_eq!(
            *world.accessibility.actions.lock(),
            vec![(ClickKind::Left, Point::new(12, 12))]
        );
    }

    #[test]
    fn screen_change_remaps_before_handling_the_key() {
        let world = FakeWorld::new(SCREEN, Point::new(5, 5));
        let mut rec = mode(&world, None);
        rec.activate().unwrap();
        rec.handle_key(Key::Char('u'));
        rec.handle_key(Key::Char('u'));

        // The active screen jumps to the second display.
        let screen_b = Rect::new(1920, 0, 1920, 1080);
        *world.accessibility.screen.lock() = screen_b;

        rec.handle_key(Key::Char('u'));
        // After remap, progress continues inside screen B.
        let last = world.accessibility.last_move().unwrap();
        assert!(screen_b.contains_point(last), "cursor at {last}");

        rec.handle_key(Key::Control(crate::keys::BACKSPACE));
        let restored = world.accessibility.last_move().unwrap();
        assert_eq!(restored, Rect::new(1920, 0, 480, 270).center());
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let world = FakeWorld::new(SCREEN, Point::new(5, 5));
        let mut rec = mode(&world, None);
        rec.activate().unwrap();
        let moves_before = world.accessibility.moves.lock().len();
        assert_eq!(rec.handle_key(Key::Char('z')), KeyOutcome::Stay);
        assert_eq!(world.accessibility.moves.lock().len(), moves_before);
    }
}
