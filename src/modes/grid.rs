//! Flat grid mode: labelled cells, prefix input, 3x3 subgrid refinement.

use tracing::debug;

use crate::actions::PendingAction;
use crate::error::{Result, ResultExt};
use crate::geometry::Rect;
use crate::grid::{GridEvent, GridManager};
use crate::keys::{self, Key};

use super::{
    ActionKeys, KeyOutcome, ModeContext, ACTION_HIGHLIGHT_COLOR, HIGHLIGHT_WIDTH,
};

pub struct GridMode {
    ctx: ModeContext,
    pending: Option<PendingAction>,
    manager: Option<GridManager>,
    screen: Rect,
    reset_key: Key,
    action_keys: ActionKeys,
    /// Tab-toggled sub-state: keys act on the cursor instead of navigating.
    action_state: bool,
}

impl GridMode {
    pub fn new(ctx: ModeContext, pending: Option<PendingAction>) -> Result<Self> {
        let reset_key = keys::parse_key(&ctx.config.grid.reset_key)?;
        let action_keys = ActionKeys::from_config(&ctx.config.action)?;
        Ok(Self {
            ctx,
            pending,
            manager: None,
            screen: Rect::default(),
            reset_key,
            action_keys,
            action_state: false,
        })
    }

    pub fn activate(&mut self) -> Result<()> {
        self.screen = self.ctx.accessibility.active_screen_bounds()?;
        let manager = GridManager::new(&self.ctx.config.grid, self.screen);
        self.ctx.overlay.show_grid(&manager.draw())?;
        self.manager = Some(manager);
        self.action_state = false;
        Ok(())
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        if key.is_tab() {
            self.toggle_action_state();
            return KeyOutcome::Stay;
        }
        if self.action_state {
            if let Some(action) = self.action_keys.action_for(key) {
                if let Some(point) = self.ctx.accessibility.cursor_position().log_err() {
                    self.ctx.dispatcher.dispatch(&action, point).log_err();
                }
            }
            return KeyOutcome::Stay;
        }

        let Some(manager) = self.manager.as_mut() else {
            return KeyOutcome::Stay;
        };

        let event = if key.is_backspace() {
            manager.backspace()
        } else if keys::key_matches(key, self.reset_key) {
            manager.reset()
        } else if let Some(c) = key.char_lowercase() {
            manager.handle_char(c)
        } else {
            return KeyOutcome::Stay;
        };

        match event {
            GridEvent::Committed { point } => {
                self.ctx.accessibility.move_cursor(point).log_err();
                match self.pending.take() {
                    Some(action) => {
                        self.ctx.dispatcher.dispatch(&action, point).log_err();
                        KeyOutcome::Committed
                    }
                    // No pending action: move the cursor and re-arm with a
                    // fresh grid.
                    None => KeyOutcome::Reactivate,
                }
            }
            GridEvent::Updated => {
                self.ctx.overlay.show_grid(&manager.draw()).log_err();
                KeyOutcome::Stay
            }
            GridEvent::Ignored => {
                debug!(%key, "grid: input does not extend any label");
                KeyOutcome::Stay
            }
        }
    }

    fn toggle_action_state(&mut self) {
        self.action_state = !self.action_state;
        if self.action_state {
            self.ctx
                .overlay
                .draw_action_highlight(self.screen, ACTION_HIGHLIGHT_COLOR, HIGHLIGHT_WIDTH)
                .log_err();
        } else if let Some(manager) = &self.manager {
            self.ctx.overlay.show_grid(&manager.draw()).log_err();
        }
    }

    pub fn partial_cleanup(&mut self) {
        self.manager = None;
        self.action_state = false;
    }

    pub fn exit(&mut self) {
        self.manager = None;
        self.action_state = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Dispatcher;
    use crate::config::Config;
    use crate::geometry::Point;
    use crate::ports::fake::{FakeWorld, OverlayCall};
    use crate::ports::ClickKind;
    use std::sync::Arc;

    fn abc_world() -> FakeWorld {
        FakeWorld::new(Rect::new(0, 0, 300, 300), Point::new(5, 5))
    }

    fn mode(world: &FakeWorld, pending: Option<PendingAction>) -> GridMode {
        let mut config = Config::default();
        config.grid.characters = "ABC".to_string();
        config.grid.sublayer_keys = "qweasdzxc".to_string();
        let ctx = ModeContext {
            accessibility: world.accessibility.clone(),
            overlay: world.overlay.clone(),
            dispatcher: Dispatcher::new(world.accessibility.clone()),
            config: Arc::new(config),
        };
        GridMode::new(ctx, pending).unwrap()
    }

    #[test]
    fn full_label_opens_subgrid_and_subgrid_key_commits() {
        let world = abc_world();
        let mut grid = mode(&world, Some(PendingAction::LeftClick));
        grid.activate().unwrap();

        for c in ['a', 'a', 'a'] {
            assert_eq!(grid.handle_key(Key::Char(c)), KeyOutcome::Stay);
        }
        match world.overlay.last_call() {
            Some(OverlayCall::ShowGrid(draw)) => assert!(draw.subgrid.is_some()),
            other => panic!("expected ShowGrid, got {other:?}"),
        }

        // Center subcell of the 60x60 top-left cell.
        assert_eq!(grid.handle_key(Key::Char('s')), KeyOutcome::Committed);
        assert_eq!(world.accessibility.last_move(), Some(Point::new(30, 30)));
        assert_eq!(
            *world.accessibility.actions.lock(),
            vec![(ClickKind::Left, Point::new(30, 30))]
        );
    }

    #[test]
    fn commit_without_pending_action_reactivates() {
        let world = abc_world();
        let mut grid = mode(&world, None);
        grid.activate().unwrap();
        for c in ['a', 'a', 'a'] {
            grid.handle_key(Key::Char(c));
        }
        assert_eq!(grid.handle_key(Key::Char('s')), KeyOutcome::Reactivate);
        assert!(world.accessibility.actions.lock().is_empty());
    }

    #[test]
    fn invalid_prefix_key_changes_nothing() {
        let world = abc_world();
        let mut grid = mode(&world, None);
        grid.activate().unwrap();
        let draws_before = world.overlay.calls.lock().len();
        assert_eq!(grid.handle_key(Key::Char('z')), KeyOutcome::Stay);
        assert_eq!(world.overlay.calls.lock().len(), draws_before);
    }

    #[test]
    fn reset_key_clears_the_prefix() {
        let world = abc_world();
        let mut grid = mode(&world, None);
        grid.activate().unwrap();
        grid.handle_key(Key::Char('a'));
        grid.handle_key(Key::Char('b'));
        // Default reset key is Ctrl+R (0x12).
        assert_eq!(grid.handle_key(Key::Control(0x12)), KeyOutcome::Stay);
        match world.overlay.last_call() {
            Some(OverlayCall::ShowGrid(draw)) => {
                assert!(draw.cells.iter().all(|c| c.matched == 0));
            }
            other => panic!("expected ShowGrid, got {other:?}"),
        }
    }

    #[test]
    fn backspace_leaves_subgrid_then_shortens() {
        let world = abc_world();
        let mut grid = mode(&world, None);
        grid.activate().unwrap();
        for c in ['a', 'a', 'b'] {
            grid.handle_key(Key::Char(c));
        }
        assert_eq!(grid.handle_key(Key::Control(crate::keys::BACKSPACE)), KeyOutcome::Stay);
        match world.overlay.last_call() {
            Some(OverlayCall::ShowGrid(draw)) => {
                assert!(draw.subgrid.is_none());
                // The prior prefix is fully restored.
                let matched: Vec<_> = draw.cells.iter().filter(|c| c.matched == 3).collect();
                assert_eq!(matched.len(), 1);
                assert_eq!(matched[0].label, "AAB");
            }
            other => panic!("expected ShowGrid, got {other:?}"),
        }
    }

    #[test]
    fn tab_toggles_action_sub_state() {
        let world = abc_world();
        let mut grid = mode(&world, None);
        grid.activate().unwrap();
        grid.handle_key(Key::Control(crate::keys::TAB));
        assert!(matches!(
            world.overlay.last_call(),
            Some(OverlayCall::DrawActionHighlight(_))
        ));
        grid.handle_key(Key::Char('l'));
        assert_eq!(
            *world.accessibility.actions.lock(),
            vec![(ClickKind::Left, Point::new(5, 5))]
        );
    }
}
