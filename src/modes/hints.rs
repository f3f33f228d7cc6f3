//! Hints mode: label the clickable accessibility elements on screen, type a
//! label to move there, then commit or chain.

use tracing::{debug, info};

use crate::actions::PendingAction;
use crate::error::{Result, ResultExt};
use crate::geometry::Rect;
use crate::hints::{hint_filter, HintEvent, HintManager};
use crate::keys::Key;

use super::{
    ActionKeys, KeyOutcome, ModeContext, ACTION_HIGHLIGHT_COLOR, ENUMERATION_DEADLINE,
    HIGHLIGHT_WIDTH,
};

pub struct HintsMode {
    ctx: ModeContext,
    pending: Option<PendingAction>,
    manager: Option<HintManager>,
    screen: Rect,
    action_keys: ActionKeys,
    /// Tab-toggled sub-state: keys act on the cursor instead of navigating.
    action_state: bool,
}

impl HintsMode {
    pub fn new(ctx: ModeContext, pending: Option<PendingAction>) -> Result<Self> {
        let action_keys = ActionKeys::from_config(&ctx.config.action)?;
        Ok(Self {
            ctx,
            pending,
            manager: None,
            screen: Rect::default(),
            action_keys,
            action_state: false,
        })
    }

    /// Collect, dedup, and label the clickable elements on the active screen.
    pub fn activate(&mut self) -> Result<()> {
        self.screen = self.ctx.accessibility.active_screen_bounds()?;
        let elements = self
            .ctx
            .accessibility
            .clickable_elements(&hint_filter(), ENUMERATION_DEADLINE)?;
        let manager = HintManager::build(
            elements,
            &self.ctx.config.hints.hint_characters,
            self.screen,
        );
        info!(hints = manager.len(), "hints collected");
        self.ctx.overlay.show_hints(&manager.visible())?;
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

        if key.is_backspace() {
            if manager.backspace() == HintEvent::Updated {
                self.ctx.overlay.show_hints(&manager.visible()).log_err();
            }
            return KeyOutcome::Stay;
        }

        let Some(c) = key.char_lowercase() else {
            return KeyOutcome::Stay;
        };
        match manager.handle_char(c) {
            HintEvent::Committed { point } => {
                self.ctx.accessibility.move_cursor(point).log_err();
                match self.pending.take() {
                    Some(action) => {
                        self.ctx.dispatcher.dispatch(&action, point).log_err();
                        KeyOutcome::Committed
                    }
                    // No pending action: the cursor moved; re-enter hints on
                    // the same screen so clicks can be chained.
                    None => KeyOutcome::Reactivate,
                }
            }
            HintEvent::Updated => {
                self.ctx.overlay.show_hints(&manager.visible()).log_err();
                KeyOutcome::Stay
            }
            HintEvent::Ignored => {
                debug!(%key, "hints: no label starts with this");
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
            self.ctx.overlay.show_hints(&manager.visible()).log_err();
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
