//! Action keys: direct mouse actions at the current cursor position.
//!
//! Used two ways: as the standalone [`ActionMode`] (activated through the
//! control channel) and as the Tab-toggled sub-state inside hints and grid
//! mode. Both interpret the same configured `action.*` keys.

use tracing::debug;

use crate::actions::PendingAction;
use crate::config::ActionConfig;
use crate::error::{Result, ResultExt};
use crate::geometry::Rect;
use crate::keys::{self, Key};

use super::{
    KeyOutcome, ModeContext, ACTION_HIGHLIGHT_COLOR, HIGHLIGHT_WIDTH,
};

/// The parsed `action.*` key bindings.
#[derive(Debug, Clone)]
pub struct ActionKeys {
    left: Key,
    right: Key,
    middle: Key,
    down: Key,
    up: Key,
}

impl ActionKeys {
    pub fn from_config(config: &ActionConfig) -> Result<Self> {
        Ok(Self {
            left: keys::parse_key(&config.left_click_key)?,
            right: keys::parse_key(&config.right_click_key)?,
            middle: keys::parse_key(&config.middle_click_key)?,
            down: keys::parse_key(&config.mouse_down_key)?,
            up: keys::parse_key(&config.mouse_up_key)?,
        })
    }

    /// The action a key maps to, if any.
    pub fn action_for(&self, key: Key) -> Option<PendingAction> {
        if keys::key_matches(key, self.left) {
            Some(PendingAction::LeftClick)
        } else if keys::key_matches(key, self.right) {
            Some(PendingAction::RightClick)
        } else if keys::key_matches(key, self.middle) {
            Some(PendingAction::MiddleClick)
        } else if keys::key_matches(key, self.down) {
            Some(PendingAction::MouseDown)
        } else if keys::key_matches(key, self.up) {
            Some(PendingAction::MouseUp)
        } else {
            None
        }
    }
}

/// Standalone action mode: a border highlight marks the armed state and every
/// configured action key fires at the live cursor position. The mode stays
/// armed across actions (mouse-down / drag / mouse-up sequences need it).
pub struct ActionMode {
    ctx: ModeContext,
    keys: ActionKeys,
    screen: Rect,
}

impl ActionMode {
    pub fn new(ctx: ModeContext) -> Result<Self> {
        let keys = ActionKeys::from_config(&ctx.config.action)?;
        Ok(Self {
            ctx,
            keys,
            screen: Rect::default(),
        })
    }

    pub fn activate(&mut self) -> Result<()> {
        self.screen = self.ctx.accessibility.active_screen_bounds()?;
        self.ctx
            .overlay
            .draw_action_highlight(self.screen, ACTION_HIGHLIGHT_COLOR, HIGHLIGHT_WIDTH)?;
        Ok(())
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        let Some(action) = self.keys.action_for(key) else {
            debug!(%key, "action mode: unmapped key");
            return KeyOutcome::Stay;
        };
        if let Some(point) = self.ctx.accessibility.cursor_position().log_err() {
            self.ctx.dispatcher.dispatch(&action, point).log_err();
        }
        KeyOutcome::Stay
    }

    pub fn partial_cleanup(&mut self) {}

    pub fn exit(&mut self) {}
}
