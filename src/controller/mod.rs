//! The mode controller: owns the current mode, serializes transitions, and
//! pumps captured keystrokes into the active mode.
//!
//! One mutex guards all controller state. Key dispatch, activation, exit,
//! and control-channel transitions all acquire it, so keystrokes are
//! delivered to at most one mode at any instant and external requests
//! observe the same happens-before ordering as hotkey activations.

pub mod gate;

#[cfg(test)]
mod scenario_tests;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::actions::{Dispatcher, PendingAction};
use crate::config::ConfigHandle;
use crate::cursor::CursorState;
use crate::error::{Error, Result, ResultExt};
use crate::keys::{self, Key};
use crate::metrics::Metrics;
use crate::modes::{
    ActionMode, ActiveMode, GridMode, HintsMode, KeyOutcome, Mode, ModeContext, RecursiveMode,
    ScrollMode,
};
use crate::ports::Ports;

/// Invoked (on its own thread) after a deferred hotkey refresh falls due.
pub type HotkeyRefreshHook = Arc<dyn Fn() + Send + Sync>;

struct State {
    mode: ActiveMode,
    enabled: bool,
    /// Config changed while a mode was active; consumed once on the next
    /// return to Idle.
    hotkey_refresh_pending: bool,
    cursor: CursorState,
}

pub struct Controller {
    state: Mutex<State>,
    ports: Ports,
    config: ConfigHandle,
    metrics: Arc<Metrics>,
    hotkey_refresh: Mutex<Option<HotkeyRefreshHook>>,
}

impl Controller {
    pub fn new(ports: Ports, config: ConfigHandle, metrics: Arc<Metrics>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                mode: ActiveMode::Idle,
                enabled: true,
                hotkey_refresh_pending: false,
                cursor: CursorState::new(),
            }),
            ports,
            config,
            metrics,
            hotkey_refresh: Mutex::new(None),
        })
    }

    /// Install this controller as the event tap's key handler. The closure
    /// holds a weak reference; dropping the controller detaches it.
    pub fn install_key_handler(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.ports.event_tap.set_handler(Arc::new(move |key| {
            if let Some(controller) = weak.upgrade() {
                controller.handle_key(key);
            }
        }));
    }

    pub fn set_hotkey_refresh_hook(&self, hook: HotkeyRefreshHook) {
        *self.hotkey_refresh.lock() = Some(hook);
    }

    pub fn current_mode(&self) -> Mode {
        self.state.lock().mode.tag()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Global kill-switch. Disabling while a mode is active also exits it;
    /// a dead switch must not leave the keyboard captured.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.enabled = enabled;
        if !enabled && !matches!(state.mode, ActiveMode::Idle) {
            self.exit_locked(&mut state);
        }
        info!(enabled, "global enabled flag set");
    }

    /// Attempt to enter `mode`. Refusals are soft: they log and leave all
    /// state unchanged. Infrastructure errors abort the transition with a
    /// compensating cleanup so no capture leaks.
    pub fn activate(&self, mode: Mode, pending: Option<PendingAction>) -> Result<()> {
        if mode == Mode::Idle {
            return Err(Error::InvalidInput("cannot activate idle".into()));
        }
        let mut state = self.state.lock();
        let result = self.activate_locked(&mut state, mode, pending);
        match &result {
            Ok(()) => {}
            Err(err @ (Error::SecureInputEnabled | Error::InvalidInput(_))) => {
                self.metrics.record_refusal();
                info!(%mode, error = %err, "activation refused");
            }
            Err(err) => {
                warn!(%mode, error = %err, "activation failed");
            }
        }
        result
    }

    /// Tear down the current mode and return to Idle. Logically infallible.
    pub fn exit(&self) {
        let mut state = self.state.lock();
        self.exit_locked(&mut state);
    }

    /// Route a captured key to the current mode.
    pub fn handle_key(&self, key: Key) {
        let mut state = self.state.lock();
        self.metrics.record_key();

        let config = self.config.get();
        let exit_keys = keys::parse_key_list(&config.general.mode_exit_keys)
            .log_err()
            .unwrap_or_else(|| vec![Key::Control(keys::ESCAPE)]);

        if matches!(state.mode, ActiveMode::Idle) {
            // Nothing to route; a stray exit key in Idle is explicitly
            // ignored, everything else is noise from the tap shutdown window.
            debug!(%key, "key while idle, ignoring");
            return;
        }

        if keys::key_matches_any(key, &exit_keys) {
            self.exit_locked(&mut state);
            return;
        }

        match state.mode.handle_key(key) {
            KeyOutcome::Stay => {}
            KeyOutcome::Committed => {
                self.metrics.record_commit();
                // The committed point is the new cursor position; restoring
                // would undo the commit.
                state.cursor.set_skip_next_restore();
                self.exit_locked(&mut state);
            }
            KeyOutcome::Reactivate => {
                self.metrics.record_commit();
                let mode = state.mode.tag();
                if let Err(err) = self.activate_locked(&mut state, mode, None) {
                    warn!(%mode, error = %err, "re-activation failed, exiting");
                    self.exit_locked(&mut state);
                }
            }
        }
    }

    /// Called by the daemon after a valid config reload. Returns `true` when
    /// the hotkey refresh was deferred because a mode is active.
    pub fn defer_hotkey_refresh_if_active(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(state.mode, ActiveMode::Idle) {
            false
        } else {
            state.hotkey_refresh_pending = true;
            true
        }
    }

    #[cfg(test)]
    pub fn hotkey_refresh_pending(&self) -> bool {
        self.state.lock().hotkey_refresh_pending
    }

    fn mode_context(&self) -> ModeContext {
        ModeContext {
            accessibility: self.ports.accessibility.clone(),
            overlay: self.ports.overlay.clone(),
            dispatcher: Dispatcher::new(self.ports.accessibility.clone()),
            config: self.config.get(),
        }
    }

    fn activate_locked(
        &self,
        state: &mut State,
        mode: Mode,
        pending: Option<PendingAction>,
    ) -> Result<()> {
        let config = self.config.get();

        // Scroll bypasses the exclusion gate; only the enabled flags apply.
        if mode == Mode::Scroll {
            if !state.enabled {
                return Err(Error::InvalidInput("keywarp is disabled".into()));
            }
            if !config.scroll.enabled {
                return Err(Error::InvalidInput("scroll mode is disabled".into()));
            }
        } else {
            gate::check(mode, state.enabled, &config, &*self.ports.accessibility)?;
        }

        let current = state.mode.tag();
        if current == mode {
            // Re-entering the same mode: clear the overlay and stop mode
            // polling, but keep keyboard capture and cursor state so chained
            // activations stay continuous.
            state.mode.partial_cleanup();
            self.ports.overlay.hide().log_err();
        } else if current != Mode::Idle {
            // Switching between different non-Idle modes is a full exit
            // followed by a fresh activation.
            self.exit_locked(state);
        }

        let screen = match self.ports.accessibility.active_screen_bounds() {
            Ok(screen) => screen,
            Err(err) => {
                self.abort_activation(state);
                return Err(err);
            }
        };

        if mode == Mode::Scroll {
            // Scroll owns its cursor semantics: no capture, never restore.
            state.cursor.reset();
            state.cursor.set_skip_next_restore();
        } else if !state.cursor.is_captured() {
            match self.ports.accessibility.cursor_position() {
                Ok(pos) => state.cursor.capture(pos, screen),
                Err(err) => {
                    self.abort_activation(state);
                    return Err(err);
                }
            }
        }

        if let Err(err) = self.ports.overlay.set_bounds(screen) {
            self.abort_activation(state);
            return Err(err);
        }

        let ctx = self.mode_context();
        let built = match mode {
            Mode::Hints => HintsMode::new(ctx, pending).map(ActiveMode::Hints),
            Mode::Grid => GridMode::new(ctx, pending).map(ActiveMode::Grid),
            Mode::RecursiveGrid => {
                RecursiveMode::new(ctx, pending).map(ActiveMode::RecursiveGrid)
            }
            Mode::Scroll => Ok(ActiveMode::Scroll(ScrollMode::new(ctx))),
            Mode::Action => ActionMode::new(ctx).map(ActiveMode::Action),
            Mode::Idle => unreachable!("idle is not activatable"),
        };
        let mut new_mode = match built {
            Ok(new_mode) => new_mode,
            Err(err) => {
                self.abort_activation(state);
                return Err(err);
            }
        };

        let activated = match &mut new_mode {
            ActiveMode::Hints(m) => m.activate(),
            ActiveMode::Grid(m) => m.activate(),
            ActiveMode::RecursiveGrid(m) => m.activate(),
            ActiveMode::Scroll(m) => m.activate(),
            ActiveMode::Action(m) => m.activate(),
            ActiveMode::Idle => Ok(()),
        };
        if let Err(err) = activated {
            new_mode.exit();
            self.abort_activation(state);
            return Err(err);
        }

        state.mode = new_mode;
        if let Err(err) = self.ports.event_tap.enable() {
            state.mode.exit();
            self.abort_activation(state);
            return Err(err);
        }

        self.metrics.record_activation(mode);
        info!(%mode, "mode activated");
        Ok(())
    }

    /// Compensating cleanup for a failed activation: no capture may leak and
    /// the tap must not stay enabled.
    fn abort_activation(&self, state: &mut State) {
        state.mode.exit();
        state.mode = ActiveMode::Idle;
        self.ports.overlay.hide().log_err();
        self.ports.event_tap.disable();
        state.cursor.reset();
    }

    fn exit_locked(&self, state: &mut State) {
        if matches!(state.mode, ActiveMode::Idle) {
            return;
        }
        let mode = state.mode.tag();
        let was_scroll = mode == Mode::Scroll;

        state.mode.exit();
        state.mode = ActiveMode::Idle;
        self.ports.overlay.hide().log_err();
        self.ports.event_tap.disable();

        if state.hotkey_refresh_pending {
            state.hotkey_refresh_pending = false;
            let hook = self.hotkey_refresh.lock().clone();
            if let Some(hook) = hook {
                // Refresh re-enters hotkey registration; never run it under
                // the controller lock.
                std::thread::spawn(move || hook());
            }
        }

        let config = self.config.get();
        if config.general.restore_cursor_position && state.cursor.is_captured() && !was_scroll {
            if let Some(screen) = self.ports.accessibility.active_screen_bounds().log_err() {
                if let Some(target) = state.cursor.restore_target(screen) {
                    self.ports.accessibility.move_cursor(target).log_err();
                }
            }
        }
        state.cursor.reset();

        info!(%mode, "mode exited");
    }
}
