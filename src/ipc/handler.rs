//! Control-channel request handlers: thin adapters onto the mode controller.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::json;

use super::protocol::{Request, Response};
use super::server::RequestHandler;
use crate::actions::PendingAction;
use crate::config::{ConfigHandle, ConfigLoader};
use crate::controller::{Controller, HotkeyRefreshHook};
use crate::metrics::Metrics;
use crate::modes::Mode;
use crate::ports::AccessibilityPort;

pub struct ControlHandler {
    controller: Arc<Controller>,
    config: ConfigHandle,
    loader: ConfigLoader,
    metrics: Arc<Metrics>,
    accessibility: Arc<dyn AccessibilityPort>,
    /// Re-registers hotkeys from the current config; invoked directly when
    /// Idle, deferred through the controller otherwise.
    hotkey_refresh: HotkeyRefreshHook,
}

impl ControlHandler {
    pub fn new(
        controller: Arc<Controller>,
        config: ConfigHandle,
        loader: ConfigLoader,
        metrics: Arc<Metrics>,
        accessibility: Arc<dyn AccessibilityPort>,
        hotkey_refresh: HotkeyRefreshHook,
    ) -> Self {
        Self {
            controller,
            config,
            loader,
            metrics,
            accessibility,
            hotkey_refresh,
        }
    }

    fn handle_status(&self) -> Response {
        Response::ok_with(
            "status",
            json!({
                "enabled": self.controller.is_enabled(),
                "mode": self.controller.current_mode().to_string(),
                "version": env!("CARGO_PKG_VERSION"),
            }),
        )
    }

    fn handle_config(&self) -> Response {
        let config = self.config.get();
        match serde_json::to_value(&*config) {
            Ok(value) => Response::ok_with(
                "current configuration",
                json!({
                    "path": self.loader.path().display().to_string(),
                    "config": value,
                }),
            ),
            Err(err) => Response::failure("INTERNAL", err.to_string()),
        }
    }

    fn handle_reload(&self) -> Response {
        match self.loader.load() {
            Ok(config) => {
                self.config.swap(config);
                if self.controller.defer_hotkey_refresh_if_active() {
                    Response::ok("config reloaded; hotkey refresh deferred until idle")
                } else {
                    (self.hotkey_refresh)();
                    Response::ok("config reloaded")
                }
            }
            // The previous valid config stays in effect.
            Err(err) => Response::from(&err),
        }
    }

    fn handle_health(&self) -> Response {
        let permissions = self.accessibility.check_permissions().is_ok();
        let secure_input = self.accessibility.is_secure_input_enabled();
        Response::ok_with(
            if permissions { "healthy" } else { "degraded" },
            json!({
                "permissions": permissions,
                "secure_input": secure_input,
                "enabled": self.controller.is_enabled(),
            }),
        )
    }

    fn handle_action(&self, request: &Request) -> Response {
        let Some(name) = request.str_param("name") else {
            return Response::failure("INVALID_INPUT", "action requires params.name");
        };
        let Ok(mode) = Mode::from_str(name) else {
            return Response::failure("INVALID_INPUT", format!("unknown mode '{name}'"));
        };
        let pending = match request.str_param("pending") {
            Some(pending) => {
                match PendingAction::from_wire(pending, request.str_param("command")) {
                    Ok(action) => Some(action),
                    Err(err) => return Response::from(&err),
                }
            }
            None => None,
        };
        match self.controller.activate(mode, pending) {
            Ok(()) => Response::ok(format!("{mode} activated")),
            Err(err) => Response::from(&err),
        }
    }
}

impl RequestHandler for ControlHandler {
    fn handle(&self, request: Request) -> Response {
        self.metrics.record_control_request();
        match request.action.as_str() {
            "ping" => Response::ok("pong"),
            "start" => {
                self.controller.set_enabled(true);
                Response::ok("enabled")
            }
            "stop" => {
                self.controller.set_enabled(false);
                Response::ok("disabled")
            }
            "status" => self.handle_status(),
            "config" => self.handle_config(),
            "reload" => self.handle_reload(),
            "health" => self.handle_health(),
            "metrics" => Response::ok_with("metrics", self.metrics.snapshot()),
            "action" => self.handle_action(&request),
            other => {
                tracing::debug!(action = other, "unknown control action");
                Response::failure("INVALID_ACTION", format!("unknown action '{other}'"))
            }
        }
    }
}
