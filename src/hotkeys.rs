//! Global hotkey bindings: config strings to registrations on the hotkey
//! port, with a routing table from binding to mode activation.
//!
//! Registration is refreshed as a unit (unregister everything, re-register
//! from the current config) so a reload can never leave a half-updated
//! table. While a mode is active the refresh is deferred through the
//! controller's `hotkey_refresh_pending` flag.

use std::sync::Arc;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::Controller;
use crate::error::{Error, Result};
use crate::modes::Mode;
use crate::ports::HotkeyPort;

/// Parse a binding like `"cmd+shift+h"` into a [`HotKey`].
///
/// Accepts plus- or space-separated parts; modifier aliases follow common
/// usage (`cmd`/`command`/`meta`/`super`, `ctrl`/`control`, `alt`/`opt`/
/// `option`, `shift`). Exactly one non-modifier key is required.
pub fn parse_hotkey(spec: &str) -> Result<HotKey> {
    let normalized = spec.replace('+', " ");
    let parts: Vec<&str> = normalized.split_whitespace().collect();
    if parts.is_empty() {
        return Err(Error::ConfigValidation("empty hotkey".into()));
    }

    let mut modifiers = Modifiers::empty();
    let mut key_part: Option<&str> = None;
    for part in &parts {
        match part.to_ascii_lowercase().as_str() {
            "cmd" | "command" | "meta" | "super" => modifiers |= Modifiers::META,
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "alt" | "opt" | "option" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            _ => {
                if key_part.is_some() {
                    return Err(Error::ConfigValidation(format!(
                        "hotkey '{spec}' has more than one key"
                    )));
                }
                key_part = Some(part);
            }
        }
    }

    let key = key_part
        .ok_or_else(|| Error::ConfigValidation(format!("hotkey '{spec}' has no key")))?;
    let code = key_code(key)
        .ok_or_else(|| Error::ConfigValidation(format!("unknown key '{key}' in hotkey '{spec}'")))?;

    let modifiers = if modifiers.is_empty() {
        None
    } else {
        Some(modifiers)
    };
    Ok(HotKey::new(modifiers, code))
}

fn key_code(key: &str) -> Option<Code> {
    let lower = key.to_ascii_lowercase();
    let code = match lower.as_str() {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "space" => Code::Space,
        "enter" | "return" => Code::Enter,
        "tab" => Code::Tab,
        "escape" | "esc" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" | "del" => Code::Delete,
        ";" | "semicolon" => Code::Semicolon,
        "'" | "quote" => Code::Quote,
        "," | "comma" => Code::Comma,
        "." | "period" => Code::Period,
        "/" | "slash" => Code::Slash,
        "\\" | "backslash" => Code::Backslash,
        "[" | "bracketleft" => Code::BracketLeft,
        "]" | "bracketright" => Code::BracketRight,
        "-" | "minus" => Code::Minus,
        "=" | "equal" => Code::Equal,
        "`" | "backquote" | "grave" => Code::Backquote,
        "up" | "arrowup" => Code::ArrowUp,
        "down" | "arrowdown" => Code::ArrowDown,
        "left" | "arrowleft" => Code::ArrowLeft,
        "right" | "arrowright" => Code::ArrowRight,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        _ => return None,
    };
    Some(code)
}

/// The live routing table: binding string to registered mode activation.
pub struct HotkeyRoutes {
    port: Arc<dyn HotkeyPort>,
    registered: Mutex<Vec<(String, Mode)>>,
}

impl HotkeyRoutes {
    pub fn new(port: Arc<dyn HotkeyPort>) -> Self {
        Self {
            port,
            registered: Mutex::new(Vec::new()),
        }
    }

    /// Drop every registration and re-register from `config`. A binding that
    /// fails to register is logged and skipped; the rest still land.
    pub fn refresh(&self, config: &Config, controller: &Arc<Controller>) {
        let mut registered = self.registered.lock();
        self.port.unregister_all();
        registered.clear();

        for (mode, binding) in config.hotkeys.bindings() {
            if let Err(err) = parse_hotkey(binding) {
                warn!(%mode, binding, error = %err, "skipping invalid hotkey");
                continue;
            }
            let controller = controller.clone();
            let callback = Arc::new(move || {
                // Refusals are already logged by the controller.
                let _ = controller.activate(mode, None);
            });
            match self.port.register(binding, callback) {
                Ok(()) => registered.push((binding.to_string(), mode)),
                Err(err) => warn!(%mode, binding, error = %err, "hotkey registration failed"),
            }
        }
        info!(count = registered.len(), "hotkeys registered");
    }

    pub fn bindings(&self) -> Vec<(String, Mode)> {
        self.registered.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigHandle;
    use crate::geometry::{Point, Rect};
    use crate::metrics::Metrics;
    use crate::ports::fake::FakeWorld;

    #[test]
    fn parses_common_bindings() {
        let hotkey = parse_hotkey("cmd+shift+h").unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::META | Modifiers::SHIFT), Code::KeyH)
        );
        let hotkey = parse_hotkey("ctrl+alt+space").unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::ALT), Code::Space)
        );
        // Space-separated works too.
        assert_eq!(parse_hotkey("opt g").unwrap().id(), parse_hotkey("alt+g").unwrap().id());
    }

    #[test]
    fn rejects_bad_bindings() {
        assert!(parse_hotkey("").is_err());
        assert!(parse_hotkey("cmd+shift").is_err());
        assert!(parse_hotkey("cmd+h+j").is_err());
        assert!(parse_hotkey("cmd+ö").is_err());
    }

    #[test]
    fn refresh_registers_enabled_bindings_and_routes_to_activation() {
        let world = FakeWorld::new(Rect::new(0, 0, 1920, 1080), Point::new(0, 0));
        let config = ConfigHandle::default();
        let controller = Controller::new(
            world.ports(),
            config.clone(),
            std::sync::Arc::new(Metrics::default()),
        );
        let routes = HotkeyRoutes::new(world.hotkeys.clone());
        routes.refresh(&config.get(), &controller);
        assert_eq!(world.hotkeys.registered_bindings().len(), 4);

        world.hotkeys.trigger("cmd+shift+g");
        assert_eq!(controller.current_mode(), Mode::Grid);
    }

    #[test]
    fn refresh_replaces_the_previous_table() {
        let world = FakeWorld::new(Rect::new(0, 0, 1920, 1080), Point::new(0, 0));
        let config = ConfigHandle::default();
        let controller = Controller::new(
            world.ports(),
            config.clone(),
            std::sync::Arc::new(Metrics::default()),
        );
        let routes = HotkeyRoutes::new(world.hotkeys.clone());
        routes.refresh(&config.get(), &controller);

        let mut changed = (*config.get()).clone();
        changed.hotkeys.hints = "cmd+shift+y".to_string();
        changed.hotkeys.scroll = String::new();
        routes.refresh(&changed, &controller);

        let bindings = world.hotkeys.registered_bindings();
        assert!(bindings.contains(&"cmd+shift+y".to_string()));
        assert!(!bindings.contains(&"cmd+shift+h".to_string()));
        assert!(!bindings.contains(&"cmd+shift+s".to_string()));
        assert_eq!(routes.bindings().len(), 3);
    }
}
