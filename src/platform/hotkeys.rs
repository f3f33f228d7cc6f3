//! `global-hotkey` adapter for the hotkey port.
//!
//! The manager lives behind a mutex (registration comes from the main thread
//! at startup and from refresh threads later); pressed events arrive on the
//! crate's global receiver and are drained by one listener thread that looks
//! up the callback in the routing table.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::hotkeys::parse_hotkey;
use crate::ports::{HotkeyCallback, HotkeyPort};

struct Registered {
    hotkey: HotKey,
    callback: HotkeyCallback,
}

pub struct GlobalHotkeys {
    manager: Mutex<GlobalHotKeyManager>,
    /// Binding string -> registration; hotkey id -> binding for dispatch.
    by_binding: Mutex<HashMap<String, Registered>>,
    by_id: Mutex<HashMap<u32, String>>,
}

impl GlobalHotkeys {
    /// Create the manager and start the event listener thread.
    pub fn new() -> Result<Arc<Self>> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|err| Error::Internal(format!("hotkey manager: {err}")))?;
        let adapter = Arc::new(Self {
            manager: Mutex::new(manager),
            by_binding: Mutex::new(HashMap::new()),
            by_id: Mutex::new(HashMap::new()),
        });

        let weak: Weak<Self> = Arc::downgrade(&adapter);
        std::thread::Builder::new()
            .name("keywarp-hotkey-events".into())
            .spawn(move || {
                let receiver = GlobalHotKeyEvent::receiver();
                while let Ok(event) = receiver.recv() {
                    if event.state() != HotKeyState::Pressed {
                        continue;
                    }
                    let Some(adapter) = weak.upgrade() else {
                        return;
                    };
                    let callback = {
                        let by_id = adapter.by_id.lock();
                        by_id.get(&event.id()).and_then(|binding| {
                            adapter
                                .by_binding
                                .lock()
                                .get(binding)
                                .map(|r| r.callback.clone())
                        })
                    };
                    match callback {
                        Some(callback) => callback(),
                        None => debug!(id = event.id(), "hotkey event with no route"),
                    }
                }
            })
            .map_err(|err| Error::Internal(format!("hotkey listener: {err}")))?;

        Ok(adapter)
    }
}

impl HotkeyPort for GlobalHotkeys {
    fn register(&self, binding: &str, callback: HotkeyCallback) -> Result<()> {
        let hotkey = parse_hotkey(binding)?;
        self.manager
            .lock()
            .register(hotkey)
            .map_err(|err| Error::Internal(format!("register '{binding}': {err}")))?;
        self.by_id.lock().insert(hotkey.id(), binding.to_string());
        self.by_binding
            .lock()
            .insert(binding.to_string(), Registered { hotkey, callback });
        Ok(())
    }

    fn unregister(&self, binding: &str) -> Result<()> {
        let Some(registered) = self.by_binding.lock().remove(binding) else {
            return Ok(());
        };
        self.by_id.lock().remove(&registered.hotkey.id());
        self.manager
            .lock()
            .unregister(registered.hotkey)
            .map_err(|err| Error::Internal(format!("unregister '{binding}': {err}")))
    }

    fn unregister_all(&self) {
        let mut by_binding = self.by_binding.lock();
        let manager = self.manager.lock();
        for (binding, registered) in by_binding.drain() {
            if let Err(err) = manager.unregister(registered.hotkey) {
                warn!(binding, error = %err, "hotkey unregister failed");
            }
        }
        self.by_id.lock().clear();
    }

    fn is_registered(&self, binding: &str) -> bool {
        self.by_binding.lock().contains_key(binding)
    }
}
