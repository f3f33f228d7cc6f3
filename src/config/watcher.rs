//! File watcher emitting debounced config-change events.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Raw filesystem events settle for this long before one change is emitted.
const DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEvent {
    Changed,
}

/// Watches the config file's parent directory (editors replace the file, so
/// watching the path itself misses renames) and forwards a single debounced
/// [`ConfigEvent::Changed`] per burst of writes.
pub struct ConfigWatcher {
    // Held for its Drop; dropping stops the notify backend.
    _watcher: RecommendedWatcher,
    debouncer: Option<std::thread::JoinHandle<()>>,
    stop: Option<Sender<()>>,
}

impl ConfigWatcher {
    pub fn spawn(config_path: &Path, events: Sender<ConfigEvent>) -> Result<Self> {
        let parent = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = config_path.file_name().map(|n| n.to_os_string());

        let (raw_tx, raw_rx) = bounded::<()>(16);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let touches_config = file_name.as_ref().is_none_or(|name| {
                        event.paths.iter().any(|p| p.file_name() == Some(name))
                    });
                    if touches_config && !event.kind.is_access() {
                        let _ = raw_tx.try_send(());
                    }
                }
                Err(err) => warn!(error = %err, "config watcher error"),
            }
        })
        .map_err(|err| Error::Internal(format!("failed to create config watcher: {err}")))?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|err| {
                Error::Internal(format!("failed to watch {}: {err}", parent.display()))
            })?;

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let debouncer = std::thread::Builder::new()
            .name("keywarp-config-debounce".into())
            .spawn(move || debounce_loop(raw_rx, stop_rx, events))
            .map_err(|err| Error::Internal(format!("failed to spawn debouncer: {err}")))?;

        Ok(Self {
            _watcher: watcher,
            debouncer: Some(debouncer),
            stop: Some(stop_tx),
        })
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        // Closing the stop channel ends the debounce loop.
        self.stop.take();
        if let Some(handle) = self.debouncer.take() {
            let _ = handle.join();
        }
    }
}

fn debounce_loop(raw: Receiver<()>, stop: Receiver<()>, events: Sender<ConfigEvent>) {
    loop {
        crossbeam_channel::select! {
            recv(raw) -> msg => {
                if msg.is_err() {
                    return;
                }
                // Swallow the burst, then emit one event.
                loop {
                    match raw.recv_timeout(DEBOUNCE) {
                        Ok(()) => continue,
                        Err(crossbeam_channel::RecvTimeoutError::Timeout) => break,
                        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
                    }
                }
                debug!("config file changed");
                if events.send(ConfigEvent::Changed).is_err() {
                    return;
                }
            }
            recv(stop) -> _ => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io::Write;

    #[test]
    fn burst_of_writes_emits_one_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let (tx, rx) = unbounded();
        let _watcher = ConfigWatcher::spawn(&path, tx).unwrap();

        // Give the notify backend a moment to arm.
        std::thread::sleep(Duration::from_millis(200));
        for i in 0..5 {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "# rev {i}").unwrap();
        }

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ConfigEvent::Changed
        );
        // The burst must have been coalesced.
        assert!(rx.recv_timeout(Duration::from_millis(600)).is_err());
    }
}
