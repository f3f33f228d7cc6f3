//! Daemon wiring: ports, controller, hotkeys, control channel, config
//! watcher, and shutdown ordering.

use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{error, info, warn};

use crate::config::{ConfigHandle, ConfigLoader, ConfigWatcher};
use crate::controller::{Controller, HotkeyRefreshHook};
use crate::error::{Result, ResultExt};
use crate::hotkeys::HotkeyRoutes;
use crate::ipc::{default_socket_path, ControlHandler, IpcServer};
use crate::metrics::Metrics;
use crate::platform;

#[derive(Debug, Default)]
pub struct DaemonOptions {
    /// Explicit config file path (otherwise `KEYWARP_CONFIG` or the default).
    pub config_path: Option<String>,
    /// Explicit control socket path.
    pub socket_path: Option<PathBuf>,
}

/// Run the daemon in the foreground until SIGINT/SIGTERM.
pub fn run(options: DaemonOptions) -> Result<()> {
    let loader = ConfigLoader::resolve(options.config_path.as_deref());
    info!(config = %loader.path().display(), "loading configuration");
    let config = ConfigHandle::new(loader.load()?);

    let ports = platform::build_ports(config.clone())?;
    let metrics = Arc::new(Metrics::default());
    let controller = Controller::new(ports.clone(), config.clone(), metrics.clone());
    controller.install_key_handler();

    let routes = Arc::new(HotkeyRoutes::new(ports.hotkeys.clone()));
    let refresh: HotkeyRefreshHook = {
        let routes = routes.clone();
        let config = config.clone();
        let controller = controller.clone();
        Arc::new(move || routes.refresh(&config.get(), &controller))
    };
    controller.set_hotkey_refresh_hook(refresh.clone());
    refresh();

    let socket_path = options.socket_path.unwrap_or_else(default_socket_path);
    let handler = ControlHandler::new(
        controller.clone(),
        config.clone(),
        loader.clone(),
        metrics,
        ports.accessibility.clone(),
        refresh.clone(),
    );
    let mut server = IpcServer::start(&socket_path, Arc::new(handler))?;

    // Config watcher; a broken watcher degrades to manual `reload` only.
    let (config_tx, config_rx) = unbounded();
    let _watcher = ConfigWatcher::spawn(loader.path(), config_tx).warn_on_err();

    let (signal_tx, signal_rx) = bounded::<i32>(1);
    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|err| crate::error::Error::Internal(format!("signal handler: {err}")))?;
    let signal_handle = signals.handle();
    std::thread::Builder::new()
        .name("keywarp-signals".into())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                let _ = signal_tx.send(signal);
            }
        })
        .map_err(|err| crate::error::Error::Internal(format!("signal thread: {err}")))?;

    // The control loop runs off-main; the main thread pumps the platform
    // event loop (Carbon hotkey events, main-queue overlay work).
    let loop_controller = controller.clone();
    let loop_config = config.clone();
    std::thread::Builder::new()
        .name("keywarp-control-loop".into())
        .spawn(move || {
            info!("keywarp daemon running");
            loop {
                crossbeam_channel::select! {
                    recv(config_rx) -> event => {
                        if event.is_err() {
                            continue;
                        }
                        match loader.load() {
                            Ok(new_config) => {
                                loop_config.swap(new_config);
                                if loop_controller.defer_hotkey_refresh_if_active() {
                                    info!("config reloaded; hotkey refresh deferred until idle");
                                } else {
                                    refresh();
                                    info!("config reloaded");
                                }
                            }
                            Err(err) => {
                                warn!(error = %err, "config reload failed; keeping previous");
                            }
                        }
                    }
                    recv(signal_rx) -> signal => {
                        if let Ok(signal) = signal {
                            info!(signal, "shutting down");
                        }
                        break;
                    }
                }
            }
            loop_controller.exit();
            platform::stop_main_loop();
        })
        .map_err(|err| crate::error::Error::Internal(format!("control loop thread: {err}")))?;

    platform::run_main_loop();

    signal_handle.close();
    server.shutdown();
    info!("keywarp daemon stopped");
    Ok(())
}

/// Startup error printed for operators, not logged and lost.
pub fn run_and_report(options: DaemonOptions) -> i32 {
    match run(options) {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "daemon failed");
            eprintln!("keywarp: {err}");
            1
        }
    }
}
