//! Binary entrypoint: `keywarp run` hosts the daemon; the other subcommands
//! are control-channel clients.
//!
//! Exit codes: 0 success, 1 failure, 2 daemon not running.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use keywarp::actions::PendingAction;
use keywarp::daemon::{self, DaemonOptions};
use keywarp::ipc::{self, client, Request};

const EXIT_FAILURE: u8 = 1;
const EXIT_NOT_RUNNING: u8 = 2;

#[derive(Parser)]
#[command(name = "keywarp", version, about = "Keyboard-driven screen navigation daemon")]
struct Cli {
    /// Config file path (defaults to ~/.config/keywarp/config.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Control socket path.
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon in the foreground.
    Run,
    /// Check that the daemon is alive.
    Ping,
    /// Enable navigation (clears the kill-switch).
    Start,
    /// Disable navigation (sets the kill-switch).
    Stop,
    /// Show daemon status.
    Status,
    /// Show the resolved configuration.
    Config,
    /// Reload the configuration file.
    Reload,
    /// Show health checks.
    Health,
    /// Show daemon metrics.
    Metrics,
    /// Print the version.
    Version,
    /// Activate a navigation mode.
    Activate {
        /// Mode: hints, grid, recursive-grid, scroll, or action.
        mode: String,
        /// Pending action committed at the selected point: left-click,
        /// right-click, middle-click, mouse-down, mouse-up, move-mouse, exec.
        #[arg(long)]
        action: Option<String>,
        /// Shell command for `--action exec`.
        #[arg(long)]
        command: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = keywarp::logging::init();

    let request = match cli.command {
        Command::Run => {
            return ExitCode::from(daemon::run_and_report(DaemonOptions {
                config_path: cli.config,
                socket_path: cli.socket,
            }) as u8);
        }
        Command::Version => {
            println!("keywarp {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Command::Ping => Request::new("ping"),
        Command::Start => Request::new("start"),
        Command::Stop => Request::new("stop"),
        Command::Status => Request::new("status"),
        Command::Config => Request::new("config"),
        Command::Reload => Request::new("reload"),
        Command::Health => Request::new("health"),
        Command::Metrics => Request::new("metrics"),
        Command::Activate {
            mode,
            action,
            command,
        } => {
            if let Some(action) = &action {
                // Validate locally for a friendly error before dialing.
                if let Err(err) = PendingAction::from_wire(action, command.as_deref()) {
                    eprintln!("keywarp: {err}");
                    return ExitCode::from(EXIT_FAILURE);
                }
            }
            let mut request = Request::new("action").with_param("name", mode);
            if let Some(action) = action {
                request = request.with_param("pending", action);
            }
            if let Some(command) = command {
                request = request.with_param("command", command);
            }
            request
        }
    };

    let socket = cli.socket.unwrap_or_else(ipc::default_socket_path);
    match client::send(&socket, &request) {
        Ok(response) => {
            let rendered = if response.data.is_null() {
                response.message.clone()
            } else {
                match serde_json::to_string_pretty(&response.data) {
                    Ok(data) => format!("{}\n{data}", response.message),
                    Err(_) => response.message.clone(),
                }
            };
            println!("{rendered}");
            if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
        Err(err) if client::is_not_running(&err) => {
            eprintln!("keywarp: daemon is not running (socket {})", socket.display());
            ExitCode::from(EXIT_NOT_RUNNING)
        }
        Err(err) => {
            eprintln!("keywarp: {err}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
