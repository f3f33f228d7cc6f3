//! Unix-socket control-channel server: one accept thread, one short-lived
//! thread per connection.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::protocol::{Request, Response, MAX_REQUEST_BYTES};
use crate::error::{Error, Result, ResultExt};

/// Per-connection read/write deadline so a stalled peer cannot pin a thread.
const PEER_DEADLINE: Duration = Duration::from_secs(10);

/// Handles one decoded request. Handlers call into the mode controller and
/// must not block its lock for longer than one dispatch.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: Request) -> Response;
}

#[derive(Debug)]
pub struct IpcServer {
    path: PathBuf,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<std::thread::JoinHandle<()>>,
}

impl IpcServer {
    /// Bind and start serving. A stale socket file left by a dead daemon is
    /// unlinked and rebound; a live one yields [`Error::IpcAlreadyRunning`].
    pub fn start(path: &Path, handler: Arc<dyn RequestHandler>) -> Result<IpcServer> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = match UnixListener::bind(path) {
            Ok(listener) => listener,
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                if UnixStream::connect(path).is_ok() {
                    return Err(Error::IpcAlreadyRunning(path.display().to_string()));
                }
                info!(path = %path.display(), "removing stale control socket");
                std::fs::remove_file(path)?;
                UnixListener::bind(path)?
            }
            Err(err) => return Err(err.into()),
        };

        let shutdown = Arc::new(AtomicBool::new(false));
        let accept_shutdown = shutdown.clone();
        let accept_thread = std::thread::Builder::new()
            .name("keywarp-ipc-accept".into())
            .spawn(move || {
                for stream in listener.incoming() {
                    if accept_shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    match stream {
                        Ok(stream) => {
                            let handler = handler.clone();
                            std::thread::Builder::new()
                                .name("keywarp-ipc-conn".into())
                                .spawn(move || serve_connection(stream, handler))
                                .log_err();
                        }
                        Err(err) => {
                            warn!(error = %err, "control channel accept failed");
                        }
                    }
                }
            })
            .map_err(|err| Error::Internal(format!("failed to spawn accept thread: {err}")))?;

        info!(path = %path.display(), "control channel listening");
        Ok(IpcServer {
            path: path.to_path_buf(),
            shutdown,
            accept_thread: Some(accept_thread),
        })
    }

    /// Stop accepting, join the accept thread, and unlink the socket.
    /// Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        // Wake the blocking accept with a throwaway connection.
        let _ = UnixStream::connect(&self.path);
        if let Some(thread) = self.accept_thread.take() {
            let _ = thread.join();
        }
        let _ = std::fs::remove_file(&self.path);
        info!(path = %self.path.display(), "control channel stopped");
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve_connection(stream: UnixStream, handler: Arc<dyn RequestHandler>) {
    stream.set_read_timeout(Some(PEER_DEADLINE)).log_err();
    stream.set_write_timeout(Some(PEER_DEADLINE)).log_err();
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(clone) => clone,
        Err(err) => {
            warn!(error = %err, "control connection clone failed");
            return;
        }
    });
    let mut stream = stream;

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return,
            Ok(n) if n > MAX_REQUEST_BYTES => {
                respond(
                    &mut stream,
                    &Response::failure("INVALID_INPUT", "request too large"),
                );
                return;
            }
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "control connection read ended");
                return;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                debug!(action = %request.action, "control request");
                handler.handle(request)
            }
            Err(err) => Response::failure("INVALID_INPUT", format!("malformed request: {err}")),
        };
        if !respond(&mut stream, &response) {
            return;
        }
    }
}

fn respond(stream: &mut UnixStream, response: &Response) -> bool {
    let Some(mut payload) = serde_json::to_string(response).log_err() else {
        return false;
    };
    payload.push('\n');
    stream.write_all(payload.as_bytes()).log_err().is_some()
}
