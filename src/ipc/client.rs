//! Control-channel client used by the CLI subcommands.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use super::protocol::{Request, Response};
use crate::error::{Error, Result};

const REQUEST_DEADLINE: Duration = Duration::from_secs(10);

/// Send one request and wait for its response line.
pub fn send(path: &Path, request: &Request) -> Result<Response> {
    let mut stream = UnixStream::connect(path)?;
    stream.set_read_timeout(Some(REQUEST_DEADLINE))?;
    stream.set_write_timeout(Some(REQUEST_DEADLINE))?;

    let mut payload = serde_json::to_string(request)
        .map_err(|err| Error::Internal(format!("request serialization: {err}")))?;
    payload.push('\n');
    stream.write_all(payload.as_bytes())?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.is_empty() {
        return Err(Error::Internal("daemon closed the connection".into()));
    }
    serde_json::from_str(&line)
        .map_err(|err| Error::Internal(format!("malformed response: {err}")))
}

/// True when the error means no daemon is listening (CLI exit code 2).
pub fn is_not_running(err: &Error) -> bool {
    match err {
        Error::Io(io) => matches!(
            io.kind(),
            std::io::ErrorKind::NotFound
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::AddrNotAvailable
        ),
        _ => false,
    }
}
