use thiserror::Error;
use tracing::{error, warn};

/// Domain-specific errors for keywarp.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("accessibility permissions not granted")]
    PermissionDenied,

    #[error("secure input is enabled; keyboard capture is blocked")]
    SecureInputEnabled,

    #[error("{operation} exceeded its {}ms deadline", .deadline.as_millis())]
    Timeout {
        operation: &'static str,
        deadline: std::time::Duration,
    },

    #[error("overlay operation failed: {0}")]
    OverlayFailed(String),

    #[error("accessibility operation failed: {0}")]
    AccessibilityFailed(String),

    #[error("control channel is already running at {0}")]
    IpcAlreadyRunning(String),

    #[error("configuration invalid: {0}")]
    ConfigValidation(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn timeout(operation: &'static str, deadline: std::time::Duration) -> Self {
        Self::Timeout {
            operation,
            deadline,
        }
    }

    /// Stable machine-readable code used in control-channel responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::SecureInputEnabled => "SECURE_INPUT",
            Self::Timeout { .. } => "TIMEOUT",
            Self::OverlayFailed(_) => "OVERLAY_FAILED",
            Self::AccessibilityFailed(_) => "ACCESSIBILITY_FAILED",
            Self::IpcAlreadyRunning(_) => "IPC_ALREADY_RUNNING",
            Self::ConfigValidation(_) => "CONFIG_VALIDATION",
            Self::Internal(_) => "INTERNAL",
            Self::Io(_) => "IO",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// Includes file/line information using `#[track_caller]` for better debugging.
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?err,
                    file = caller.file(),
                    line = caller.line(),
                    "operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?err,
                    file = caller.file(),
                    line = caller.line(),
                    "operation failed (recoverable)"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::SecureInputEnabled.code(), "SECURE_INPUT");
        assert_eq!(
            Error::timeout("exclusion check", std::time::Duration::from_secs(2)).code(),
            "TIMEOUT"
        );
        assert_eq!(
            Error::ConfigValidation("grid_cols must be >= 2".into()).code(),
            "CONFIG_VALIDATION"
        );
    }

    #[test]
    fn log_err_passes_through_ok() {
        let ok: std::result::Result<i32, String> = Ok(7);
        assert_eq!(ok.log_err(), Some(7));
        let err: std::result::Result<i32, String> = Err("nope".into());
        assert_eq!(err.log_err(), None);
    }
}
