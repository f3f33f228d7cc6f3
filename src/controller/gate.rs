//! Exclusion gate: the pre-activation predicate bundle.
//!
//! Checked in order: secure input, global kill-switch, per-mode enabled flag,
//! foreground-app exclusion list. The app check is bounded by a 2 s deadline
//! and fails open (configurable to fail closed). Refusals mutate nothing.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::modes::Mode;
use crate::ports::AccessibilityPort;

/// Deadline for the foreground-app lookup.
pub const EXCLUSION_CHECK_DEADLINE: Duration = Duration::from_secs(2);

/// Run the gate for a `mode` activation. An `Err` is a refusal; the caller
/// logs it and leaves all state unchanged.
pub fn check(
    mode: Mode,
    enabled: bool,
    config: &Config,
    accessibility: &dyn AccessibilityPort,
) -> Result<()> {
    if accessibility.is_secure_input_enabled() {
        accessibility.post_notification(
            "keywarp",
            "Keyboard capture is blocked while secure input is enabled.",
        );
        return Err(Error::SecureInputEnabled);
    }

    if !enabled {
        return Err(Error::InvalidInput("keywarp is disabled".into()));
    }

    if !config.mode_enabled(mode) {
        return Err(Error::InvalidInput(format!("{mode} mode is disabled")));
    }

    match accessibility.focused_app_bundle_id(EXCLUSION_CHECK_DEADLINE) {
        Ok(bundle_id) => {
            if accessibility.is_app_excluded(&bundle_id) {
                return Err(Error::InvalidInput(format!(
                    "app '{bundle_id}' is excluded"
                )));
            }
        }
        Err(err) => {
            if config.general.exclusion_fail_closed {
                warn!(error = %err, "exclusion check failed; refusing (fail-closed)");
                return Err(err);
            }
            // The source of record fails open here: a wedged app must not
            // lock the user out of navigation.
            warn!(error = %err, "exclusion check failed; allowing activation");
        }
    }

    info!(%mode, "exclusion gate passed");
    Ok(())
}
