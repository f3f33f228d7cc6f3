//! Process-wide monotonic counters surfaced by the control channel.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;

use crate::modes::Mode;

#[derive(Default)]
pub struct Metrics {
    hints_activations: AtomicU64,
    grid_activations: AtomicU64,
    recursive_grid_activations: AtomicU64,
    scroll_activations: AtomicU64,
    action_activations: AtomicU64,
    refused_activations: AtomicU64,
    keys_dispatched: AtomicU64,
    commits: AtomicU64,
    control_requests: AtomicU64,
}

impl Metrics {
    pub fn record_activation(&self, mode: Mode) {
        let counter = match mode {
            Mode::Idle => return,
            Mode::Hints => &self.hints_activations,
            Mode::Grid => &self.grid_activations,
            Mode::RecursiveGrid => &self.recursive_grid_activations,
            Mode::Scroll => &self.scroll_activations,
            Mode::Action => &self.action_activations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refusal(&self) {
        self.refused_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key(&self) {
        self.keys_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_control_request(&self) {
        self.control_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> serde_json::Value {
        json!({
            "activations": {
                "hints": self.hints_activations.load(Ordering::Relaxed),
                "grid": self.grid_activations.load(Ordering::Relaxed),
                "recursive_grid": self.recursive_grid_activations.load(Ordering::Relaxed),
                "scroll": self.scroll_activations.load(Ordering::Relaxed),
                "action": self.action_activations.load(Ordering::Relaxed),
            },
            "refused_activations": self.refused_activations.load(Ordering::Relaxed),
            "keys_dispatched": self.keys_dispatched.load(Ordering::Relaxed),
            "commits": self.commits.load(Ordering::Relaxed),
            "control_requests": self.control_requests.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = Metrics::default();
        metrics.record_activation(Mode::Hints);
        metrics.record_activation(Mode::Hints);
        metrics.record_activation(Mode::Scroll);
        metrics.record_activation(Mode::Idle); // no-op
        metrics.record_refusal();
        metrics.record_key();
        metrics.record_commit();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot["activations"]["hints"], 2);
        assert_eq!(snapshot["activations"]["scroll"], 1);
        assert_eq!(snapshot["activations"]["grid"], 0);
        assert_eq!(snapshot["refused_activations"], 1);
        assert_eq!(snapshot["keys_dispatched"], 1);
        assert_eq!(snapshot["commits"], 1);
    }
}
