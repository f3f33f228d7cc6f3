//! keywarp - keyboard-driven screen navigation daemon.
//!
//! A global hotkey takes over keyboard input, an overlay is painted on the
//! active display, and subsequent keystrokes navigate in one of four modes
//! (hints, flat grid, recursive grid, scroll) until the user commits or
//! cancels. The OS-level collaborators (accessibility tree, overlay window,
//! event tap, hotkey source) sit behind the ports in [`ports`]; the state
//! machine in [`controller`] is the core of the daemon.

pub mod actions;
pub mod config;
pub mod controller;
pub mod cursor;
pub mod daemon;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod hints;
pub mod hotkeys;
pub mod ipc;
pub mod keys;
pub mod logging;
pub mod metrics;
pub mod modes;
pub mod platform;
pub mod ports;
pub mod rgrid;

pub use error::{Error, Result};
