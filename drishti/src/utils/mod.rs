//! Utilities for the node binary.
//!
//! - Signal handling (Ctrl-C)

mod signal;

pub use signal::setup_shutdown_handler;
