//! Signal handling for graceful shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;

use crate::error::Result;
use crate::io::dispatcher::NodeEvent;

/// Install a Ctrl-C handler that clears the returned flag and wakes the
/// dispatcher with a shutdown event.
///
/// # Example
/// ```ignore
/// let running = setup_shutdown_handler(events.clone())?;
/// while running.load(Ordering::SeqCst) {
///     // ... do work ...
/// }
/// ```
pub fn setup_shutdown_handler(events: Sender<NodeEvent>) -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
        let _ = events.send(NodeEvent::Shutdown);
    })
    .map_err(std::io::Error::other)?;
    Ok(running)
}
