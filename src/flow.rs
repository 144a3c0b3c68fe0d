//! Flow control between the socket and its owning controller.
//!
//! The socket never blocks. It signals the controller instead:
//!
//! - `pause()`: defer further application requests
//! - `resume()`: requests may proceed
//!
//! [`FlowGate`] is the stock controller. It publishes the paused flag on a
//! `tokio::sync::watch` channel so request producers can await resume
//! without polling.
//!
//! # Example
//!
//! ```
//! use tws_wire::flow::{Controller, FlowGate};
//!
//! let mut gate = FlowGate::new();
//! gate.pause();
//! assert!(gate.is_paused());
//! gate.resume();
//! assert!(!gate.is_paused());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{Result, WireError};

/// Pause/resume signalling consumed by the socket.
pub trait Controller {
    /// Ask the controller to stop issuing requests.
    fn pause(&mut self);
    /// Allow the controller to issue requests again.
    fn resume(&mut self);
}

/// Watch-channel backed controller.
///
/// Cheaply cloneable; all clones observe the same flag.
#[derive(Debug, Clone)]
pub struct FlowGate {
    paused: Arc<watch::Sender<bool>>,
    pauses: Arc<AtomicUsize>,
    resumes: Arc<AtomicUsize>,
}

impl FlowGate {
    /// Create a gate in the resumed state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            paused: Arc::new(tx),
            pauses: Arc::new(AtomicUsize::new(0)),
            resumes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Check if the gate is currently paused.
    #[inline]
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Number of pause requests seen.
    #[inline]
    pub fn pause_count(&self) -> usize {
        self.pauses.load(Ordering::Acquire)
    }

    /// Number of resume requests seen.
    #[inline]
    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::Acquire)
    }

    /// Subscribe to paused-flag changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.paused.subscribe()
    }

    /// Wait until the gate is resumed.
    ///
    /// Returns immediately if it is not paused.
    pub async fn wait_resumed(&self) {
        let mut rx = self.paused.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|paused| !*paused).await;
    }

    /// Wait until the gate is resumed, giving up after `timeout`.
    pub async fn wait_resumed_timeout(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.wait_resumed())
            .await
            .map_err(|_| WireError::ResumeTimeout)
    }
}

impl Default for FlowGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for FlowGate {
    fn pause(&mut self) {
        self.pauses.fetch_add(1, Ordering::AcqRel);
        self.paused.send_replace(true);
        tracing::trace!("controller paused");
    }

    fn resume(&mut self) {
        self.resumes.fetch_add(1, Ordering::AcqRel);
        self.paused.send_replace(false);
        tracing::trace!("controller resumed");
    }
}
