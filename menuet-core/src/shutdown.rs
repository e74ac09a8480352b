//! Server lifecycle and in-flight request accounting.
//!
//! ```
//! use menuet_core::shutdown::RequestTracker;
//!
//! let tracker = RequestTracker::new();
//! let guard = tracker.begin().unwrap();
//! assert_eq!(tracker.in_flight(), 1);
//! drop(guard);
//! assert_eq!(tracker.in_flight(), 0);
//! ```

use crate::logging::{info, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

/// Lifecycle of the HTTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    Pending = 0,
    Ready = 1,
    Draining = 2,
    Stopped = 3,
    Error = 4,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ServerState::Pending,
            1 => ServerState::Ready,
            2 => ServerState::Draining,
            3 => ServerState::Stopped,
            _ => ServerState::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Pending => "pending",
            ServerState::Ready => "ready",
            ServerState::Draining => "draining",
            ServerState::Stopped => "stopped",
            ServerState::Error => "error",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared lifecycle state cell.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: Arc<AtomicU8>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(ServerState::Pending as u8)),
        }
    }

    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ServerState) {
        let previous = ServerState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            info!(from = %previous, to = %state, "Server state changed");
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts requests currently being served.
#[derive(Debug, Clone)]
pub struct RequestTracker {
    active: Arc<AtomicU64>,
    accepting: Arc<AtomicBool>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicU64::new(0)),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Count a new request. Returns None once draining has started.
    pub fn begin(&self) -> Option<RequestGuard> {
        if !self.accepting.load(Ordering::Acquire) {
            return None;
        }

        self.active.fetch_add(1, Ordering::SeqCst);
        Some(RequestGuard {
            tracker: self.clone(),
            released: AtomicBool::new(false),
        })
    }

    pub fn in_flight(&self) -> u64 {
        self.active.load(Ordering::Acquire)
    }

    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Wait for in-flight requests to finish.
    ///
    /// Returns true if drained within `timeout`, false otherwise.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let start = tokio::time::Instant::now();

        while self.in_flight() > 0 {
            if start.elapsed() >= timeout {
                warn!(in_flight = self.in_flight(), "Drain timeout reached");
                return false;
            }

            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        info!("All requests drained");
        true
    }

    fn decrement(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight count exactly once, on [`release`] or drop,
/// whichever comes first.
///
/// [`release`]: RequestGuard::release
#[derive(Debug)]
pub struct RequestGuard {
    tracker: RequestTracker,
    released: AtomicBool,
}

impl RequestGuard {
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.tracker.decrement();
        }
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_once() {
        let tracker = RequestTracker::new();
        let guard = tracker.begin().unwrap();
        let _other = tracker.begin().unwrap();
        assert_eq!(tracker.in_flight(), 2);

        guard.release();
        guard.release();
        assert_eq!(tracker.in_flight(), 1);
        drop(guard);
        assert_eq!(tracker.in_flight(), 1);
    }

    #[test]
    fn test_stop_accepting() {
        let tracker = RequestTracker::new();
        tracker.stop_accepting();
        assert!(!tracker.is_accepting());
        assert!(tracker.begin().is_none());
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drain_waits_for_requests() {
        let tracker = RequestTracker::new();
        let guard = tracker.begin().unwrap();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard);
        });

        assert!(tracker.drain(Duration::from_secs(2)).await);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_times_out() {
        let tracker = RequestTracker::new();
        let _guard = tracker.begin().unwrap();
        assert!(!tracker.drain(Duration::from_millis(60)).await);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), ServerState::Pending);
        lifecycle.set(ServerState::Ready);
        lifecycle.set(ServerState::Draining);
        assert_eq!(lifecycle.clone().state(), ServerState::Draining);
        assert_eq!(ServerState::Stopped.to_string(), "stopped");
    }
}
