// Correlation IDs - one monotonically increasing integer per inbound request
//
// The counter is an owned instance held by the proxy state, not a process
// global. IDs are threaded explicitly into every hook so nothing downstream
// has to dig through request extensions to find them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-request correlation identifier, unique for the process lifetime.
pub type RequestId = u64;

/// Hands out correlation IDs, starting at 1.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    counter: AtomicU64,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Assign the next ID. Safe under concurrent requests: every caller gets
    /// a distinct value, increasing in assignment order.
    pub fn next_id(&self) -> RequestId {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
