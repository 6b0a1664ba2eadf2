//! Buffer serials.
//!
//! A [`Serial`] identifies one generation of device storage. Consumers that
//! cache a draw binding keep the serial they bound and compare it on the next
//! draw; a different serial means the storage was replaced and the binding is
//! stale.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one generation of buffer storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Serial(u64);

impl Serial {
    /// Get the raw serial value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues strictly increasing serials.
///
/// Each [`VertexDevice`](crate::VertexDevice) owns one counter. The first
/// serial issued is 1 and values are never reused for the counter's lifetime.
#[derive(Debug)]
pub struct SerialCounter {
    next: AtomicU64,
}

impl SerialCounter {
    /// Create a counter whose first serial is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Issue the next serial.
    pub fn next(&self) -> Serial {
        Serial(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SerialCounter {
    fn default() -> Self {
        Self::new()
    }
}
