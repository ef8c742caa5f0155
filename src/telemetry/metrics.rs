//! Relay statistics.
//!
//! Thread-safe counters shared between the outbound and inbound halves of a
//! relay session.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by 1.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds a value to the counter.
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Gets the current value of the counter.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters for the UDP relay, TCP redirect and ICMP echo paths.
#[derive(Debug, Default)]
pub struct RelayStats {
    /// Captured datagrams encoded into relay frames.
    pub frames_encoded: Counter,
    /// Relay frames decoded from the SOCKS5 channel.
    pub frames_decoded: Counter,
    /// Relay frames rejected as malformed.
    pub framing_errors: Counter,
    /// Relay frames with FRAG != 0 discarded by policy.
    pub fragmented_dropped: Counter,
    /// Reply packets larger than the MTU.
    pub oversize_dropped: Counter,
    /// Echo requests answered locally.
    pub echo_replies: Counter,
    /// TCP sessions redirected to the forward server.
    pub tcp_sessions_opened: Counter,
    /// Forward server segments with no matching session.
    pub tcp_no_session: Counter,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports all counters as key-value pairs.
    pub fn export(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("frames_encoded", self.frames_encoded.get()),
            ("frames_decoded", self.frames_decoded.get()),
            ("framing_errors", self.framing_errors.get()),
            ("fragmented_dropped", self.fragmented_dropped.get()),
            ("oversize_dropped", self.oversize_dropped.get()),
            ("echo_replies", self.echo_replies.get()),
            ("tcp_sessions_opened", self.tcp_sessions_opened.get()),
            ("tcp_no_session", self.tcp_no_session.get()),
        ]
    }
}
