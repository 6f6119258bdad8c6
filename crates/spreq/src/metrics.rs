// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Counters for the REQ state machine.
//!
//! Replies discarded by `recv` are invisible to the caller (they all look like
//! "no reply yet"); these counters are where they show up.

use std::sync::atomic::{AtomicU64, Ordering};

/// REQ socket metrics collector
///
/// Thread-safe atomic counters (Relaxed ordering). Shared with the owner of
/// the socket through an `Arc`, so a driver thread can update them while
/// another thread reads.
///
/// # Example
///
/// ```
/// use spreq::ReqMetrics;
///
/// let metrics = ReqMetrics::new();
/// metrics.increment_requests_sent();
/// assert_eq!(metrics.snapshot().requests_sent, 1);
/// ```
#[derive(Debug, Default)]
pub struct ReqMetrics {
    /// New requests dispatched by `send`
    requests_sent: AtomicU64,

    /// Timer-driven redispatches of a pending request
    resends: AtomicU64,

    /// Pending requests dropped by a newer `send`
    requests_superseded: AtomicU64,

    /// Replies matched and delivered to the caller
    replies_matched: AtomicU64,

    /// Replies shorter than the correlation tag
    replies_malformed: AtomicU64,

    /// Replies whose tag lacks the request marker
    replies_unmarked: AtomicU64,

    /// Replies carrying an ID other than the pending one
    replies_stale: AtomicU64,

    /// Dispatches refused by the raw socket with backpressure
    send_backpressure: AtomicU64,
}

/// Point-in-time copy of [`ReqMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReqMetricsSnapshot {
    pub requests_sent: u64,
    pub resends: u64,
    pub requests_superseded: u64,
    pub replies_matched: u64,
    pub replies_malformed: u64,
    pub replies_unmarked: u64,
    pub replies_stale: u64,
    pub send_backpressure: u64,
}

impl ReqMetricsSnapshot {
    /// All replies received but not delivered.
    pub fn replies_discarded(&self) -> u64 {
        self.replies_malformed + self.replies_unmarked + self.replies_stale
    }
}

impl ReqMetrics {
    /// Create a zeroed collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_resends(&self) {
        self.resends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requests_superseded(&self) {
        self.requests_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replies_matched(&self) {
        self.replies_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replies_malformed(&self) {
        self.replies_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replies_unmarked(&self) {
        self.replies_unmarked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replies_stale(&self) {
        self.replies_stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_send_backpressure(&self) {
        self.send_backpressure.fetch_add(1, Ordering::Relaxed);
    }

    /// Load all counters.
    pub fn snapshot(&self) -> ReqMetricsSnapshot {
        ReqMetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            resends: self.resends.load(Ordering::Relaxed),
            requests_superseded: self.requests_superseded.load(Ordering::Relaxed),
            replies_matched: self.replies_matched.load(Ordering::Relaxed),
            replies_malformed: self.replies_malformed.load(Ordering::Relaxed),
            replies_unmarked: self.replies_unmarked.load(Ordering::Relaxed),
            replies_stale: self.replies_stale.load(Ordering::Relaxed),
            send_backpressure: self.send_backpressure.load(Ordering::Relaxed),
        }
    }
}
