//local shortcuts

//third-party shortcuts

//standard shortcuts
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

//-------------------------------------------------------------------------------------------------------------------

/// A single `fetch_add`/`load` counter, the same small primitive the teacher's
/// `ConnectionCounter`/`PendingCounter` use in `server/connection_validation.rs`, generalized so
/// every observability counter shares one implementation instead of hand-rolling each.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter
{
    pub fn load(&self) -> u64
    {
        self.0.load(Ordering::Relaxed)
    }

    pub fn increment(&self)
    {
        self.0.fetch_add(1, Ordering::Release);
    }

    pub fn add(&self, n: u64)
    {
        self.0.fetch_add(n, Ordering::Release);
    }

    /// Saturating decrement: never wraps below zero even under a racing increment.
    pub fn decrement(&self)
    {
        if self.0.fetch_sub(1, Ordering::Release) == u64::MAX
        {
            self.increment();
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Integer counters only, per the observability surface in the spec: no latency histograms or
/// health scores here, those are left to an external harness.
///
/// Held by the [`crate::Supervisor`] and cloned into sessions/router as needed instead of a
/// global singleton (the redesign flag in the spec's design notes calls out ambient globals as
/// something to avoid).
#[derive(Debug, Clone, Default)]
pub struct Metrics
{
    pub connections_active: Counter,
    pub connections_total: Counter,
    pub messages_forwarded: Counter,
    pub dropped_total: Counter,
    pub protocol_errors: Counter,
    pub heartbeat_timeouts: Counter,
}

/// A point-in-time read of [`Metrics`]. Cheap to construct; safe to serialize or render.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot
{
    pub connections_active: u64,
    pub connections_total: u64,
    pub messages_forwarded: u64,
    pub dropped_total: u64,
    pub protocol_errors: u64,
    pub heartbeat_timeouts: u64,
}

impl Metrics
{
    pub fn snapshot(&self) -> MetricsSnapshot
    {
        MetricsSnapshot{
            connections_active: self.connections_active.load(),
            connections_total: self.connections_total.load(),
            messages_forwarded: self.messages_forwarded.load(),
            dropped_total: self.dropped_total.load(),
            protocol_errors: self.protocol_errors.load(),
            heartbeat_timeouts: self.heartbeat_timeouts.load(),
        }
    }
}

impl MetricsSnapshot
{
    /// Render as `name value` lines, the plain-text shape served at `GET /metrics`.
    pub fn render_text(&self) -> String
    {
        format!(
            "connections_active {}\nconnections_total {}\nmessages_forwarded {}\ndropped_total {}\nprotocol_errors {}\nheartbeat_timeouts {}\n",
            self.connections_active,
            self.connections_total,
            self.messages_forwarded,
            self.dropped_total,
            self.protocol_errors,
            self.heartbeat_timeouts,
        )
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Per-session byte/frame counters, read by [`crate::SessionHandle::metrics`].
#[derive(Debug, Clone, Default)]
pub struct SessionMetrics
{
    pub bytes_sent: Counter,
    pub bytes_received: Counter,
    pub frames_sent: Counter,
    pub frames_dropped: Counter,
}

//-------------------------------------------------------------------------------------------------------------------
