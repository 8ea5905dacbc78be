//! Call budget tracking for hosts with rate-limited APIs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::host::client::{RateLimitProbe, RateLimitSnapshot};
use crate::host::types::HostType;

/// Budget of a rate-limited host as seen at the last probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub limit: i64,
    pub remaining: i64,
    /// Safety buffer configured for this host
    pub buffer: i64,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitState {
    pub fn from_snapshot(snapshot: RateLimitSnapshot, buffer: i64) -> Self {
        Self {
            limit: snapshot.limit,
            remaining: snapshot.remaining,
            buffer,
            reset_at: snapshot.reset_at,
        }
    }

    /// `limit - (remaining - buffer)`
    pub fn calls_left(&self) -> i64 {
        self.limit
            .saturating_sub(self.remaining.saturating_sub(self.buffer))
    }

    /// No remote calls may be made while this holds
    pub fn is_exhausted(&self) -> bool {
        self.calls_left() <= 0
    }
}

/// Gatekeeper for a single rate-limited host
///
/// Every decision probes the host first. Probe and decision run under one
/// lock, so concurrent callers never decide from the same stale read.
pub struct RateLimiter {
    host_type: HostType,
    probe: Arc<dyn RateLimitProbe>,
    buffer: i64,
    probe_timeout: Duration,
    state: Mutex<Option<RateLimitState>>,
}

impl RateLimiter {
    pub fn new(
        host_type: HostType,
        probe: Arc<dyn RateLimitProbe>,
        buffer: i64,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            host_type,
            probe,
            buffer,
            probe_timeout,
            state: Mutex::new(None),
        }
    }

    /// Returns true if a remote call may be made now
    ///
    /// Fails closed: if the budget cannot be read, no call is allowed.
    pub async fn should_proceed(&self) -> bool {
        let mut state = self.state.lock().await;

        let snapshot = match timeout(self.probe_timeout, self.probe.fetch_rate_limit()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!(
                    "Could not get {} rate limit information, cancelling calls: {}",
                    self.host_type, e
                );
                *state = None;
                return false;
            }
            Err(_) => {
                warn!(
                    "{} rate limit probe timed out after {:?}, cancelling calls",
                    self.host_type, self.probe_timeout
                );
                *state = None;
                return false;
            }
        };

        let current = RateLimitState::from_snapshot(snapshot, self.buffer);
        *state = Some(current);

        debug!(
            "{}: {}/{} calls remaining, resets at {:?}",
            self.host_type, current.remaining, current.limit, current.reset_at
        );

        if current.is_exhausted() {
            info!(
                "No {} calls remaining. No release checks before {:?}",
                self.host_type, current.reset_at
            );
            return false;
        }

        true
    }

    /// State observed by the most recent successful probe
    pub async fn last_state(&self) -> Option<RateLimitState> {
        *self.state.lock().await
    }
}
