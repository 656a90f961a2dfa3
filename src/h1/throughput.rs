//! Minimum client download rate.

use std::io;
use std::time::Duration;

use actix_rt::time::Instant;

use crate::error;

// grace period before the floor is enforced; short responses and bursty
// congestion windows never get judged
const WARMUP: Duration = Duration::from_secs(10);

/// Observed write-rate monitor for one response.
///
/// Time spent stalled on the body source is excluded from the elapsed
/// window so a slow handler does not incriminate the client.
#[derive(Debug)]
pub(crate) struct WriteRate {
    started: Instant,
    min_throughput: u64,
    stall_started: Option<Instant>,
    stalled: Duration,
}

impl WriteRate {
    pub(crate) fn new(started: Instant, min_throughput: u64) -> WriteRate {
        WriteRate {
            started,
            min_throughput,
            stall_started: None,
            stalled: Duration::ZERO,
        }
    }

    /// The source came up empty; the clock stops until it produces.
    pub(crate) fn read_stalled(&mut self, now: Instant) {
        if self.stall_started.is_none() {
            self.stall_started = Some(now);
        }
    }

    /// The source produced (or finished); the clock resumes.
    pub(crate) fn read_resumed(&mut self, now: Instant) {
        if let Some(since) = self.stall_started.take() {
            self.stalled += now - since;
        }
    }

    /// Check the floor against `written` bytes delivered so far.
    ///
    /// Never fires inside the warmup window or when policing is disabled.
    pub(crate) fn check(&self, now: Instant, written: u64) -> io::Result<()> {
        if self.min_throughput == 0 {
            return Ok(());
        }

        let stalled = match self.stall_started {
            Some(since) => self.stalled + (now - since),
            None => self.stalled,
        };
        let spent = (now - self.started).saturating_sub(stalled);

        if spent <= WARMUP {
            return Ok(());
        }

        let floor = self.min_throughput as u128 * spent.as_millis() / 1000;
        if (written as u128) < floor {
            return Err(error::client_too_slow());
        }

        Ok(())
    }
}
