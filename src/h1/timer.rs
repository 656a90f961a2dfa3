use std::{fmt, future::Future, pin::Pin, task::Context, time::Duration};

use actix_rt::time::{sleep, Sleep};

/// Writability deadline for one connection wait.
///
/// Armed when the pipeline starts waiting for the transport to accept more
/// bytes; cleared when the wait makes progress. A disabled deadline (zero
/// timeout) never expires.
pub(super) enum WriteDeadline {
    Disabled,
    Idle,
    Armed { timer: Pin<Box<Sleep>> },
}

impl WriteDeadline {
    pub(super) fn new(timeout: Duration) -> WriteDeadline {
        if timeout.is_zero() {
            WriteDeadline::Disabled
        } else {
            WriteDeadline::Idle
        }
    }

    /// Arm the deadline if it is idle, register it with the task, and report
    /// whether it has expired.
    pub(super) fn poll_expired(&mut self, timeout: Duration, cx: &mut Context<'_>) -> bool {
        match self {
            WriteDeadline::Disabled => false,
            WriteDeadline::Idle => {
                let mut timer = Box::pin(sleep(timeout));
                let expired = timer.as_mut().poll(cx).is_ready();
                *self = WriteDeadline::Armed { timer };
                expired
            }
            WriteDeadline::Armed { timer } => timer.as_mut().poll(cx).is_ready(),
        }
    }

    /// Progress was made; the next wait gets a fresh deadline.
    pub(super) fn clear(&mut self) {
        if !matches!(self, WriteDeadline::Disabled) {
            *self = WriteDeadline::Idle;
        }
    }
}

impl fmt::Debug for WriteDeadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteDeadline::Disabled => f.write_str("WriteDeadline::Disabled"),
            WriteDeadline::Idle => f.write_str("WriteDeadline::Idle"),
            WriteDeadline::Armed { timer } => f
                .debug_struct("WriteDeadline::Armed")
                .field("deadline", &timer.deadline())
                .finish(),
        }
    }
}
