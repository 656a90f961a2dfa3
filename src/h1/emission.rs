//! Single-response emission pipeline.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_rt::time::Instant;
use bytes::{Bytes, BytesMut};
use tracing::{debug, error, trace};

use crate::body::{BodySize, ByteSource};
use crate::config::ServiceConfig;
use crate::conn::{Connection, WriteFrame};
use crate::error::{self, BodyError};
use crate::response::Response;

use super::encoder;
use super::throughput::WriteRate;
use super::timer::WriteDeadline;

/// Where emission stands; also the resumption point after a wakeup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitState {
    /// Head not yet queued.
    Start,

    /// Reading the source and queueing body bytes.
    PipeBody,

    /// Outbound queue crossed the high watermark; draining before the next
    /// read.
    Drain,

    /// Source is done (or failed benignly); terminators queued when last,
    /// then everything flushed out.
    FlushAll,

    /// Outcome ready to report.
    Done,
}

/// What one emission left behind.
///
/// Both error slots can be set at once: a benign body error followed by a
/// connection failure during the final flush.
#[derive(Debug, Default)]
pub struct EmitOutcome {
    pub body_error: Option<BodyError>,
    pub conn_error: Option<io::Error>,

    /// Whether the connection must close after this response. Forced `true`
    /// by any error.
    pub last: bool,

    /// Head bytes queued.
    pub head_len: u64,

    /// Body bytes queued (at most the declared length).
    pub body_len: u64,
}

impl EmitOutcome {
    pub fn is_ok(&self) -> bool {
        self.body_error.is_none() && self.conn_error.is_none()
    }
}

/// Emits one response onto a connection.
///
/// The head is serialized up front and queued on first poll; body bytes are
/// then piped from the source into the connection's write queue,
/// interleaving source stalls with sink drains. When this is the last
/// response on the connection the close-notify and FIN sentinels follow the
/// final body byte.
///
/// Resolves with the connection and a structured [`EmitOutcome`]; the
/// future itself never fails, and the source is dropped on every exit path
/// before the outcome is reported. On a connection a new emission may only
/// be constructed after the previous one resolved.
pub struct Emission<S, C> {
    source: Option<S>,
    conn: Option<C>,
    head: BytesMut,
    declared: BodySize,
    state: EmitState,
    config: ServiceConfig,
    last: bool,
    terminators_queued: bool,
    rate: WriteRate,
    deadline: WriteDeadline,
    // payload bytes handed to the queue so far
    sent_target: u64,
    // bytes the transport had accepted at the previous sink wait
    last_written: u64,
    body_error: Option<BodyError>,
    conn_error: Option<io::Error>,
    head_len: u64,
    body_len: u64,
}

impl<S, C> Emission<S, C>
where
    S: ByteSource + Unpin,
    C: Connection + Unpin,
{
    /// Prepare the emission of `res`. The response is snapshotted here;
    /// later mutations of it are not observed.
    pub fn new(res: &Response, source: S, conn: C, config: ServiceConfig, last: bool) -> Self {
        let mut head = BytesMut::new();
        encoder::encode_head(res, &mut head);
        let declared = source.size();

        Emission {
            rate: WriteRate::new(Instant::now(), config.write_min_throughput()),
            deadline: WriteDeadline::new(config.write_timeout()),
            source: Some(source),
            conn: Some(conn),
            head,
            declared,
            state: EmitState::Start,
            config,
            last,
            terminators_queued: false,
            sent_target: 0,
            last_written: 0,
            body_error: None,
            conn_error: None,
            head_len: 0,
            body_len: 0,
        }
    }

    fn declared_len(&self) -> Option<u64> {
        match self.declared {
            BodySize::Sized(len) => Some(len),
            BodySize::None => Some(0),
            BodySize::Stream => None,
        }
    }

    fn queue_body(&mut self, chunk: Bytes) {
        let len = chunk.len() as u64;
        self.body_len += len;
        self.sent_target += len;
        self.conn.as_mut().unwrap().queue(WriteFrame::Data(chunk));
    }

    /// Account a chunk against the declared length and queue it.
    fn push_chunk(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }

        let declared = match self.declared_len() {
            Some(declared) => declared,
            None => return self.queue_body(chunk),
        };

        let remaining = declared - self.body_len;
        if chunk.len() as u64 > remaining {
            // ship at most the declared remainder, then fault
            if remaining > 0 {
                self.queue_body(chunk.slice(..remaining as usize));
            }
            self.fail_body(BodyError::Overrun { declared });
        } else {
            self.queue_body(chunk);
            if self.body_len == declared {
                // the source owes nothing further; skip the extra read
                self.source = None;
                self.state = EmitState::FlushAll;
            }
        }
    }

    /// Source reported end-of-stream.
    fn finish_body(&mut self) {
        match self.declared_len() {
            Some(declared) if self.body_len < declared => {
                self.fail_body(BodyError::Short {
                    sent: self.body_len,
                    declared,
                });
            }
            _ => {
                self.source = None;
                self.state = EmitState::FlushAll;
            }
        }
    }

    fn fail_body(&mut self, err: BodyError) {
        // a corrupt body stream desynchronizes framing; nothing may follow
        // this response on the connection
        self.last = true;
        self.source = None;

        let fatal = err.is_fatal();
        if fatal {
            error!("aborting response: {}", err);
        } else {
            debug!("terminating response: {}", err);
        }
        self.body_error = Some(err);

        // benign failures still flush what the client was promised so its
        // framing layer can detect the truncation
        self.state = if fatal {
            EmitState::Done
        } else {
            EmitState::FlushAll
        };
    }

    fn fail_conn(&mut self, err: io::Error) {
        debug!("dropping connection: {}", err);
        self.last = true;
        self.source = None;
        self.conn_error = Some(err);
        self.state = EmitState::Done;
    }

    /// Drive the sink; `Ok(true)` when the queue is fully drained.
    ///
    /// Every call that leaves bytes queued is a throughput checkpoint.
    fn drain(&mut self, cx: &mut Context<'_>) -> io::Result<bool> {
        let conn = self.conn.as_mut().unwrap();
        match conn.poll_drain(cx) {
            Poll::Ready(Ok(())) => Ok(true),
            Poll::Ready(Err(err)) => Err(err),
            Poll::Pending => {
                let queued = conn.queued();
                if queued > 0 {
                    let written = self.sent_target - queued;
                    self.rate.check(Instant::now(), written)?;
                }
                Ok(false)
            }
        }
    }

    /// Register the writability deadline; `Err` once it expires.
    fn sink_wait(&mut self, cx: &mut Context<'_>) -> io::Result<()> {
        let written = self.sent_target - self.conn.as_ref().unwrap().queued();
        if written > self.last_written {
            // progress pushes the deadline out
            self.deadline.clear();
        }
        self.last_written = written;

        if self.deadline.poll_expired(self.config.write_timeout(), cx) {
            return Err(error::write_timeout());
        }
        Ok(())
    }
}

#[cfg(test)]
impl<S, C> Emission<S, C> {
    pub(super) fn conn_ref(&self) -> &C {
        self.conn.as_ref().expect("emission already completed")
    }
}

impl<S, C> Future for Emission<S, C>
where
    S: ByteSource + Unpin,
    C: Connection + Unpin,
{
    type Output = (C, EmitOutcome);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            match this.state {
                EmitState::Start => {
                    let head = this.head.split().freeze();
                    this.head_len = head.len() as u64;
                    this.sent_target += this.head_len;
                    this.conn.as_mut().unwrap().queue(WriteFrame::Data(head));
                    trace!("head queued, {} bytes", this.head_len);
                    this.state = EmitState::PipeBody;
                }

                EmitState::PipeBody => {
                    let high_mark = this.config.outbound_buffer_size() as u64;
                    if this.conn.as_ref().unwrap().queued() > high_mark {
                        this.state = EmitState::Drain;
                        continue;
                    }

                    let source = match this.source.as_mut() {
                        Some(source) => source,
                        None => {
                            this.state = EmitState::FlushAll;
                            continue;
                        }
                    };

                    // reads never carry a timeout; the body may stall
                    // arbitrarily long
                    match Pin::new(source).poll_next(cx) {
                        Poll::Ready(Some(Ok(chunk))) => {
                            this.rate.read_resumed(Instant::now());
                            this.push_chunk(chunk);
                        }
                        Poll::Ready(None) => {
                            this.rate.read_resumed(Instant::now());
                            this.finish_body();
                        }
                        Poll::Ready(Some(Err(err))) => {
                            this.rate.read_resumed(Instant::now());
                            this.fail_body(BodyError::from_source(err.into()));
                        }
                        Poll::Pending => {
                            this.rate.read_stalled(Instant::now());

                            // keep the sink moving while the source thinks;
                            // this is also what gets the head out for a
                            // stalling handler
                            match this.drain(cx) {
                                Ok(true) => {
                                    this.deadline.clear();
                                    return Poll::Pending;
                                }
                                Ok(false) => {
                                    if let Err(err) = this.sink_wait(cx) {
                                        this.fail_conn(err);
                                        continue;
                                    }
                                    return Poll::Pending;
                                }
                                Err(err) => this.fail_conn(err),
                            }
                        }
                    }
                }

                EmitState::Drain => match this.drain(cx) {
                    Ok(_) => {
                        let high_mark = this.config.outbound_buffer_size() as u64;
                        if this.conn.as_ref().unwrap().queued() <= high_mark {
                            this.deadline.clear();
                            this.state = EmitState::PipeBody;
                        } else {
                            if let Err(err) = this.sink_wait(cx) {
                                this.fail_conn(err);
                                continue;
                            }
                            return Poll::Pending;
                        }
                    }
                    Err(err) => this.fail_conn(err),
                },

                EmitState::FlushAll => {
                    if this.last && !this.terminators_queued {
                        this.terminators_queued = true;
                        let conn = this.conn.as_mut().unwrap();
                        conn.queue(WriteFrame::CloseNotify);
                        conn.queue(WriteFrame::Fin);
                        trace!("terminators queued");
                    }

                    match this.drain(cx) {
                        Ok(true) => this.state = EmitState::Done,
                        Ok(false) => {
                            if let Err(err) = this.sink_wait(cx) {
                                this.fail_conn(err);
                                continue;
                            }
                            return Poll::Pending;
                        }
                        Err(err) => this.fail_conn(err),
                    }
                }

                EmitState::Done => {
                    let conn = this.conn.take().expect("emission polled after completion");
                    let outcome = EmitOutcome {
                        body_error: this.body_error.take(),
                        conn_error: this.conn_error.take(),
                        last: this.last,
                        head_len: this.head_len,
                        body_len: this.body_len,
                    };
                    return Poll::Ready((conn, outcome));
                }
            }
        }
    }
}
