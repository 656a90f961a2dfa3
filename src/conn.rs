//! Connection write queue.

use std::{
    collections::VecDeque,
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use tokio::io::AsyncWrite;

/// A unit queued for delivery to the peer.
///
/// Sentinels frame the end of the last response on a connection: the TLS
/// `close_notify` alert, then the TCP FIN. They carry no payload bytes but
/// hold their queue position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteFrame {
    Data(Bytes),
    CloseNotify,
    Fin,
}

impl WriteFrame {
    fn payload_len(&self) -> u64 {
        match self {
            WriteFrame::Data(bytes) => bytes.len() as u64,
            WriteFrame::CloseNotify | WriteFrame::Fin => 0,
        }
    }
}

/// Outbound half of one client connection.
///
/// Frames are delivered strictly in queue order. [`poll_drain`] writes as
/// much as the transport accepts without blocking; while anything remains
/// queued the calling task is scheduled for wakeup once the transport can
/// take more.
///
/// [`poll_drain`]: Connection::poll_drain
pub trait Connection {
    /// Append a frame to the queue; returns the payload bytes now queued.
    fn queue(&mut self, frame: WriteFrame) -> u64;

    /// Payload bytes queued and not yet accepted by the transport.
    fn queued(&self) -> u64;

    /// Drive the queue into the transport.
    ///
    /// `Ready(Ok(()))` means the queue is empty, sentinels included.
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

/// [`Connection`] over any async byte transport.
///
/// `CloseNotify` flushes the transport and `Fin` drives its shutdown; a TLS
/// transport's shutdown writes the `close_notify` alert before the TCP FIN,
/// so queue order is preserved on the wire.
pub struct BufferedConnection<T> {
    io: T,
    queue: VecDeque<WriteFrame>,
    queued: u64,
    // bytes of the front data frame already accepted
    offset: usize,
}

impl<T: AsyncWrite + Unpin> BufferedConnection<T> {
    pub fn new(io: T) -> BufferedConnection<T> {
        BufferedConnection {
            io,
            queue: VecDeque::new(),
            queued: 0,
            offset: 0,
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsyncWrite + Unpin> Connection for BufferedConnection<T> {
    fn queue(&mut self, frame: WriteFrame) -> u64 {
        self.queued += frame.payload_len();
        self.queue.push_back(frame);
        self.queued
    }

    fn queued(&self) -> u64 {
        self.queued
    }

    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while let Some(frame) = self.queue.front().cloned() {
            match frame {
                WriteFrame::Data(bytes) => {
                    while self.offset < bytes.len() {
                        match Pin::new(&mut self.io).poll_write(cx, &bytes[self.offset..]) {
                            Poll::Ready(Ok(0)) => {
                                return Poll::Ready(Err(io::Error::new(
                                    io::ErrorKind::WriteZero,
                                    "",
                                )));
                            }
                            Poll::Ready(Ok(n)) => {
                                self.offset += n;
                                self.queued -= n as u64;
                            }
                            Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                            Poll::Pending => return Poll::Pending,
                        }
                    }
                    self.offset = 0;
                }
                WriteFrame::CloseNotify => match Pin::new(&mut self.io).poll_flush(cx) {
                    Poll::Ready(Ok(())) => {}
                    Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                    Poll::Pending => return Poll::Pending,
                },
                WriteFrame::Fin => match Pin::new(&mut self.io).poll_shutdown(cx) {
                    Poll::Ready(Ok(())) => {}
                    Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                    Poll::Pending => return Poll::Pending,
                },
            }

            self.queue.pop_front();
        }

        Poll::Ready(Ok(()))
    }
}
