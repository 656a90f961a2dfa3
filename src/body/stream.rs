use std::{
    error::Error as StdError,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_core::{ready, Stream};
use pin_project_lite::pin_project;

use super::{BodySize, ByteSource};

pin_project! {
    /// A [`ByteSource`] over any byte stream of unknown length.
    pub struct SourceStream<S> {
        #[pin]
        stream: S,
    }
}

impl<S, E> SourceStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn StdError>> + 'static,
{
    #[inline]
    pub fn new(stream: S) -> Self {
        SourceStream { stream }
    }
}

impl<S, E> ByteSource for SourceStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn StdError>> + 'static,
{
    type Error = E;

    #[inline]
    fn size(&self) -> BodySize {
        BodySize::Stream
    }

    /// Attempts to pull out the next value of the underlying stream.
    ///
    /// Empty values are skipped to prevent a consumer mistaking them for
    /// end-of-stream.
    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let mut stream = self.project().stream;

        loop {
            let stream = stream.as_mut();

            return Poll::Ready(match ready!(stream.poll_next(cx)) {
                Some(Ok(ref bytes)) if bytes.is_empty() => continue,
                opt => opt,
            });
        }
    }
}
