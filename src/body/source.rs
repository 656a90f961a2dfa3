//! [`ByteSource`] trait and foreign implementations.

use std::{
    convert::Infallible,
    error::Error as StdError,
    mem,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_core::ready;
use pin_project_lite::pin_project;

use super::BodySize;

/// An asynchronous producer of response body bytes.
///
/// A source yields byte buffers until end-of-stream (`None`) or an error;
/// zero-length buffers are legal and mean nothing. The emission pipeline
/// owns the source for the lifetime of one response and drops it exactly
/// once on every exit path, which is also how a pending read is cancelled.
pub trait ByteSource {
    type Error: Into<Box<dyn StdError>>;

    /// Declared size of the body this source produces.
    fn size(&self) -> BodySize;

    /// Attempt to pull out the next buffer of body bytes.
    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>>;
}

/// A type-erased, heap-allocated byte source.
pub type BoxedSource = Pin<Box<dyn ByteSource<Error = Box<dyn StdError>>>>;

/// Erase a source's type and error, pinning it on the heap.
pub fn boxed<S>(source: S) -> BoxedSource
where
    S: ByteSource + 'static,
{
    Box::pin(SourceMapErr::new(source, Into::into))
}

impl<S> ByteSource for Box<S>
where
    S: ByteSource + Unpin,
{
    type Error = S::Error;

    #[inline]
    fn size(&self) -> BodySize {
        self.as_ref().size()
    }

    #[inline]
    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        Pin::new(self.get_mut().as_mut()).poll_next(cx)
    }
}

impl<S> ByteSource for Pin<Box<S>>
where
    S: ByteSource + ?Sized,
{
    type Error = S::Error;

    #[inline]
    fn size(&self) -> BodySize {
        self.as_ref().size()
    }

    #[inline]
    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        self.get_mut().as_mut().poll_next(cx)
    }
}

impl ByteSource for () {
    type Error = Infallible;

    #[inline]
    fn size(&self) -> BodySize {
        BodySize::Sized(0)
    }

    #[inline]
    fn poll_next(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        Poll::Ready(None)
    }
}

impl ByteSource for Bytes {
    type Error = Infallible;

    fn size(&self) -> BodySize {
        BodySize::Sized(self.len() as u64)
    }

    fn poll_next(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        if self.is_empty() {
            Poll::Ready(None)
        } else {
            Poll::Ready(Some(Ok(mem::take(self.get_mut()))))
        }
    }
}

impl ByteSource for &'static [u8] {
    type Error = Infallible;

    fn size(&self) -> BodySize {
        BodySize::Sized(self.len() as u64)
    }

    fn poll_next(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        if self.is_empty() {
            Poll::Ready(None)
        } else {
            let bytes = mem::take(self.get_mut());
            Poll::Ready(Some(Ok(Bytes::from_static(bytes))))
        }
    }
}

impl ByteSource for &'static str {
    type Error = Infallible;

    fn size(&self) -> BodySize {
        BodySize::Sized(self.len() as u64)
    }

    fn poll_next(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        if self.is_empty() {
            Poll::Ready(None)
        } else {
            let string = mem::take(self.get_mut());
            Poll::Ready(Some(Ok(Bytes::from_static(string.as_bytes()))))
        }
    }
}

impl ByteSource for String {
    type Error = Infallible;

    fn size(&self) -> BodySize {
        BodySize::Sized(self.len() as u64)
    }

    fn poll_next(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        if self.is_empty() {
            Poll::Ready(None)
        } else {
            let string = mem::take(self.get_mut());
            Poll::Ready(Some(Ok(Bytes::from(string))))
        }
    }
}

impl ByteSource for Vec<u8> {
    type Error = Infallible;

    fn size(&self) -> BodySize {
        BodySize::Sized(self.len() as u64)
    }

    fn poll_next(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        if self.is_empty() {
            Poll::Ready(None)
        } else {
            let bytes = mem::take(self.get_mut());
            Poll::Ready(Some(Ok(Bytes::from(bytes))))
        }
    }
}

pin_project! {
    struct SourceMapErr<S, F> {
        #[pin]
        source: S,
        mapper: Option<F>,
    }
}

impl<S, F, E> SourceMapErr<S, F>
where
    S: ByteSource,
    F: FnOnce(S::Error) -> E,
{
    fn new(source: S, mapper: F) -> Self {
        Self {
            source,
            mapper: Some(mapper),
        }
    }
}

impl<S, F, E> ByteSource for SourceMapErr<S, F>
where
    S: ByteSource,
    F: FnOnce(S::Error) -> E,
    E: Into<Box<dyn StdError>>,
{
    type Error = E;

    fn size(&self) -> BodySize {
        self.source.size()
    }

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let this = self.as_mut().project();

        match ready!(this.source.poll_next(cx)) {
            Some(Err(err)) => {
                let f = self
                    .as_mut()
                    .project()
                    .mapper
                    .take()
                    .expect("polled after error");
                Poll::Ready(Some(Err((f)(err))))
            }
            Some(Ok(chunk)) => Poll::Ready(Some(Ok(chunk))),
            None => Poll::Ready(None),
        }
    }
}
