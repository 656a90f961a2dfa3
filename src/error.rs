//! Error types for response construction and emission.

use std::{error::Error as StdError, io};

use derive_more::{Display, From};
use http::StatusCode;

/// Errors raised while mutating a response, before emission starts.
#[derive(Debug, Display, From)]
#[non_exhaustive]
pub enum BuildError {
    /// Malformed header name or value.
    #[display(fmt = "bad header: {}", _0)]
    Header(http::Error),

    /// The header is produced by the engine or the entity layer and cannot
    /// be set directly.
    #[display(fmt = "header {:?} cannot be set on a response", _0)]
    ReservedHeader(http::header::HeaderName),

    /// Entity metadata was staged while no entity is attached.
    #[display(fmt = "entity is absent")]
    EntityAbsent,

    /// The response status forbids an entity.
    #[display(fmt = "status {} does not allow an entity", _0)]
    EntityNotAllowed(StatusCode),

    /// The tag is not an RFC 7232 opaque tag.
    #[display(fmt = "invalid entity tag: {:?}", _0)]
    InvalidEtag(String),
}

impl StdError for BuildError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            BuildError::Header(err) => Some(err),
            _ => None,
        }
    }
}

impl From<http::header::InvalidHeaderName> for BuildError {
    fn from(err: http::header::InvalidHeaderName) -> BuildError {
        BuildError::Header(err.into())
    }
}

impl From<http::header::InvalidHeaderValue> for BuildError {
    fn from(err: http::header::InvalidHeaderValue) -> BuildError {
        BuildError::Header(err.into())
    }
}

/// Failures of the response body stream.
///
/// Benign failures (framing violations and I/O-class source errors) still
/// flush the bytes already queued so the client can detect the truncation;
/// fatal failures abort the connection without a courtesy flush.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum BodyError {
    /// Source reached end-of-stream before the declared length.
    #[display(fmt = "body ended after {} of {} declared bytes", sent, declared)]
    Short { sent: u64, declared: u64 },

    /// Source produced more bytes than the declared length.
    #[display(fmt = "body exceeded declared length of {} bytes", declared)]
    Overrun { declared: u64 },

    /// I/O failure reported by the source.
    #[display(fmt = "body stream error: {}", _0)]
    Stream(Box<dyn StdError>),

    /// Programming error in the source.
    #[display(fmt = "body source failure: {}", _0)]
    Fatal(Box<dyn StdError>),
}

impl BodyError {
    /// Classify an erased source error: anything rooted in an [`io::Error`]
    /// is treated as a benign stream failure, the rest as a bug in the
    /// source.
    pub(crate) fn from_source(err: Box<dyn StdError>) -> BodyError {
        if is_io_class(err.as_ref()) {
            BodyError::Stream(err)
        } else {
            BodyError::Fatal(err)
        }
    }

    /// Fatal errors abort emission without flushing queued bytes.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BodyError::Fatal(_))
    }
}

impl StdError for BodyError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            BodyError::Stream(err) | BodyError::Fatal(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

fn is_io_class(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.downcast_ref::<io::Error>().is_some() {
            return true;
        }
        current = err.source();
    }
    false
}

/// The connection failed to become writable within the configured window.
pub(crate) fn write_timeout() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "write timeout")
}

/// The client drained the response below the configured throughput floor.
pub(crate) fn client_too_slow() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "client too slow")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Display)]
    #[display(fmt = "wrapped: {}", _0)]
    struct Wrapped(io::Error);

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[derive(Debug, Display)]
    #[display(fmt = "handler bug")]
    struct HandlerBug;

    impl StdError for HandlerBug {}

    #[test]
    fn io_errors_are_benign() {
        let err = BodyError::from_source(Box::new(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        )));
        assert!(matches!(err, BodyError::Stream(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn wrapped_io_errors_are_benign() {
        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        let err = BodyError::from_source(Box::new(Wrapped(inner)));
        assert!(matches!(err, BodyError::Stream(_)));
    }

    #[test]
    fn non_io_errors_are_fatal() {
        let err = BodyError::from_source(Box::new(HandlerBug));
        assert!(err.is_fatal());
    }

    #[test]
    fn display() {
        let err = BodyError::Short {
            sent: 2,
            declared: 5,
        };
        assert_eq!(err.to_string(), "body ended after 2 of 5 declared bytes");

        let err = BodyError::Overrun { declared: 2 };
        assert_eq!(err.to_string(), "body exceeded declared length of 2 bytes");

        assert_eq!(client_too_slow().to_string(), "client too slow");
        assert_eq!(write_timeout().kind(), io::ErrorKind::TimedOut);
    }
}
