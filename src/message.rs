use bitflags::bitflags;
use http::{Method, StatusCode, Version};

use crate::headers::HeaderMap;

/// Represents the connection intent of a response.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ConnectionType {
    /// Close connection after response.
    Close,

    /// Keep connection alive after response.
    KeepAlive,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Flags: u8 {
        const CLOSE      = 0b0000_0001;
        const KEEP_ALIVE = 0b0000_0010;
    }
}

/// Status line, headers and connection intent of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: Version,
    pub status: StatusCode,
    pub reason: Option<&'static str>,
    pub headers: HeaderMap,
    flags: Flags,
}

impl ResponseHead {
    /// Create new instance of `ResponseHead` type.
    #[inline]
    pub fn new(status: StatusCode) -> ResponseHead {
        ResponseHead {
            status,
            version: Version::HTTP_11,
            headers: HeaderMap::with_capacity(12),
            reason: None,
            flags: Flags::empty(),
        }
    }

    #[inline]
    /// Read the message headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    /// Mutable reference to the message headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[inline]
    /// Set connection type of the message.
    pub fn set_connection_type(&mut self, ctype: ConnectionType) {
        match ctype {
            ConnectionType::Close => {
                self.flags.insert(Flags::CLOSE);
                self.flags.remove(Flags::KEEP_ALIVE);
            }
            ConnectionType::KeepAlive => {
                self.flags.insert(Flags::KEEP_ALIVE);
                self.flags.remove(Flags::CLOSE);
            }
        }
    }

    #[inline]
    pub fn connection_type(&self) -> ConnectionType {
        if self.flags.contains(Flags::CLOSE) {
            ConnectionType::Close
        } else if self.flags.contains(Flags::KEEP_ALIVE) {
            ConnectionType::KeepAlive
        } else if self.version < Version::HTTP_11 {
            ConnectionType::Close
        } else {
            ConnectionType::KeepAlive
        }
    }

    #[inline]
    /// Check if keep-alive is enabled.
    pub fn keep_alive(&self) -> bool {
        self.connection_type() == ConnectionType::KeepAlive
    }

    /// Connection intent set explicitly on this response, if any.
    #[inline]
    pub(crate) fn ctype(&self) -> Option<ConnectionType> {
        if self.flags.contains(Flags::CLOSE) {
            Some(ConnectionType::Close)
        } else if self.flags.contains(Flags::KEEP_ALIVE) {
            Some(ConnectionType::KeepAlive)
        } else {
            None
        }
    }

    /// Get reason phrase for the response.
    #[inline]
    pub fn reason(&self) -> &str {
        self.reason.unwrap_or_else(|| {
            self.status
                .canonical_reason()
                .unwrap_or("<unknown status code>")
        })
    }
}

/// Whether a response with this status may carry an entity.
///
/// 1xx, 204 and 304 responses never carry one, nor does a 2xx answer to a
/// `CONNECT` request.
pub fn body_permitted(status: StatusCode, method: Option<&Method>) -> bool {
    if status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
    {
        return false;
    }

    match method {
        Some(method) if *method == Method::CONNECT => !status.is_success(),
        _ => true,
    }
}
