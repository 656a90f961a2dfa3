//! Keep-alive accounting for a connection.

use http::{Method, Version};
use tracing::trace;

use crate::config::ServiceConfig;
use crate::message::{ConnectionType, ResponseHead};

/// What the request parser learned about the exchange being answered.
#[derive(Debug, Clone)]
pub struct RequestHint {
    pub version: Version,

    /// Method of the paired request; restricts which responses may carry an
    /// entity (a 2xx answer to `CONNECT` must not).
    pub method: Option<Method>,

    /// Explicit `Connection` intent carried by the request, when present.
    pub connection: Option<ConnectionType>,

    /// The handler marked this exchange as the connection's final one.
    pub final_response: bool,
}

impl RequestHint {
    pub fn new(version: Version) -> RequestHint {
        RequestHint {
            version,
            method: None,
            connection: None,
            final_response: false,
        }
    }
}

/// Decides, per response, whether the connection survives it.
///
/// The emission engine consumes the decision as a plain boolean; a `true`
/// makes it append the TLS close-notify and TCP FIN sentinels after the
/// response bytes.
pub struct ConnectionLifecycle {
    keep_alive_enabled: bool,
    draining: bool,
}

impl ConnectionLifecycle {
    pub fn new(config: &ServiceConfig) -> ConnectionLifecycle {
        ConnectionLifecycle {
            keep_alive_enabled: config.keep_alive_enabled(),
            draining: false,
        }
    }

    /// Mark the server as shutting down; every response becomes the last.
    pub fn drain(&mut self) {
        self.draining = true;
    }

    /// Wire version for the response: mirrors the request's version, 1.1
    /// when no request was parsed.
    pub fn response_version(&self, req: Option<&RequestHint>) -> Version {
        req.map(|req| req.version).unwrap_or(Version::HTTP_11)
    }

    /// True when `res` must be the connection's final response.
    pub fn is_last(&self, req: Option<&RequestHint>, res: &ResponseHead) -> bool {
        if self.draining || !self.keep_alive_enabled {
            return true;
        }

        if res.ctype() == Some(ConnectionType::Close) {
            trace!("response forces connection close");
            return true;
        }

        match req {
            // a request that never parsed leaves the stream unsynchronized
            None => true,
            Some(req) => {
                if req.final_response {
                    return true;
                }
                match req.connection {
                    Some(ConnectionType::Close) => true,
                    Some(ConnectionType::KeepAlive) => false,
                    None => req.version < Version::HTTP_11,
                }
            }
        }
    }
}
