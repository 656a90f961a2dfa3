//! HTTP/1 response emission primitives for the Oxbow server stack.
//!
//! This crate owns the write half of an HTTP/1.x origin server connection:
//! serializing a prepared [`Response`] head, piping an asynchronous
//! [`ByteSource`](body::ByteSource) into the connection's write queue under
//! framing and backpressure rules, policing a minimum client download rate,
//! and appending the TLS/TCP terminators for the last response on a
//! connection. Request parsing, routing and entity construction live in
//! sibling crates and reach this one only through narrow traits.

#![deny(rust_2018_idioms, nonstandard_style)]
#![warn(future_incompatible)]

pub mod body;
mod config;
mod conn;
mod cookies;
mod entity;
pub mod error;
pub mod h1;
mod headers;
mod helpers;
mod lifecycle;
mod message;
mod response;
mod response_builder;

pub use self::config::ServiceConfig;
pub use self::conn::{BufferedConnection, Connection, WriteFrame};
pub use self::cookies::CookieList;
pub use self::entity::{BytesEntity, Entity, EntityOverlay, EntityTag};
pub use self::headers::HeaderMap;
pub use self::lifecycle::{ConnectionLifecycle, RequestHint};
pub use self::message::{body_permitted, ConnectionType, ResponseHead};
pub use self::response::Response;
pub use self::response_builder::{ResponseBuilder, TryIntoHeaderPair};

pub mod http {
    //! Re-exports of the HTTP vocabulary types used across the crate.

    pub use cookie::Cookie;
    pub use http::header::{HeaderName, HeaderValue};
    pub use http::{Method, StatusCode, Version};
}
