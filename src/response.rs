//! HTTP response value.

use std::{fmt, rc::Rc};

use http::StatusCode;

use crate::cookies::CookieList;
use crate::entity::Entity;
use crate::headers::HeaderMap;
use crate::message::ResponseHead;
use crate::response_builder::ResponseBuilder;

/// A prepared HTTP response: head, cookies and an optional entity.
///
/// Cloning is the copy-constructor: the head and cookie list are copied
/// deeply, while the entity, an immutable description, is shared. Once
/// handed to the emission engine a response is treated as frozen.
#[derive(Clone)]
pub struct Response {
    head: ResponseHead,
    cookies: CookieList,
    entity: Option<Rc<dyn Entity>>,
}

impl Response {
    /// Constructs a new response with the given status and no entity.
    #[inline]
    pub fn new(status: StatusCode) -> Response {
        Response {
            head: ResponseHead::new(status),
            cookies: CookieList::new(),
            entity: None,
        }
    }

    /// Constructs a new response builder.
    #[inline]
    pub fn build(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    // just a couple frequently used shortcuts
    // this list should not grow larger than a few

    /// Constructs a new response with status 200 OK.
    #[inline]
    pub fn ok() -> Response {
        Response::new(StatusCode::OK)
    }

    /// Constructs a new response with status 400 Bad Request.
    #[inline]
    pub fn bad_request() -> Response {
        Response::new(StatusCode::BAD_REQUEST)
    }

    /// Constructs a new response with status 500 Internal Server Error.
    #[inline]
    pub fn internal_server_error() -> Response {
        Response::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    // end shortcuts

    /// Returns a reference to the head of this response.
    #[inline]
    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// Returns a mutable reference to the head of this response.
    #[inline]
    pub fn head_mut(&mut self) -> &mut ResponseHead {
        &mut self.head
    }

    /// Returns the status code of this response.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    /// Returns a reference to the response headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns a mutable reference to the response headers.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.head.headers
    }

    /// Returns a reference to the response cookie list.
    #[inline]
    pub fn cookies(&self) -> &CookieList {
        &self.cookies
    }

    /// Returns a mutable reference to the response cookie list.
    #[inline]
    pub fn cookies_mut(&mut self) -> &mut CookieList {
        &mut self.cookies
    }

    /// Returns the entity attached to this response, if any.
    #[inline]
    pub fn entity(&self) -> Option<&dyn Entity> {
        self.entity.as_deref()
    }

    pub(crate) fn entity_handle(&self) -> Option<Rc<dyn Entity>> {
        self.entity.clone()
    }

    pub(crate) fn set_entity(&mut self, entity: Option<Rc<dyn Entity>>) {
        self.entity = entity;
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let res = writeln!(
            f,
            "\nResponse {:?} {}",
            self.head.version,
            self.head.status,
        );
        let _ = writeln!(f, "  headers:");
        for (key, val) in self.head.headers.iter() {
            let _ = writeln!(f, "    {:?}: {:?}", key, val);
        }
        let _ = writeln!(f, "  cookies: {}", self.cookies.len());
        let _ = writeln!(
            f,
            "  entity: {:?}",
            self.entity.as_deref().map(|e| e.size())
        );
        res
    }
}
