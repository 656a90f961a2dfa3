//! HTTP response builder.

use std::{rc::Rc, time::SystemTime};

use cookie::Cookie;
use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode, Version};

use crate::entity::{Entity, EntityOverlay, EntityTag};
use crate::error::BuildError;
use crate::headers::is_reserved;
use crate::message::{body_permitted, ConnectionType};
use crate::response::Response;

/// Header name/value pairs accepted by [`ResponseBuilder::insert_header`].
pub trait TryIntoHeaderPair {
    fn try_into_pair(self) -> Result<(HeaderName, HeaderValue), http::Error>;
}

impl TryIntoHeaderPair for (HeaderName, HeaderValue) {
    fn try_into_pair(self) -> Result<(HeaderName, HeaderValue), http::Error> {
        Ok(self)
    }
}

impl TryIntoHeaderPair for (&str, &str) {
    fn try_into_pair(self) -> Result<(HeaderName, HeaderValue), http::Error> {
        Ok((HeaderName::try_from(self.0)?, HeaderValue::try_from(self.1)?))
    }
}

impl TryIntoHeaderPair for (&str, String) {
    fn try_into_pair(self) -> Result<(HeaderName, HeaderValue), http::Error> {
        Ok((
            HeaderName::try_from(self.0)?,
            HeaderValue::try_from(self.1.as_str())?,
        ))
    }
}

/// An HTTP response builder.
///
/// Mutators chain on `&mut Self`; the first failing mutation is remembered
/// and surfaced by [`finish`](Self::finish), leaving later mutations inert.
///
/// ```
/// use oxbow_http::Response;
/// use oxbow_http::http::{Cookie, StatusCode};
///
/// let res = Response::build(StatusCode::OK)
///     .insert_header(("x-request-id", "4263"))
///     .cookie(Cookie::new("sid", "17"))
///     .finish()
///     .unwrap();
///
/// assert_eq!(res.status(), StatusCode::OK);
/// assert!(res.headers().contains_key("x-request-id"));
/// assert_eq!(res.cookies().len(), 1);
/// ```
pub struct ResponseBuilder {
    res: Option<Response>,
    overlay: Option<EntityOverlay>,
    method: Option<Method>,
    err: Option<BuildError>,
}

impl ResponseBuilder {
    /// Create a response builder.
    #[inline]
    pub fn new(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder {
            res: Some(Response::new(status)),
            overlay: None,
            method: None,
            err: None,
        }
    }

    /// Record the method of the request being answered; a 2xx answer to
    /// `CONNECT` must not carry an entity.
    #[inline]
    pub fn request_method(&mut self, method: Method) -> &mut Self {
        self.method = Some(method);
        self
    }

    /// Set the HTTP status code of this response.
    #[inline]
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        if let Some(res) = self.inner() {
            res.head_mut().status = status;
        }
        self
    }

    /// Set the custom reason phrase for the response.
    #[inline]
    pub fn reason(&mut self, reason: &'static str) -> &mut Self {
        if let Some(res) = self.inner() {
            res.head_mut().reason = Some(reason);
        }
        self
    }

    /// Set the wire version; responses mirror the request's minor version.
    #[inline]
    pub fn version(&mut self, version: Version) -> &mut Self {
        if let Some(res) = self.inner() {
            res.head_mut().version = version;
        }
        self
    }

    /// Insert a header, replacing any value set for an equivalent name.
    ///
    /// Names owned by the engine (`Set-Cookie`, framing headers) or derived
    /// from the entity (`Content-Type`, validators, …) are rejected.
    pub fn insert_header(&mut self, header: impl TryIntoHeaderPair) -> &mut Self {
        if self.err.is_some() {
            return self;
        }

        match header.try_into_pair() {
            Ok((name, _)) if is_reserved(&name) => {
                self.err = Some(BuildError::ReservedHeader(name));
            }
            Ok((name, value)) => {
                if let Some(res) = self.res.as_mut() {
                    res.headers_mut().insert(name, value);
                }
            }
            Err(err) => self.err = Some(err.into()),
        }

        self
    }

    /// Remove a header; a no-op when the name was never set.
    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        if self.err.is_some() {
            return self;
        }

        match HeaderName::try_from(name) {
            Ok(name) => {
                if let Some(res) = self.res.as_mut() {
                    res.headers_mut().remove(name.as_str());
                }
            }
            Err(err) => self.err = Some(BuildError::from(err)),
        }

        self
    }

    /// Set a cookie, replacing one with the same `(name, domain, path)`.
    pub fn cookie(&mut self, cookie: Cookie<'static>) -> &mut Self {
        if let Some(res) = self.inner() {
            res.cookies_mut().add(cookie);
        }
        self
    }

    /// Force close connection, even if it is marked as keep-alive.
    #[inline]
    pub fn force_close(&mut self) -> &mut Self {
        if let Some(res) = self.inner() {
            res.head_mut().set_connection_type(ConnectionType::Close);
        }
        self
    }

    /// Set connection type to keep-alive.
    #[inline]
    pub fn keep_alive(&mut self) -> &mut Self {
        if let Some(res) = self.inner() {
            res.head_mut().set_connection_type(ConnectionType::KeepAlive);
        }
        self
    }

    /// Attach `entity`, discarding any staged entity metadata.
    pub fn entity(&mut self, entity: impl Entity + 'static) -> &mut Self {
        self.overlay = None;
        if let Some(res) = self.inner() {
            res.set_entity(Some(Rc::new(entity)));
        }
        self
    }

    /// Override the entity's `Last-Modified` date.
    pub fn entity_last_modified(&mut self, when: SystemTime) -> &mut Self {
        self.with_overlay(|overlay| overlay.set_last_modified(Some(when)))
    }

    /// Override the entity's `Expires` date.
    pub fn entity_expires(&mut self, when: SystemTime) -> &mut Self {
        self.with_overlay(|overlay| overlay.set_expires(Some(when)))
    }

    /// Override the entity's tag; the tag is validated on set.
    pub fn entity_etag(&mut self, tag: &str) -> &mut Self {
        match EntityTag::strong(tag) {
            Ok(tag) => self.with_overlay(|overlay| overlay.set_etag(Some(tag))),
            Err(err) => {
                if self.err.is_none() {
                    self.err = Some(err);
                }
                self
            }
        }
    }

    /// Flip the `W/` weakness prefix of the entity's tag.
    pub fn entity_etag_weak(&mut self, weak: bool) -> &mut Self {
        self.with_overlay(|overlay| overlay.set_etag_weak(weak))
    }

    /// Finalize the response.
    ///
    /// This `ResponseBuilder` will be left in a useless state.
    pub fn finish(&mut self) -> Result<Response, BuildError> {
        if let Some(err) = self.err.take() {
            return Err(err);
        }

        let mut res = self.res.take().expect("cannot reuse response builder");

        if let Some(overlay) = self.overlay.take() {
            res.set_entity(Some(Rc::new(overlay)));
        }

        if res.entity().is_some() && !body_permitted(res.status(), self.method.as_ref()) {
            return Err(BuildError::EntityNotAllowed(res.status()));
        }

        Ok(res)
    }

    /// Create an owned `ResponseBuilder`, leaving the original in a useless
    /// state.
    pub fn take(&mut self) -> ResponseBuilder {
        ResponseBuilder {
            res: self.res.take(),
            overlay: self.overlay.take(),
            method: self.method.take(),
            err: self.err.take(),
        }
    }

    fn with_overlay(&mut self, f: impl FnOnce(&mut EntityOverlay)) -> &mut Self {
        if self.err.is_some() {
            return self;
        }

        if self.overlay.is_none() {
            match self.res.as_ref().and_then(|res| res.entity_handle()) {
                Some(base) => self.overlay = Some(EntityOverlay::new(base)),
                None => {
                    self.err = Some(BuildError::EntityAbsent);
                    return self;
                }
            }
        }

        f(self.overlay.as_mut().expect("overlay just staged"));
        self
    }

    /// Access the response if no mutation has failed so far.
    fn inner(&mut self) -> Option<&mut Response> {
        if self.err.is_some() {
            return None;
        }
        self.res.as_mut()
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

/// Convert `Response` to a `ResponseBuilder` for further mutation.
impl From<Response> for ResponseBuilder {
    fn from(res: Response) -> ResponseBuilder {
        ResponseBuilder {
            res: Some(res),
            overlay: None,
            method: None,
            err: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::entity::BytesEntity;

    #[test]
    fn test_basic_builder() {
        let res = Response::build(StatusCode::OK)
            .insert_header(("x-test", "value"))
            .finish()
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get("x-test").unwrap(), "value");
    }

    #[test]
    fn test_force_close() {
        let res = Response::build(StatusCode::OK)
            .force_close()
            .finish()
            .unwrap();
        assert!(!res.head().keep_alive());
    }

    #[test]
    fn set_cookie_header_is_rejected() {
        let err = Response::build(StatusCode::OK)
            .insert_header(("set-cookie", "a=1"))
            .finish()
            .unwrap_err();
        assert!(matches!(err, BuildError::ReservedHeader(_)));
    }

    #[test]
    fn framing_and_entity_headers_are_rejected() {
        for name in ["content-length", "transfer-encoding", "content-type", "etag"] {
            let err = Response::build(StatusCode::OK)
                .insert_header((name, "x"))
                .finish()
                .unwrap_err();
            assert!(matches!(err, BuildError::ReservedHeader(_)), "{}", name);
        }
    }

    #[test]
    fn invalid_header_value_is_a_bad_header() {
        let err = Response::build(StatusCode::OK)
            .insert_header(("x-test", "line\r\nbreak"))
            .finish()
            .unwrap_err();
        assert!(matches!(err, BuildError::Header(_)));
    }

    #[test]
    fn insert_then_remove_is_as_if_never_set() {
        let res = Response::build(StatusCode::OK)
            .insert_header(("x-test", "value"))
            .remove_header("X-Test")
            .finish()
            .unwrap();
        let pristine = Response::build(StatusCode::OK).finish().unwrap();

        assert!(res.headers().is_empty());
        assert_eq!(res.headers(), pristine.headers());
    }

    #[test]
    fn entity_metadata_without_entity_fails() {
        let err = Response::build(StatusCode::OK)
            .entity_etag("v1")
            .finish()
            .unwrap_err();
        assert!(matches!(err, BuildError::EntityAbsent));
    }

    #[test]
    fn entity_metadata_overlays_the_entity() {
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(784111777);
        let res = Response::build(StatusCode::OK)
            .entity(BytesEntity::new(mime::TEXT_PLAIN, "hello"))
            .entity_last_modified(when)
            .entity_etag("v2")
            .entity_etag_weak(true)
            .finish()
            .unwrap();

        let entity = res.entity().unwrap();
        assert_eq!(entity.last_modified(), Some(when));
        assert_eq!(entity.etag().unwrap().to_string(), "W/\"v2\"");
        assert_eq!(entity.content_type(), mime::TEXT_PLAIN);
    }

    #[test]
    fn replacing_the_entity_discards_staged_metadata() {
        let res = Response::build(StatusCode::OK)
            .entity(BytesEntity::new(mime::TEXT_PLAIN, "old"))
            .entity_etag("stale")
            .entity(BytesEntity::new(mime::TEXT_PLAIN, "new"))
            .finish()
            .unwrap();

        assert!(res.entity().unwrap().etag().is_none());
    }

    #[test]
    fn bad_etag_fails_on_set() {
        let err = Response::build(StatusCode::OK)
            .entity(BytesEntity::new(mime::TEXT_PLAIN, "x"))
            .entity_etag("no\"quotes")
            .finish()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidEtag(_)));
    }

    #[test]
    fn entity_on_bodyless_status_fails() {
        let err = Response::build(StatusCode::NO_CONTENT)
            .entity(BytesEntity::new(mime::TEXT_PLAIN, "x"))
            .finish()
            .unwrap_err();
        match err {
            BuildError::EntityNotAllowed(status) => assert_eq!(status, StatusCode::NO_CONTENT),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn entity_on_2xx_connect_answer_fails() {
        let err = Response::build(StatusCode::OK)
            .request_method(Method::CONNECT)
            .entity(BytesEntity::new(mime::TEXT_PLAIN, "x"))
            .finish()
            .unwrap_err();
        match err {
            BuildError::EntityNotAllowed(status) => assert_eq!(status, StatusCode::OK),
            other => panic!("unexpected error: {}", other),
        }

        // a failed CONNECT is an ordinary response and may explain itself
        let res = Response::build(StatusCode::BAD_GATEWAY)
            .request_method(Method::CONNECT)
            .entity(BytesEntity::new(mime::TEXT_PLAIN, "tunnel failed"))
            .finish()
            .unwrap();
        assert!(res.entity().is_some());
    }
}
