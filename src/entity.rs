//! Entity descriptors: payload metadata plus a source factory.

use std::{fmt, rc::Rc, time::SystemTime};

use bytes::Bytes;
use mime::Mime;

use crate::body::{boxed, BodySize, BoxedSource};
use crate::error::BuildError;

/// An immutable description of a response entity.
///
/// Entities carry the payload metadata (type, size, validators) and can open
/// a fresh byte source for every emission, so one entity may back any number
/// of responses. The wire headers derived from these fields are written by
/// the head serializer; user code cannot place them in the header map.
pub trait Entity {
    fn content_type(&self) -> Mime;

    /// Declared payload size; [`BodySize::Stream`] when unknown.
    fn size(&self) -> BodySize;

    fn last_modified(&self) -> Option<SystemTime> {
        None
    }

    fn expires(&self) -> Option<SystemTime> {
        None
    }

    fn etag(&self) -> Option<&EntityTag> {
        None
    }

    /// Open a fresh byte source producing this entity's payload.
    fn open(&self) -> BoxedSource;
}

fn tag_char_legal(c: u8) -> bool {
    // RFC 7232 etagc: %x21 / %x23-7E / obs-text
    c == 0x21 || (0x23..=0x7e).contains(&c) || c >= 0x80
}

/// An entity tag, defined in RFC 7232 §2.3.
///
/// The opaque tag is kept unquoted; `Display` adds the surrounding DQUOTEs
/// and the `W/` prefix for weak tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTag {
    weak: bool,
    tag: String,
}

impl EntityTag {
    /// Constructs a new `EntityTag`, rejecting illegal tag characters.
    pub fn new(weak: bool, tag: impl Into<String>) -> Result<EntityTag, BuildError> {
        let tag = tag.into();
        if tag.bytes().all(tag_char_legal) {
            Ok(EntityTag { weak, tag })
        } else {
            Err(BuildError::InvalidEtag(tag))
        }
    }

    /// Constructs a new strong `EntityTag`.
    pub fn strong(tag: impl Into<String>) -> Result<EntityTag, BuildError> {
        EntityTag::new(false, tag)
    }

    /// Constructs a new weak `EntityTag`.
    pub fn weak(tag: impl Into<String>) -> Result<EntityTag, BuildError> {
        EntityTag::new(true, tag)
    }

    pub fn tag(&self) -> &str {
        self.tag.as_ref()
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub(crate) fn set_weak(&mut self, weak: bool) {
        self.weak = weak;
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.tag)
        } else {
            write!(f, "\"{}\"", self.tag)
        }
    }
}

/// Shadows selected metadata fields of a base entity.
///
/// Unshadowed fields delegate to the base; the payload source always comes
/// from the base. The response builder stages its `entity_*` mutations here
/// so the underlying entity stays shareable.
pub struct EntityOverlay {
    base: Rc<dyn Entity>,
    last_modified: Option<Option<SystemTime>>,
    expires: Option<Option<SystemTime>>,
    etag: Option<Option<EntityTag>>,
}

impl EntityOverlay {
    pub fn new(base: Rc<dyn Entity>) -> EntityOverlay {
        EntityOverlay {
            base,
            last_modified: None,
            expires: None,
            etag: None,
        }
    }

    pub(crate) fn set_last_modified(&mut self, when: Option<SystemTime>) {
        self.last_modified = Some(when);
    }

    pub(crate) fn set_expires(&mut self, when: Option<SystemTime>) {
        self.expires = Some(when);
    }

    pub(crate) fn set_etag(&mut self, tag: Option<EntityTag>) {
        self.etag = Some(tag);
    }

    pub(crate) fn set_etag_weak(&mut self, weak: bool) {
        match &mut self.etag {
            Some(Some(tag)) => tag.set_weak(weak),
            Some(None) => {}
            None => {
                let mut tag = self.base.etag().cloned();
                if let Some(tag) = &mut tag {
                    tag.set_weak(weak);
                }
                self.etag = Some(tag);
            }
        }
    }
}

impl Entity for EntityOverlay {
    fn content_type(&self) -> Mime {
        self.base.content_type()
    }

    fn size(&self) -> BodySize {
        self.base.size()
    }

    fn last_modified(&self) -> Option<SystemTime> {
        match self.last_modified {
            Some(shadow) => shadow,
            None => self.base.last_modified(),
        }
    }

    fn expires(&self) -> Option<SystemTime> {
        match self.expires {
            Some(shadow) => shadow,
            None => self.base.expires(),
        }
    }

    fn etag(&self) -> Option<&EntityTag> {
        match &self.etag {
            Some(shadow) => shadow.as_ref(),
            None => self.base.etag(),
        }
    }

    fn open(&self) -> BoxedSource {
        self.base.open()
    }
}

/// In-memory entity backed by a [`Bytes`] payload.
pub struct BytesEntity {
    content_type: Mime,
    payload: Bytes,
    last_modified: Option<SystemTime>,
    expires: Option<SystemTime>,
    etag: Option<EntityTag>,
}

impl BytesEntity {
    pub fn new(content_type: Mime, payload: impl Into<Bytes>) -> BytesEntity {
        BytesEntity {
            content_type,
            payload: payload.into(),
            last_modified: None,
            expires: None,
            etag: None,
        }
    }

    pub fn last_modified(mut self, when: SystemTime) -> Self {
        self.last_modified = Some(when);
        self
    }

    pub fn expires(mut self, when: SystemTime) -> Self {
        self.expires = Some(when);
        self
    }

    pub fn etag(mut self, tag: EntityTag) -> Self {
        self.etag = Some(tag);
        self
    }
}

impl Entity for BytesEntity {
    fn content_type(&self) -> Mime {
        self.content_type.clone()
    }

    fn size(&self) -> BodySize {
        BodySize::Sized(self.payload.len() as u64)
    }

    fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    fn etag(&self) -> Option<&EntityTag> {
        self.etag.as_ref()
    }

    fn open(&self) -> BoxedSource {
        boxed(self.payload.clone())
    }
}
