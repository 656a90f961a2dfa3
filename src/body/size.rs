/// Body size hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySize {
    /// Absence of a body can be assumed from the status or method.
    None,

    /// Known size body; the framing layer advertised `Content-Length: N`.
    Sized(u64),

    /// Unknown size body; end-of-stream terminates it at any length.
    Stream,
}

impl BodySize {
    /// Returns true if the size hint indicates no or empty body.
    ///
    /// Streams return false because their length cannot be known without
    /// reading them out.
    ///
    /// ```
    /// # use oxbow_http::body::BodySize;
    /// assert!(BodySize::None.is_eof());
    /// assert!(BodySize::Sized(0).is_eof());
    ///
    /// assert!(!BodySize::Sized(64).is_eof());
    /// assert!(!BodySize::Stream.is_eof());
    /// ```
    pub fn is_eof(&self) -> bool {
        matches!(self, BodySize::None | BodySize::Sized(0))
    }
}
