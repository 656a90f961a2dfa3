//! Asynchronous byte sources for response bodies.

mod size;
mod source;
mod stream;

pub use self::size::BodySize;
pub use self::source::{boxed, BoxedSource, ByteSource};
pub use self::stream::SourceStream;
