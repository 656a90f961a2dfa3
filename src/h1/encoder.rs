//! Response head serialization.

use bytes::{BufMut, BytesMut};

use crate::body::BodySize;
use crate::entity::Entity;
use crate::helpers::{write_header_line, write_status_line};
use crate::response::Response;

const AVERAGE_HEADER_SIZE: usize = 30;

/// Serialize the head block of `res`: status line, headers in insertion
/// order, entity-derived headers, one `Set-Cookie` line per cookie in list
/// order, then the empty line.
///
/// Names and values were validated when set; everything here is written
/// verbatim as Latin-1/ASCII octets.
pub(crate) fn encode_head(res: &Response, dst: &mut BytesMut) {
    let head = res.head();
    let reason = head.reason().as_bytes();
    dst.reserve(256 + head.headers.len() * AVERAGE_HEADER_SIZE + reason.len());

    write_status_line(head.version, head.status.as_u16(), dst);
    dst.put_slice(reason);
    dst.put_slice(b"\r\n");

    for (name, value) in head.headers.iter() {
        write_header_line(name.as_str().as_bytes(), value.as_bytes(), dst);
    }

    if let Some(entity) = res.entity() {
        encode_entity_headers(entity, dst);
    }

    for line in res.cookies().encoded() {
        write_header_line(b"set-cookie", line.as_bytes(), dst);
    }

    dst.put_slice(b"\r\n");
}

fn encode_entity_headers(entity: &dyn Entity, dst: &mut BytesMut) {
    write_header_line(
        b"content-type",
        entity.content_type().as_ref().as_bytes(),
        dst,
    );

    if let BodySize::Sized(len) = entity.size() {
        let mut digits = itoa::Buffer::new();
        write_header_line(b"content-length", digits.format(len).as_bytes(), dst);
    }

    if let Some(tag) = entity.etag() {
        write_header_line(b"etag", tag.to_string().as_bytes(), dst);
    }

    if let Some(when) = entity.last_modified() {
        write_header_line(b"last-modified", httpdate::fmt_http_date(when).as_bytes(), dst);
    }

    if let Some(when) = entity.expires() {
        write_header_line(b"expires", httpdate::fmt_http_date(when).as_bytes(), dst);
    }
}
