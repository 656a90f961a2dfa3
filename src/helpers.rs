use bytes::BufMut;
use http::Version;

pub(crate) fn write_status_line<B: BufMut>(version: Version, n: u16, buf: &mut B) {
    match version {
        Version::HTTP_10 => buf.put_slice(b"HTTP/1.0 "),
        // requests that never parsed a version are answered as 1.1
        _ => buf.put_slice(b"HTTP/1.1 "),
    }

    let mut digits = itoa::Buffer::new();
    buf.put_slice(digits.format(n).as_bytes());
    buf.put_u8(b' ');
}

pub(crate) fn write_header_line<B: BufMut>(name: &[u8], value: &[u8], buf: &mut B) {
    buf.put_slice(name);
    buf.put_slice(b": ");
    buf.put_slice(value);
    buf.put_slice(b"\r\n");
}
