#![allow(missing_docs)]
#![allow(dead_code)]

use std::io::Cursor;

use multipull::{Message, ParseOptions};

/// Boundary token shared by the integration suites.
pub const BOUNDARY: &str = "gc0p4Jq0M2Yt08j34c0p";

pub struct PartSpec {
    pub headers: Vec<String>,
    pub body: Vec<u8>,
}

/// A part with the usual header triple.
pub fn part(content_id: &str, body: &[u8]) -> PartSpec {
    PartSpec {
        headers: vec![
            format!("Content-ID: <{content_id}>"),
            "Content-Type: application/octet-stream".to_string(),
            "Content-Transfer-Encoding: binary".to_string(),
        ],
        body: body.to_vec(),
    }
}

/// A part with exactly the given header lines.
pub fn part_with_headers(headers: &[&str], body: &[u8]) -> PartSpec {
    PartSpec {
        headers: headers.iter().map(|h| (*h).to_string()).collect(),
        body: body.to_vec(),
    }
}

/// Assembles a complete multipart stream, preamble included.
pub fn build_stream(boundary: &str, parts: &[PartSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"This is the preamble; parsers discard it.\r\n");
    for spec in parts {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        for header in &spec.headers {
            out.extend_from_slice(header.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&spec.body);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    out
}

/// Truncates the stream `offset` bytes past the first occurrence of
/// `marker`.
pub fn cut_after(stream: &mut Vec<u8>, marker: &[u8], offset: usize) {
    let at = find(stream, marker).expect("marker not present in stream");
    stream.truncate(at + offset);
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub fn parse(stream: Vec<u8>, options: ParseOptions) -> Message {
    Message::new(Cursor::new(stream), BOUNDARY, options).expect("message construction")
}

#[test]
fn build_stream_shape() {
    let stream = build_stream("b", &[part("a", b"xyz")]);
    let text = String::from_utf8(stream).unwrap();
    assert!(text.contains("--b\r\nContent-ID: <a>\r\n"));
    assert!(text.contains("\r\n\r\nxyz\r\n"));
    assert!(text.ends_with("--b--\r\n"));
}
