#![allow(missing_docs)]

use std::{io::Read, sync::Arc, thread};

use multipull::{CodecError, Error, ParseOptions, TransferCodec};

mod common;
use common::{BOUNDARY, build_stream, cut_after, parse, part, part_with_headers};

fn two_part_stream() -> Vec<u8> {
    build_stream(
        BOUNDARY,
        &[part("one@host", b"first"), part("two@host", b"second")],
    )
}

#[test]
fn index_and_identifier_lookups_return_the_same_part() {
    let message = parse(two_part_stream(), ParseOptions::default());
    message.parse_all().unwrap();

    let by_index = message.part_at(1).unwrap();
    let by_id = message.part_by_id("two@host").unwrap();
    assert_eq!(by_index, by_id);
    assert_eq!(by_index.decoded().unwrap(), b"second");
}

#[test]
fn identifier_placeholder_fills_in_as_parsing_proceeds() {
    let message = parse(two_part_stream(), ParseOptions::default());

    // Requested before any parsing has happened.
    let pending = message.part_by_id("two@host").unwrap();
    assert_eq!(pending.decoded().unwrap(), b"second");

    // The placeholder and the parsed part are one object.
    assert_eq!(pending, message.part_at(1).unwrap());
}

#[test]
fn index_placeholders_may_skip_ahead() {
    let message = parse(two_part_stream(), ParseOptions::default());

    let second = message.part_at(1).unwrap();
    assert_eq!(second.decoded().unwrap(), b"second");
    let first = message.part_at(0).unwrap();
    assert_eq!(first.decoded().unwrap(), b"first");
    assert_eq!(first.content_id().unwrap(), "one@host");
}

#[test]
fn reading_parts_lazily_stops_at_their_data() {
    let message = parse(two_part_stream(), ParseOptions::default());
    let first = message.part_at(0).unwrap();
    assert_eq!(first.decoded().unwrap(), b"first");
    // Only as much of the stream as the first part needed was consumed.
    assert!(!message.is_fully_parsed());
}

#[test]
fn conflicting_placeholders_raise_identity_conflict() {
    let message = parse(two_part_stream(), ParseOptions::default());

    let _by_index = message.part_at(0).unwrap();
    let _by_id = message.part_by_id("one@host").unwrap();

    let err = message.parse_all().unwrap_err();
    assert!(matches!(
        err,
        Error::IdentityConflict { index: 0, content_id } if content_id == "one@host"
    ));
}

#[test]
fn lookups_after_full_parse_reject_unknown_parts() {
    let message = parse(two_part_stream(), ParseOptions::default());
    message.parse_all().unwrap();

    assert!(matches!(
        message.part_at(3).unwrap_err(),
        Error::PartNotFound(_)
    ));
    assert!(matches!(
        message.part_by_id("ghost@host").unwrap_err(),
        Error::PartNotFound(_)
    ));
}

#[test]
fn unresolved_index_placeholders_do_not_count_as_parts() {
    let message = parse(two_part_stream(), ParseOptions::default());

    // Requested optimistically before parsing; the stream only has two.
    let ghost = message.part_at(3).unwrap();

    assert_eq!(message.all_parts().unwrap().len(), 2);
    assert!(matches!(
        message.part_at(3).unwrap_err(),
        Error::PartNotFound(_)
    ));
    assert!(matches!(
        ghost.headers().unwrap_err(),
        Error::InternalInvariant(_)
    ));
}

#[test]
fn reading_a_never_materialized_placeholder_is_an_internal_invariant() {
    let message = parse(two_part_stream(), ParseOptions::default());
    let ghost = message.part_by_id("ghost@host").unwrap();
    let err = ghost.headers().unwrap_err();
    assert!(matches!(err, Error::InternalInvariant(_)));
}

#[test]
fn identifier_lookup_percent_decodes_on_miss() {
    let message = parse(two_part_stream(), ParseOptions::default());
    message.parse_all().unwrap();

    let p = message.part_by_id("one%40host").unwrap();
    assert_eq!(p.decoded().unwrap(), b"first");
}

#[test]
fn eager_parsing_drains_at_construction() {
    let options = ParseOptions {
        parse_eagerly: true,
        ..Default::default()
    };
    let message = parse(two_part_stream(), options);
    assert!(message.is_fully_parsed());
    assert_eq!(message.all_parts().unwrap().len(), 2);
}

#[test]
fn close_is_idempotent_and_safe_after_a_failed_parse() {
    let mut stream = build_stream(BOUNDARY, &[part("a@host", b"0123456789")]);
    cut_after(&mut stream, b"0123456789", 3);
    let options = ParseOptions {
        enable_partial: false,
        ..Default::default()
    };
    let message = parse(stream, options);
    assert!(message.all_parts().is_err());

    message.close();
    message.close();
}

#[test]
fn closing_releases_part_content() {
    let message = parse(two_part_stream(), ParseOptions::default());
    let p = message.part_at(0).unwrap();
    assert_eq!(p.decoded().unwrap(), b"first");
    assert!(!p.is_closed());

    p.close();
    assert!(p.is_closed());
    p.close();
    assert!(p.is_closed());
}

#[test]
fn header_lookup_is_ordered_and_case_insensitive() {
    let stream = build_stream(
        BOUNDARY,
        &[part_with_headers(
            &["X-Tag: one", "x-tag: two", "Content-ID: <h@host>"],
            b"x",
        )],
    );
    let message = parse(stream, ParseOptions::default());

    let p = message.part_by_id("h@host").unwrap();
    assert_eq!(
        p.header("X-TAG").unwrap(),
        Some(vec!["one".to_string(), "two".to_string()])
    );
    assert_eq!(p.header("missing").unwrap(), None);
}

struct Reverse;

impl TransferCodec for Reverse {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(input.iter().rev().copied().collect())
    }
}

#[test]
fn registered_codec_decodes_part_content() {
    let stream = build_stream(
        BOUNDARY,
        &[part_with_headers(
            &["Content-Transfer-Encoding: x-reverse"],
            b"fedcba",
        )],
    );
    let message = parse(stream, ParseOptions::default());
    message.register_codec("x-reverse", Arc::new(Reverse));

    let p = message.part_at(0).unwrap();
    assert_eq!(p.decoded().unwrap(), b"abcdef");

    // The readable stream sees the same decoded bytes.
    let mut decoded = Vec::new();
    p.read().unwrap().read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, b"abcdef");
}

#[test]
fn unregistered_encoding_is_rejected_but_raw_bytes_remain() {
    let stream = build_stream(
        BOUNDARY,
        &[part_with_headers(
            &["Content-Transfer-Encoding: base64"],
            b"aGVsbG8=",
        )],
    );
    let message = parse(stream, ParseOptions::default());

    let p = message.part_at(0).unwrap();
    let err = p.decoded().unwrap_err();
    assert!(matches!(err, Error::UnsupportedEncoding(name) if name == "base64"));
    assert_eq!(p.raw_content().unwrap(), b"aGVsbG8=");
}

#[test]
fn concurrent_readers_of_different_parts_both_complete() {
    let bodies: Vec<Vec<u8>> = (0u8..4).map(|i| vec![b'a' + i, b'-'].repeat(25_000)).collect();
    let specs: Vec<_> = bodies
        .iter()
        .enumerate()
        .map(|(i, body)| part(&format!("c{i}@host"), body))
        .collect();
    let options = ParseOptions {
        chunk_size: 512,
        ..Default::default()
    };
    let message = Arc::new(parse(build_stream(BOUNDARY, &specs), options));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let message = Arc::clone(&message);
            thread::spawn(move || message.part_at(i).unwrap().decoded().unwrap())
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), bodies[i]);
    }
}
