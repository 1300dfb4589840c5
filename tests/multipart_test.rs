//! Multipart encoding integration tests.
//!
//! Covers:
//! - The name + photo upload end to end
//! - Decoding recovers fields in insertion order
//! - Boundaries never occur inside part content
//! - Attachments read from disk

use bytes::Bytes;
use stacknet::base::neterror::NetError;
use stacknet::http::multipart::{self, Form, Part, DEFAULT_ATTACHMENT_FIELD};
use std::io::Write;

const PHOTO: &[u8; 17] = b"\xff\xd8\xff\xe0JFIF-bytes\xff\xd9\x00";

#[test]
fn test_name_and_photo_upload() {
    let body = Form::new()
        .text("name", "Alice")
        .unwrap()
        .file("photo.jpg", "image/jpeg", Bytes::from_static(PHOTO))
        .unwrap()
        .build()
        .unwrap();

    let (bytes, content_type) = body.encode();
    assert_eq!(
        content_type,
        format!("multipart/form-data; boundary={}", body.boundary())
    );
    assert_eq!(bytes.len(), body.content_length());

    let parts = multipart::decode(&content_type, &bytes).unwrap();
    assert_eq!(parts.len(), 2);

    assert_eq!(parts[0].name, "name");
    assert_eq!(parts[0].data, "Alice");
    assert_eq!(parts[0].content_type.as_deref(), Some("text/plain"));
    assert!(parts[0].file_name.is_none());

    assert_eq!(parts[1].name, DEFAULT_ATTACHMENT_FIELD);
    assert_eq!(parts[1].file_name.as_deref(), Some("photo.jpg"));
    assert_eq!(parts[1].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(parts[1].data.len(), 17);
    assert_eq!(&parts[1].data[..], &PHOTO[..]);
}

#[test]
fn test_wire_format() {
    let body = Form::new().text("a", "1").unwrap().build().unwrap();
    let b = body.boundary().to_string();
    let (bytes, _) = body.encode();

    let expected = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"a\"\r\nContent-Type: text/plain\r\n\r\n1\r\n--{b}--\r\n"
    );
    assert_eq!(bytes, expected.as_bytes());
}

#[test]
fn test_decode_preserves_insertion_order() {
    let fields = vec![("zeta", "last letter"), ("alpha", "first"), ("mid", "")];
    let body = Form::new()
        .texts(fields.clone())
        .unwrap()
        .attachment("avatar", "me.png", "image/png", vec![0u8, 1, 2, 3])
        .unwrap()
        .attachment("resume", "cv.pdf", "application/pdf", "%PDF-1.4")
        .unwrap()
        .build()
        .unwrap();

    let (bytes, content_type) = body.encode();
    let parts = multipart::decode(&content_type, &bytes).unwrap();

    let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["zeta", "alpha", "mid", "avatar", "resume"]);
    for (part, (_, value)) in parts.iter().zip(&fields) {
        assert_eq!(part.data, value.as_bytes());
    }
    assert_eq!(parts[3].file_name.as_deref(), Some("me.png"));
    assert_eq!(parts[4].content_type.as_deref(), Some("application/pdf"));
}

#[test]
fn test_boundary_absent_from_content() {
    // Content that embeds the boundary prefix cannot collide with the
    // generated boundary.
    let hostile = "----stacknet-boundary-0000 and --\r\n-- more";
    let body = Form::new()
        .text("trap", hostile)
        .unwrap()
        .part(Part::new("blob", Bytes::from(hostile.repeat(64))))
        .unwrap()
        .build()
        .unwrap();

    let boundary = body.boundary().as_bytes();
    for part in body.parts() {
        assert!(!part
            .data
            .windows(boundary.len())
            .any(|window| window == boundary));
    }
    assert!(body.boundary().len() <= 70);
}

#[test]
fn test_each_build_gets_fresh_boundary() {
    let form = Form::new().text("k", "v").unwrap();
    let first = form.build().unwrap();
    let second = form.build().unwrap();
    assert_ne!(first.boundary(), second.boundary());

    let (a, _) = first.encode();
    let (b, _) = second.encode();
    let normalized = String::from_utf8(b.to_vec())
        .unwrap()
        .replace(second.boundary(), first.boundary());
    assert_eq!(a, normalized.as_bytes());
}

#[test]
fn test_attachment_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"on disk").unwrap();

    let body = Form::new()
        .attachment("doc", "notes.txt", "text/plain", file.path())
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(body.parts()[0].data, "on disk");
}

#[test]
fn test_unreadable_attachment_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.bin");

    let err = Form::new()
        .file("gone.bin", "application/octet-stream", missing.as_path())
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, NetError::BodySerialization { .. }));
}

#[test]
fn test_invalid_names_rejected() {
    assert!(matches!(
        Form::new().text("bad\"name", "v"),
        Err(NetError::Encoding { .. })
    ));
    assert!(matches!(
        Form::new().file("evil\r\nX-Injected: 1", "text/plain", "x"),
        Err(NetError::Encoding { .. })
    ));
}

#[test]
fn test_empty_form_rejected() {
    assert!(matches!(Form::new().build(), Err(NetError::Encoding { .. })));
}
