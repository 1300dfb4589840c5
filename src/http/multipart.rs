//! Multipart form data support.
//!
//! Provides RFC 2046 / RFC 7578 multipart/form-data encoding for text fields
//! and file uploads, plus a decoder for reading such bodies back.
//!
//! # Example
//! ```ignore
//! use stacknet::http::multipart::Form;
//!
//! let body = Form::new()
//!     .text("username", "user123")?
//!     .attachment("avatar", "me.png", "image/png", png_bytes)?
//!     .build()?;
//!
//! let (bytes, content_type) = body.encode();
//! ```
//!
//! # Boundaries
//!
//! [`Form::build`] picks a fresh boundary on every call and caches it in the
//! returned [`MultipartBody`]; encoding the same body twice yields identical
//! bytes. A candidate boundary that occurs anywhere in a part's content is
//! discarded and a new one generated.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::http::requestbody::RequestBody;
use bytes::{BufMut, Bytes, BytesMut};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Field name used by [`Form::file`].
pub const DEFAULT_ATTACHMENT_FIELD: &str = "file";

/// Media type of text fields.
pub const TEXT_PLAIN: &str = "text/plain";

/// RFC 2046 limits boundaries to 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

/// Attempts at finding a boundary absent from every part.
const MAX_BOUNDARY_ATTEMPTS: usize = 32;

const BOUNDARY_PREFIX: &str = "----stacknet-boundary-";

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content of a part before the form is built.
#[derive(Debug, Clone)]
pub enum PartContent {
    /// In-memory bytes.
    Bytes(Bytes),
    /// A file read when the form is built.
    Path(PathBuf),
}

impl From<Bytes> for PartContent {
    fn from(b: Bytes) -> Self {
        PartContent::Bytes(b)
    }
}

impl From<Vec<u8>> for PartContent {
    fn from(v: Vec<u8>) -> Self {
        PartContent::Bytes(Bytes::from(v))
    }
}

impl From<&'static [u8]> for PartContent {
    fn from(s: &'static [u8]) -> Self {
        PartContent::Bytes(Bytes::from_static(s))
    }
}

impl From<String> for PartContent {
    fn from(s: String) -> Self {
        PartContent::Bytes(Bytes::from(s))
    }
}

impl From<&str> for PartContent {
    fn from(s: &str) -> Self {
        PartContent::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<PathBuf> for PartContent {
    fn from(p: PathBuf) -> Self {
        PartContent::Path(p)
    }
}

impl From<&std::path::Path> for PartContent {
    fn from(p: &std::path::Path) -> Self {
        PartContent::Path(p.to_path_buf())
    }
}

/// A part of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    content: PartContent,
}

impl Part {
    /// A `text/plain` field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: Some(TEXT_PLAIN.to_string()),
            content: PartContent::Bytes(Bytes::from(value.into())),
        }
    }

    /// A part with arbitrary content and no media type.
    pub fn new(name: impl Into<String>, content: impl Into<PartContent>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            content: content.into(),
        }
    }

    /// Set the content type.
    pub fn content_type(mut self, mime: impl Into<String>) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Set the file name.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), NetError> {
        if self.name.is_empty() {
            return Err(NetError::encoding("field name is empty"));
        }
        validate_quoted("field name", &self.name)?;
        if let Some(file_name) = &self.file_name {
            validate_quoted("file name", file_name)?;
        }
        if let Some(mime) = &self.content_type {
            if mime.contains(['\r', '\n']) {
                return Err(NetError::encoding("content type contains a line break"));
            }
        }
        Ok(())
    }
}

/// A multipart form under construction.
///
/// Parts keep insertion order. The form is consumed by value at each step so
/// a half-built form stays with the code building it.
#[derive(Debug, Clone, Default)]
pub struct Form {
    parts: Vec<Part>,
}

impl Form {
    /// Create a new empty form.
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Add a text field.
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Result<Self, NetError> {
        self.part(Part::text(name, value))
    }

    /// Add several text fields in iteration order.
    pub fn texts<I, K, V>(mut self, fields: I) -> Result<Self, NetError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in fields {
            self = self.text(name, value)?;
        }
        Ok(self)
    }

    /// Add a file attachment under `field_name`.
    pub fn attachment(
        self,
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<PartContent>,
    ) -> Result<Self, NetError> {
        self.part(
            Part::new(field_name, content)
                .file_name(file_name)
                .content_type(content_type),
        )
    }

    /// Add a file attachment under the [`DEFAULT_ATTACHMENT_FIELD`] name.
    pub fn file(
        self,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<PartContent>,
    ) -> Result<Self, NetError> {
        self.attachment(DEFAULT_ATTACHMENT_FIELD, file_name, content_type, content)
    }

    /// Add a custom part.
    pub fn part(mut self, part: Part) -> Result<Self, NetError> {
        part.validate()?;
        self.parts.push(part);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Read all content and fix a boundary.
    pub fn build(&self) -> Result<MultipartBody, NetError> {
        self.build_with(generate_boundary)
    }

    fn build_with<G>(&self, generator: G) -> Result<MultipartBody, NetError>
    where
        G: FnMut() -> String,
    {
        if self.parts.is_empty() {
            return Err(NetError::encoding("form has no parts"));
        }

        let parts = self
            .parts
            .iter()
            .map(|part| {
                let data = match &part.content {
                    PartContent::Bytes(b) => b.clone(),
                    PartContent::Path(path) => Bytes::from(std::fs::read(path).body_context()?),
                };
                Ok(EncodedPart {
                    name: part.name.clone(),
                    file_name: part.file_name.clone(),
                    content_type: part.content_type.clone(),
                    data,
                })
            })
            .collect::<Result<Vec<_>, NetError>>()?;

        let boundary = choose_boundary(&parts, generator)?;
        tracing::debug!(parts = parts.len(), boundary = %boundary, "multipart form built");

        Ok(MultipartBody { boundary, parts })
    }
}

/// A part whose content has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl EncodedPart {
    /// Header block of the part, without the blank line.
    fn format_headers(&self) -> String {
        let mut header = format!("Content-Disposition: form-data; name=\"{}\"", self.name);

        if let Some(ref filename) = self.file_name {
            header.push_str(&format!("; filename=\"{}\"", filename));
        }

        if let Some(ref mime) = self.content_type {
            header.push_str(&format!("\r\nContent-Type: {}", mime));
        }

        header
    }
}

/// An immutable, fully read multipart body.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<EncodedPart>,
}

impl MultipartBody {
    /// Get the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[EncodedPart] {
        &self.parts
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact length of the encoded body.
    pub fn content_length(&self) -> usize {
        let delimiter = 2 + self.boundary.len() + 2;
        let parts: usize = self
            .parts
            .iter()
            .map(|part| delimiter + part.format_headers().len() + 4 + part.data.len() + 2)
            .sum();

        // --boundary--\r\n
        parts + 2 + self.boundary.len() + 4
    }

    /// Serialize the body, returning it with its Content-Type value.
    pub fn encode(&self) -> (Bytes, String) {
        let mut output = BytesMut::with_capacity(self.content_length());

        for part in &self.parts {
            output.put_slice(b"--");
            output.put_slice(self.boundary.as_bytes());
            output.put_slice(b"\r\n");

            output.put_slice(part.format_headers().as_bytes());
            output.put_slice(b"\r\n\r\n");

            output.put_slice(&part.data);
            output.put_slice(b"\r\n");
        }

        output.put_slice(b"--");
        output.put_slice(self.boundary.as_bytes());
        output.put_slice(b"--\r\n");

        (output.freeze(), self.content_type())
    }

    /// Wrap the body for a request; bytes are encoded at dispatch.
    pub fn into_request_body(self) -> RequestBody {
        let content_type = self.content_type();
        let body = Arc::new(self);
        RequestBody::lazy(content_type, move || Ok(body.encode().0))
    }
}

/// A part read back from an encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Extract the boundary parameter from a multipart Content-Type value.
pub fn parse_boundary(content_type: &str) -> Result<String, NetError> {
    let mut params = content_type.split(';');
    let main = params.next().unwrap_or("").trim();
    if !main.eq_ignore_ascii_case("multipart/form-data") {
        return Err(NetError::encoding(format!("not multipart/form-data: {}", main)));
    }

    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"');
            if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
                return Err(NetError::encoding("invalid boundary"));
            }
            return Ok(boundary.to_string());
        }
    }

    Err(NetError::encoding("missing boundary"))
}

/// Parse an encoded multipart/form-data body into its parts, in order.
pub fn decode(content_type: &str, body: &[u8]) -> Result<Vec<DecodedPart>, NetError> {
    let boundary = parse_boundary(content_type)?;
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut close = b"\r\n".to_vec();
    close.extend_from_slice(&delimiter);

    let mut pos = find(body, &delimiter, 0)
        .ok_or_else(|| NetError::encoding("opening boundary not found"))?
        + delimiter.len();

    let mut parts = Vec::new();
    loop {
        if body[pos..].starts_with(b"--") {
            return Ok(parts);
        }
        if !body[pos..].starts_with(b"\r\n") {
            return Err(NetError::encoding("boundary not followed by CRLF"));
        }
        pos += 2;

        let headers_end = find(body, b"\r\n\r\n", pos)
            .ok_or_else(|| NetError::encoding("unterminated part headers"))?;
        let headers = std::str::from_utf8(&body[pos..headers_end])
            .map_err(|_| NetError::encoding("part headers are not UTF-8"))?;
        let (name, file_name, content_type) = parse_part_headers(headers)?;

        let data_start = headers_end + 4;
        let data_end = find(body, &close, data_start)
            .ok_or_else(|| NetError::encoding("unterminated part content"))?;

        parts.push(DecodedPart {
            name,
            file_name,
            content_type,
            data: Bytes::copy_from_slice(&body[data_start..data_end]),
        });
        pos = data_end + close.len();
    }
}

type PartHeaders = (String, Option<String>, Option<String>);

fn parse_part_headers(block: &str) -> Result<PartHeaders, NetError> {
    let mut disposition = None;
    let mut content_type = None;

    for line in block.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            return Err(NetError::encoding(format!("malformed part header: {}", line)));
        };
        let value = value.trim();
        if key.trim().eq_ignore_ascii_case("content-disposition") {
            disposition = Some(value);
        } else if key.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    let disposition =
        disposition.ok_or_else(|| NetError::encoding("part without Content-Disposition"))?;
    let mut params = disposition.split(';');
    if !params.next().unwrap_or("").trim().eq_ignore_ascii_case("form-data") {
        return Err(NetError::encoding("disposition is not form-data"));
    }

    let mut name = None;
    let mut file_name = None;
    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(value),
            "filename" => file_name = Some(value),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| NetError::encoding("part without a name"))?;
    Ok((name, file_name, content_type))
}

/// Reject characters a quoted disposition parameter cannot carry unescaped.
fn validate_quoted(what: &str, value: &str) -> Result<(), NetError> {
    if value.contains('"') {
        return Err(NetError::encoding(format!("{} contains a double quote", what)));
    }
    if value.contains(['\r', '\n']) {
        return Err(NetError::encoding(format!("{} contains a line break", what)));
    }
    Ok(())
}

fn choose_boundary<G>(parts: &[EncodedPart], mut generator: G) -> Result<String, NetError>
where
    G: FnMut() -> String,
{
    for _ in 0..MAX_BOUNDARY_ATTEMPTS {
        let candidate = generator();
        let collides = parts
            .iter()
            .any(|part| find(&part.data, candidate.as_bytes(), 0).is_some());
        if !collides {
            return Ok(candidate);
        }
        tracing::debug!(boundary = %candidate, "boundary found in part content, regenerating");
    }
    Err(NetError::encoding("no collision-free boundary found"))
}

/// Generate a boundary from the clock, the process id and a counter.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let count = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);

    format!(
        "{}{:016x}{:08x}{:08x}",
        BOUNDARY_PREFIX,
        nanos,
        std::process::id(),
        count as u32
    )
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() || haystack.len() - from < needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_str(body: &MultipartBody) -> String {
        String::from_utf8(body.encode().0.to_vec()).unwrap()
    }

    #[test]
    fn test_empty_form_fails() {
        let err = Form::new().build().unwrap_err();
        assert!(matches!(err, NetError::Encoding { .. }));
    }

    #[test]
    fn test_text_field() {
        let body = Form::new().text("name", "value").unwrap().build().unwrap();
        let b = body.boundary().to_string();

        assert_eq!(
            body_str(&body),
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\
                 Content-Type: text/plain\r\n\r\nvalue\r\n--{b}--\r\n"
            )
        );
    }

    #[test]
    fn test_file_part() {
        let body = Form::new()
            .attachment("upload", "test.txt", "text/plain", b"file data".as_slice())
            .unwrap()
            .build()
            .unwrap();

        let s = body_str(&body);
        assert!(s.contains("Content-Disposition: form-data; name=\"upload\"; filename=\"test.txt\"\r\n"));
        assert!(s.contains("Content-Type: text/plain\r\n\r\nfile data\r\n"));
    }

    #[test]
    fn test_file_uses_default_field_name() {
        let body = Form::new()
            .file("a.bin", "application/octet-stream", b"x".as_slice())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(body.parts()[0].name, DEFAULT_ATTACHMENT_FIELD);
    }

    #[test]
    fn test_part_without_content_type() {
        let body = Form::new()
            .part(Part::new("raw", b"abc".as_slice()))
            .unwrap()
            .build()
            .unwrap();
        assert!(!body_str(&body).contains("Content-Type"));
    }

    #[test]
    fn test_boundary_format() {
        let body = Form::new().text("a", "b").unwrap().build().unwrap();
        assert!(body.boundary().starts_with(BOUNDARY_PREFIX));
        assert!(body.boundary().len() <= MAX_BOUNDARY_LEN);
        assert_eq!(
            body.content_type(),
            format!("multipart/form-data; boundary={}", body.boundary())
        );
    }

    #[test]
    fn test_content_length() {
        let body = Form::new()
            .text("key", "value")
            .unwrap()
            .attachment("f", "f.bin", "application/octet-stream", vec![0u8; 300])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(body.content_length(), body.encode().0.len());
    }

    #[test]
    fn test_rejects_quote_and_crlf_in_name() {
        assert!(Form::new().text("bad\"name", "v").is_err());
        assert!(Form::new().text("bad\r\nname", "v").is_err());
        assert!(Form::new().text("bad\nname", "v").is_err());
        assert!(Form::new().text("", "v").is_err());
    }

    #[test]
    fn test_rejects_quote_in_file_name() {
        let result = Form::new().attachment("f", "a\"b.txt", "text/plain", b"x".as_slice());
        assert!(matches!(result, Err(NetError::Encoding { .. })));
    }

    #[test]
    fn test_texts_keeps_order() {
        let body = Form::new()
            .texts(vec![("z", "1"), ("a", "2"), ("m", "3")])
            .unwrap()
            .build()
            .unwrap();
        let names: Vec<_> = body.parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_boundary_collision_regenerates() {
        let form = Form::new()
            .attachment("f", "f.txt", "text/plain", b"xx--taken--xx".as_slice())
            .unwrap();

        let mut candidates = vec!["fresh".to_string(), "taken".to_string()];
        let body = form.build_with(|| candidates.pop().unwrap()).unwrap();

        assert_eq!(body.boundary(), "fresh");
    }

    #[test]
    fn test_boundary_collision_gives_up() {
        let form = Form::new().text("f", "always").unwrap();
        let err = form.build_with(|| "always".to_string()).unwrap_err();
        assert!(matches!(err, NetError::Encoding { .. }));
    }

    #[test]
    fn test_build_twice_differs_only_in_boundary() {
        let form = Form::new()
            .text("a", "1")
            .unwrap()
            .file("x.bin", "application/octet-stream", b"\x00\x01".as_slice())
            .unwrap();

        let first = form.build().unwrap();
        let second = form.build().unwrap();
        assert_ne!(first.boundary(), second.boundary());

        let a = body_str(&first).replace(first.boundary(), "B");
        let b = body_str(&second).replace(second.boundary(), "B");
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let body = Form::new().text("a", "1").unwrap().build().unwrap();
        assert_eq!(body.encode(), body.encode());
    }

    #[test]
    fn test_path_content_read_at_build() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.txt");
        std::fs::write(&path, b"from disk").unwrap();

        let body = Form::new()
            .file("upload.txt", "text/plain", path.as_path())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(body.parts()[0].data, Bytes::from_static(b"from disk"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let form = Form::new()
            .file("gone.txt", "text/plain", PathBuf::from("/nonexistent/gone.txt"))
            .unwrap();
        assert!(matches!(form.build(), Err(NetError::BodySerialization { .. })));
    }

    #[test]
    fn test_decode_roundtrip() {
        let body = Form::new()
            .text("name", "Alice")
            .unwrap()
            .attachment("photo", "p.jpg", "image/jpeg", b"\r\n--not-a-boundary\r\n".as_slice())
            .unwrap()
            .build()
            .unwrap();
        let (bytes, content_type) = body.encode();

        let parts = decode(&content_type, &bytes).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "name");
        assert_eq!(parts[0].data, Bytes::from_static(b"Alice"));
        assert_eq!(parts[1].file_name.as_deref(), Some("p.jpg"));
        assert_eq!(parts[1].content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(parts[1].data, Bytes::from_static(b"\r\n--not-a-boundary\r\n"));
    }

    #[test]
    fn test_parse_boundary() {
        assert_eq!(
            parse_boundary("multipart/form-data; boundary=\"abc\"").unwrap(),
            "abc"
        );
        assert!(parse_boundary("text/plain; boundary=abc").is_err());
        assert!(parse_boundary("multipart/form-data").is_err());
    }

    #[test]
    fn test_into_request_body() {
        let body = Form::new().text("a", "1").unwrap().build().unwrap();
        let expected = body.encode();

        let request_body = body.into_request_body();
        assert_eq!(request_body.content_type(), Some(expected.1.as_str()));
        assert_eq!(request_body.materialize().unwrap(), expected.0);
    }
}
