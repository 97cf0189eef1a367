//! # ob-bake — Badge Baking
//!
//! Embeds a credential document (or a hosted URL) into a PNG or SVG image
//! and reads it back.
//!
//! - **PNG**: an `iTXt` chunk (or `tEXt` when the payload is ASCII) with
//!   keyword `openbadges`, inserted directly after `IHDR`.
//! - **SVG**: an `<openbadges:assertion>` element as the first child of the
//!   root `<svg>`.
//!
//! The container is identified by content sniffing, never by file name.
//! Baking replaces any previous badge, so re-baking is idempotent.
//!
//! ## Security Invariant
//!
//! Extraction validates every PNG chunk length against the remaining input
//! and every CRC before trusting a payload. Compressed text is inflated with
//! a size cap.

pub mod error;
pub mod format;
pub mod png;
pub mod svg;

use serde_json::Value;

pub use error::BakeError;
pub use format::{sniff, ImageFormat, PNG_SIGNATURE};
pub use svg::{SvgAssertion, OPENBADGES_NAMESPACE};

/// What was found inside a baked image.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedPayload {
    /// A full credential document.
    Document(Value),
    /// A URL to a hosted document (OB2 hosted baking).
    Reference(String),
}

impl EmbeddedPayload {
    /// The document's `id`, or the reference URL.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Document(doc) => doc.get("id").and_then(Value::as_str),
            Self::Reference(url) => Some(url),
        }
    }
}

/// Result of [`extract`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedBadge {
    /// Container the badge was found in.
    pub format: ImageFormat,
    /// Parsed payload.
    pub payload: EmbeddedPayload,
    /// The payload text exactly as embedded.
    pub raw: String,
}

/// Bake a credential document into an image.
///
/// `format` is optional; when given it must agree with the sniffed content.
/// For SVG the `verify` attribute is the document's `id`.
pub fn bake(image: &[u8], document: &Value, format: Option<ImageFormat>) -> Result<Vec<u8>, BakeError> {
    if !document.is_object() {
        return Err(BakeError::InvalidPayload("document must be a JSON object".into()));
    }
    let payload = serde_json::to_string(document).map_err(|e| BakeError::InvalidPayload(e.to_string()))?;
    match detect(image, format)? {
        ImageFormat::Png => png::bake_png(image, &payload),
        ImageFormat::Svg => {
            let verify = document.get("id").and_then(Value::as_str).unwrap_or_default();
            svg::bake_svg(image, Some(&payload), verify)
        }
    }
}

/// Bake only a hosted URL. PNG carries the URL as its text; SVG carries it
/// in `verify` with an empty body.
pub fn bake_reference(image: &[u8], url: &str, format: Option<ImageFormat>) -> Result<Vec<u8>, BakeError> {
    if !is_url(url) {
        return Err(BakeError::InvalidPayload(format!("not an http(s) URL: {url}")));
    }
    match detect(image, format)? {
        ImageFormat::Png => png::bake_png(image, url),
        ImageFormat::Svg => svg::bake_svg(image, None, url),
    }
}

/// Find and parse the badge in an image.
pub fn extract(bytes: &[u8]) -> Result<ExtractedBadge, BakeError> {
    let format = sniff(bytes).ok_or(BakeError::UnsupportedFormat)?;
    let raw = match format {
        ImageFormat::Png => png::extract_png(bytes)?,
        ImageFormat::Svg => {
            let found = svg::extract_svg(bytes)?;
            if found.content.trim().is_empty() {
                found.verify.ok_or(BakeError::NotFound)?
            } else {
                found.content
            }
        }
    };
    let payload = parse_payload(&raw)?;
    tracing::debug!(format = format.mime_type(), reference = matches!(payload, EmbeddedPayload::Reference(_)), "extracted badge");
    Ok(ExtractedBadge { format, payload, raw })
}

fn detect(image: &[u8], requested: Option<ImageFormat>) -> Result<ImageFormat, BakeError> {
    let sniffed = sniff(image).ok_or(BakeError::UnsupportedFormat)?;
    match requested {
        Some(f) if f != sniffed => Err(BakeError::MalformedImage(format!(
            "declared {} but content is {}",
            f.mime_type(),
            sniffed.mime_type()
        ))),
        _ => Ok(sniffed),
    }
}

fn parse_payload(raw: &str) -> Result<EmbeddedPayload, BakeError> {
    let text = raw.trim();
    if text.starts_with('{') {
        let value: Value = serde_json::from_str(text).map_err(|e| BakeError::InvalidPayload(e.to_string()))?;
        return Ok(EmbeddedPayload::Document(value));
    }
    if is_url(text) {
        return Ok(EmbeddedPayload::Reference(text.to_string()));
    }
    Err(BakeError::InvalidPayload("neither a JSON object nor an http(s) URL".into()))
}

fn is_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}
