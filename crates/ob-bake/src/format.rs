//! Content sniffing. File extensions are never consulted.

/// The eight-byte PNG signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// Image container formats that can carry a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// PNG.
    Png,
    /// SVG.
    Svg,
}

impl ImageFormat {
    /// MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
        }
    }
}

/// Identify the container from its leading bytes.
///
/// PNG by magic number; SVG by a leading `<svg`, `<?xml`, or `<!--`, after
/// an optional UTF-8 BOM and whitespace.
pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        return Some(ImageFormat::Png);
    }
    if is_svg(bytes) {
        return Some(ImageFormat::Svg);
    }
    None
}

/// Whether the bytes look like an SVG document.
pub fn is_svg(bytes: &[u8]) -> bool {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let head = &body[start..];
    head.starts_with(b"<svg") || head.starts_with(b"<?xml") || head.starts_with(b"<!--")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_by_content() {
        assert_eq!(sniff(&PNG_SIGNATURE), Some(ImageFormat::Png));
        assert_eq!(sniff(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"), Some(ImageFormat::Svg));
        assert_eq!(sniff(b"\xef\xbb\xbf  \n<?xml version=\"1.0\"?><svg/>"), Some(ImageFormat::Svg));
        assert_eq!(sniff(b"GIF89a"), None);
        assert_eq!(sniff(b""), None);
        assert_eq!(sniff(b"   "), None);
    }
}
