//! # SVG Baking
//!
//! The badge is an `<openbadges:assertion verify="...">` element holding the
//! document in CDATA, inserted as the first child of the root `<svg>`. The
//! root gains `xmlns:openbadges="http://openbadges.org"` if it lacks it.
//!
//! The document is streamed through a real XML event parser and re-emitted
//! event by event, so nothing outside the root start tag and the inserted
//! element changes. A previous assertion element in the Open Badges
//! namespace is dropped; `assertion` elements of other vocabularies are
//! kept. A payload containing `]]>` is split across adjacent CDATA sections.
//!
//! Extraction prefers an element in the Open Badges namespace and falls
//! back to any element whose local name is `assertion`.

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;

use crate::error::BakeError;

/// Namespace of the assertion element.
pub const OPENBADGES_NAMESPACE: &str = "http://openbadges.org";

const PREFIX: &[u8] = b"openbadges";
const ASSERTION_ELEMENT: &str = "openbadges:assertion";
const NAMESPACE_ATTR: &str = "xmlns:openbadges";
const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// What an assertion element carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgAssertion {
    /// The `verify` attribute.
    pub verify: Option<String>,
    /// Concatenated CDATA and text content.
    pub content: String,
}

/// Insert the assertion element. `payload = None` writes an empty element
/// carrying only `verify` (hosted baking).
pub fn bake_svg(image: &[u8], payload: Option<&str>, verify: &str) -> Result<Vec<u8>, BakeError> {
    let text = as_utf8(image)?;
    let mut reader = NsReader::from_str(text);
    let mut writer = Writer::new(Vec::with_capacity(image.len() + payload.map_or(0, str::len) + 128));

    let mut depth = 0usize;
    let mut root_done = false;
    let mut skip_until: Option<usize> = None;

    loop {
        let (ns, event) = reader.read_resolved_event().map_err(malformed)?;
        let ours = is_openbadges(&ns);

        if let Some(stop) = skip_until {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == stop {
                        skip_until = None;
                    }
                }
                Event::Eof => return Err(BakeError::MalformedImage("unterminated assertion element".into())),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Start(e) if depth == 0 && !root_done => {
                let root = root_start(e)?;
                write(&mut writer, Event::Start(root))?;
                write_assertion(&mut writer, payload, verify)?;
                root_done = true;
                depth += 1;
            }
            Event::Empty(e) if depth == 0 && !root_done => {
                let name = String::from_utf8(e.name().as_ref().to_vec())
                    .map_err(|_| BakeError::MalformedImage("root element name is not UTF-8".into()))?;
                let root = root_start(e)?;
                write(&mut writer, Event::Start(root))?;
                write_assertion(&mut writer, payload, verify)?;
                write(&mut writer, Event::End(BytesEnd::new(name)))?;
                root_done = true;
            }
            Event::Start(e) if ours && is_assertion(&e) => {
                skip_until = Some(depth);
                depth += 1;
            }
            Event::Empty(e) if ours && is_assertion(&e) => {}
            Event::Start(e) => {
                depth += 1;
                write(&mut writer, Event::Start(e))?;
            }
            Event::End(e) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| BakeError::MalformedImage("unbalanced end tag".into()))?;
                write(&mut writer, Event::End(e))?;
            }
            other => write(&mut writer, other)?,
        }
    }

    if !root_done {
        return Err(BakeError::MalformedImage("no root element".into()));
    }
    tracing::debug!(payload_len = payload.map_or(0, str::len), "baked SVG");
    Ok(writer.into_inner())
}

/// Find the assertion element and return its content.
pub fn extract_svg(bytes: &[u8]) -> Result<SvgAssertion, BakeError> {
    let text = as_utf8(bytes)?;
    let mut reader = NsReader::from_str(text);
    let mut fallback = None;

    loop {
        let (ns, event) = reader.read_resolved_event().map_err(malformed)?;
        let ours = is_openbadges(&ns);
        let found = match event {
            Event::Eof => return fallback.ok_or(BakeError::NotFound),
            Event::Empty(e) if is_assertion(&e) => SvgAssertion {
                verify: verify_attr(&e)?,
                content: String::new(),
            },
            Event::Start(e) if is_assertion(&e) => {
                let verify = verify_attr(&e)?;
                let content = read_content(&mut reader)?;
                SvgAssertion { verify, content }
            }
            _ => continue,
        };
        if ours {
            return Ok(found);
        }
        fallback.get_or_insert(found);
    }
}

fn read_content(reader: &mut NsReader<&[u8]>) -> Result<String, BakeError> {
    let mut content = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::CData(c) => {
                let raw = c.into_inner();
                let s = std::str::from_utf8(&raw)
                    .map_err(|_| BakeError::InvalidPayload("CDATA is not UTF-8".into()))?;
                content.push_str(s);
            }
            Event::Text(t) => {
                let s = t.unescape().map_err(|e| BakeError::MalformedImage(e.to_string()))?;
                content.push_str(&s);
            }
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(content),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(BakeError::MalformedImage("unterminated assertion element".into())),
            _ => {}
        }
    }
}

fn root_start(e: BytesStart<'_>) -> Result<BytesStart<'static>, BakeError> {
    if e.local_name().as_ref() != b"svg" {
        return Err(BakeError::MalformedImage(format!(
            "root element is <{}>, not <svg>",
            String::from_utf8_lossy(e.name().as_ref())
        )));
    }
    let has_ns = e.try_get_attribute(NAMESPACE_ATTR).map_err(malformed)?.is_some();
    let mut root = e.into_owned();
    if !has_ns {
        root.push_attribute((NAMESPACE_ATTR, OPENBADGES_NAMESPACE));
    }
    Ok(root)
}

fn write_assertion(writer: &mut Writer<Vec<u8>>, payload: Option<&str>, verify: &str) -> Result<(), BakeError> {
    let mut start = BytesStart::new(ASSERTION_ELEMENT);
    start.push_attribute(("verify", verify));
    write(writer, Event::Start(start))?;
    if let Some(payload) = payload {
        for segment in cdata_segments(payload) {
            write(writer, Event::CData(BytesCData::new(segment)))?;
        }
    }
    write(writer, Event::End(BytesEnd::new(ASSERTION_ELEMENT)))
}

/// Split so no segment contains `]]>`; concatenated, the segments equal `payload`.
fn cdata_segments(payload: &str) -> Vec<String> {
    let parts: Vec<&str> = payload.split("]]>").collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let mut seg = String::with_capacity(part.len() + 3);
            if i > 0 {
                seg.push('>');
            }
            seg.push_str(part);
            if i < last {
                seg.push_str("]]");
            }
            seg
        })
        .collect()
}

fn is_assertion(e: &BytesStart<'_>) -> bool {
    e.local_name().as_ref() == b"assertion"
}

/// Bound to the Open Badges namespace, or carrying the conventional prefix
/// without any declaration.
fn is_openbadges(ns: &ResolveResult<'_>) -> bool {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => *uri == OPENBADGES_NAMESPACE.as_bytes(),
        ResolveResult::Unknown(prefix) => prefix.as_slice() == PREFIX,
        ResolveResult::Unbound => false,
    }
}

fn verify_attr(e: &BytesStart<'_>) -> Result<Option<String>, BakeError> {
    match e.try_get_attribute("verify").map_err(malformed)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(malformed)?.into_owned())),
        None => Ok(None),
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), BakeError> {
    writer.write_event(event).map_err(malformed)
}

fn as_utf8(bytes: &[u8]) -> Result<&str, BakeError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    std::str::from_utf8(body).map_err(|_| BakeError::MalformedImage("SVG is not UTF-8".into()))
}

fn malformed(e: impl std::fmt::Display) -> BakeError {
    BakeError::MalformedImage(e.to_string())
}
