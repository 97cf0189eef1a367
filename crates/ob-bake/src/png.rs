//! # PNG Baking
//!
//! A PNG is an 8-byte signature followed by chunks of
//! `length (u32 BE) | type (4 ASCII letters) | data | CRC32(type + data)`.
//! The badge rides in one `iTXt` chunk (or `tEXt` when the payload is
//! ASCII) with keyword `openbadges`, placed directly after `IHDR`.
//!
//! ## Invariants
//!
//! - Every other chunk is copied byte-for-byte; pixel data is never touched.
//!   Bytes trailing `IEND` are carried over unchanged.
//! - An existing `openbadges` text chunk is replaced, never duplicated.
//! - Every chunk's CRC is checked while iterating; a mismatch, a truncated
//!   chunk, or a missing `IEND` is `MalformedImage`.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::BakeError;
use crate::format::PNG_SIGNATURE;

/// Keyword of the badge text chunk.
pub const KEYWORD: &str = "openbadges";

/// Largest chunk length the PNG format allows.
const MAX_CHUNK_LEN: usize = 0x7fff_ffff;

/// Cap on a decompressed `iTXt`/`zTXt` payload.
const MAX_TEXT_LEN: u64 = 16 * 1024 * 1024;

/// One chunk, borrowed from the image.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    /// Four-letter type.
    pub chunk_type: [u8; 4],
    /// Chunk data.
    pub data: &'a [u8],
    /// The whole chunk: length, type, data, CRC.
    pub raw: &'a [u8],
}

/// Iterator over a PNG's chunks, validating each one.
///
/// Yields at most one error, then stops. Ends after `IEND`.
pub struct Chunks<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

/// Iterate the chunks after the signature.
pub fn chunks(bytes: &[u8]) -> Result<Chunks<'_>, BakeError> {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(BakeError::MalformedImage("missing PNG signature".into()));
    }
    Ok(Chunks {
        bytes,
        pos: PNG_SIGNATURE.len(),
        done: false,
    })
}

impl<'a> Chunks<'a> {
    /// Bytes not yet consumed. After `IEND` this is whatever trails the
    /// image.
    pub fn remainder(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    fn read_chunk(&mut self) -> Result<Chunk<'a>, BakeError> {
        let rest = &self.bytes[self.pos..];
        if rest.is_empty() {
            return Err(BakeError::MalformedImage("missing IEND chunk".into()));
        }
        if rest.len() < 12 {
            return Err(BakeError::MalformedImage(format!("truncated chunk header at byte {}", self.pos)));
        }
        let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        if len > MAX_CHUNK_LEN {
            return Err(BakeError::MalformedImage(format!("chunk length {len} exceeds PNG limit")));
        }
        let total = 12 + len;
        if rest.len() < total {
            return Err(BakeError::MalformedImage(format!(
                "chunk at byte {} declares {len} bytes, only {} remain",
                self.pos,
                rest.len() - 12
            )));
        }
        let chunk_type = [rest[4], rest[5], rest[6], rest[7]];
        if !chunk_type.iter().all(u8::is_ascii_alphabetic) {
            return Err(BakeError::MalformedImage(format!("invalid chunk type at byte {}", self.pos)));
        }
        let data = &rest[8..8 + len];
        let stored = u32::from_be_bytes([rest[8 + len], rest[9 + len], rest[10 + len], rest[11 + len]]);
        if crc(&chunk_type, data) != stored {
            return Err(BakeError::MalformedImage(format!(
                "CRC mismatch in {} chunk",
                String::from_utf8_lossy(&chunk_type)
            )));
        }
        self.pos += total;
        Ok(Chunk {
            chunk_type,
            data,
            raw: &rest[..total],
        })
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Result<Chunk<'a>, BakeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.read_chunk();
        match &result {
            Ok(chunk) if &chunk.chunk_type == b"IEND" => self.done = true,
            Ok(_) => {}
            Err(_) => self.done = true,
        }
        Some(result)
    }
}

/// CRC32 over type and data.
fn crc(chunk_type: &[u8; 4], data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    hasher.finalize()
}

/// Append a chunk with its length and CRC.
pub fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) -> Result<(), BakeError> {
    if data.len() > MAX_CHUNK_LEN {
        return Err(BakeError::InvalidPayload(format!(
            "{} bytes exceeds the PNG chunk limit",
            data.len()
        )));
    }
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc(chunk_type, data).to_be_bytes());
    Ok(())
}

/// Embed `payload` after `IHDR`, replacing any previous badge chunk.
pub fn bake_png(image: &[u8], payload: &str) -> Result<Vec<u8>, BakeError> {
    let mut out = Vec::with_capacity(image.len() + payload.len() + 64);
    out.extend_from_slice(&PNG_SIGNATURE);

    let mut replaced = 0usize;
    let mut iter = chunks(image)?;
    for (i, chunk) in iter.by_ref().enumerate() {
        let chunk = chunk?;
        if i == 0 {
            if &chunk.chunk_type != b"IHDR" {
                return Err(BakeError::MalformedImage("first chunk is not IHDR".into()));
            }
            out.extend_from_slice(chunk.raw);
            write_badge_chunk(&mut out, payload)?;
            continue;
        }
        if is_badge_chunk(&chunk) {
            replaced += 1;
            continue;
        }
        out.extend_from_slice(chunk.raw);
    }
    let trailing = iter.remainder();
    out.extend_from_slice(trailing);

    tracing::debug!(payload_len = payload.len(), replaced, trailing = trailing.len(), "baked PNG");
    Ok(out)
}

/// Find the badge chunk and return its text.
pub fn extract_png(bytes: &[u8]) -> Result<String, BakeError> {
    for chunk in chunks(bytes)? {
        let chunk = chunk?;
        if let Some(text) = badge_text(&chunk)? {
            return Ok(text);
        }
    }
    Err(BakeError::NotFound)
}

fn write_badge_chunk(out: &mut Vec<u8>, payload: &str) -> Result<(), BakeError> {
    let mut data = Vec::with_capacity(KEYWORD.len() + payload.len() + 5);
    data.extend_from_slice(KEYWORD.as_bytes());
    data.push(0);
    if payload.is_ascii() && !payload.contains('\0') {
        data.extend_from_slice(payload.as_bytes());
        write_chunk(out, b"tEXt", &data)
    } else {
        // compression flag, compression method, empty language tag, empty translated keyword
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(payload.as_bytes());
        write_chunk(out, b"iTXt", &data)
    }
}

fn is_text_chunk(chunk: &Chunk<'_>) -> bool {
    matches!(&chunk.chunk_type, b"tEXt" | b"iTXt" | b"zTXt")
}

fn is_badge_chunk(chunk: &Chunk<'_>) -> bool {
    is_text_chunk(chunk) && split_nul(chunk.data).map(|(k, _)| k) == Some(KEYWORD.as_bytes())
}

/// Text of a badge chunk, `None` for any other chunk.
fn badge_text(chunk: &Chunk<'_>) -> Result<Option<String>, BakeError> {
    if !is_badge_chunk(chunk) {
        return Ok(None);
    }
    let (_, rest) = split_nul(chunk.data).ok_or_else(|| malformed_text(chunk))?;
    let text = match &chunk.chunk_type {
        b"tEXt" => latin1(rest),
        b"zTXt" => {
            let (_, compressed) = rest.split_first().ok_or_else(|| malformed_text(chunk))?;
            latin1(&inflate(compressed)?)
        }
        _ => {
            if rest.len() < 2 {
                return Err(malformed_text(chunk));
            }
            let compressed = rest[0] == 1;
            let (_, after_lang) = split_nul(&rest[2..]).ok_or_else(|| malformed_text(chunk))?;
            let (_, body) = split_nul(after_lang).ok_or_else(|| malformed_text(chunk))?;
            let bytes = if compressed { inflate(body)? } else { body.to_vec() };
            String::from_utf8(bytes)
                .map_err(|_| BakeError::InvalidPayload("iTXt text is not UTF-8".into()))?
        }
    };
    Ok(Some(text))
}

fn split_nul(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let i = data.iter().position(|&b| b == 0)?;
    Some((&data[..i], &data[i + 1..]))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>, BakeError> {
    let mut out = Vec::new();
    ZlibDecoder::new(compressed)
        .take(MAX_TEXT_LEN + 1)
        .read_to_end(&mut out)
        .map_err(|e| BakeError::MalformedImage(format!("compressed text chunk: {e}")))?;
    if out.len() as u64 > MAX_TEXT_LEN {
        return Err(BakeError::InvalidPayload("decompressed text too large".into()));
    }
    Ok(out)
}

fn malformed_text(chunk: &Chunk<'_>) -> BakeError {
    BakeError::MalformedImage(format!(
        "truncated {} chunk",
        String::from_utf8_lossy(&chunk.chunk_type)
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use proptest::prelude::*;
    use std::io::Write;

    /// A valid 1x1 RGBA PNG.
    pub(crate) fn tiny_png() -> Vec<u8> {
        let mut out = PNG_SIGNATURE.to_vec();
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&1u32.to_be_bytes());
        ihdr.extend_from_slice(&1u32.to_be_bytes());
        ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
        write_chunk(&mut out, b"IHDR", &ihdr).unwrap();
        let mut z = ZlibEncoder::new(Vec::new(), Compression::default());
        z.write_all(&[0, 255, 0, 0, 255]).unwrap();
        write_chunk(&mut out, b"IDAT", &z.finish().unwrap()).unwrap();
        write_chunk(&mut out, b"IEND", &[]).unwrap();
        out
    }

    fn chunk_types(png: &[u8]) -> Vec<String> {
        chunks(png)
            .unwrap()
            .map(|c| String::from_utf8(c.unwrap().chunk_type.to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn ascii_payload_goes_in_text_after_ihdr() {
        let baked = bake_png(&tiny_png(), r#"{"id":"x"}"#).unwrap();
        assert_eq!(chunk_types(&baked), ["IHDR", "tEXt", "IDAT", "IEND"]);
        assert_eq!(extract_png(&baked).unwrap(), r#"{"id":"x"}"#);
    }

    #[test]
    fn unicode_payload_uses_itxt() {
        let baked = bake_png(&tiny_png(), r#"{"name":"Ünïcödé ✓"}"#).unwrap();
        assert_eq!(chunk_types(&baked), ["IHDR", "iTXt", "IDAT", "IEND"]);
        assert_eq!(extract_png(&baked).unwrap(), r#"{"name":"Ünïcödé ✓"}"#);
    }

    #[test]
    fn other_chunks_are_copied_verbatim() {
        let original = tiny_png();
        let baked = bake_png(&original, "{}").unwrap();
        let before: Vec<_> = chunks(&original).unwrap().map(|c| c.unwrap().raw.to_vec()).collect();
        let after: Vec<_> = chunks(&baked)
            .unwrap()
            .map(|c| c.unwrap())
            .filter(|c| !is_badge_chunk(c))
            .map(|c| c.raw.to_vec())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn bytes_after_iend_are_kept() {
        let mut padded = tiny_png();
        padded.extend_from_slice(b"trailer\x00\x01");
        let baked = bake_png(&padded, "{}").unwrap();
        assert!(baked.ends_with(b"IEND\xae\x42\x60\x82trailer\x00\x01"));
        assert_eq!(extract_png(&baked).unwrap(), "{}");

        let clean = bake_png(&tiny_png(), "{}").unwrap();
        let mut iter = chunks(&clean).unwrap();
        assert!(iter.by_ref().all(|c| c.is_ok()));
        assert!(iter.remainder().is_empty());
    }

    #[test]
    fn rebaking_replaces_the_chunk() {
        let once = bake_png(&tiny_png(), r#"{"v":1}"#).unwrap();
        let twice = bake_png(&once, r#"{"v":2}"#).unwrap();
        assert_eq!(chunk_types(&twice), ["IHDR", "tEXt", "IDAT", "IEND"]);
        assert_eq!(extract_png(&twice).unwrap(), r#"{"v":2}"#);
    }

    #[test]
    fn unbaked_image_is_not_found() {
        assert!(matches!(extract_png(&tiny_png()), Err(BakeError::NotFound)));
    }

    #[test]
    fn foreign_text_chunks_are_ignored() {
        let png = tiny_png();
        let mut with_comment = png[..8 + 25].to_vec();
        write_chunk(&mut with_comment, b"tEXt", b"Comment\0hello").unwrap();
        with_comment.extend_from_slice(&png[8 + 25..]);
        assert!(matches!(extract_png(&with_comment), Err(BakeError::NotFound)));
        let baked = bake_png(&with_comment, "{}").unwrap();
        assert_eq!(chunk_types(&baked), ["IHDR", "tEXt", "tEXt", "IDAT", "IEND"]);
        assert_eq!(extract_png(&baked).unwrap(), "{}");
    }

    #[test]
    fn compressed_itxt_is_read() {
        let png = tiny_png();
        let mut z = ZlibEncoder::new(Vec::new(), Compression::default());
        z.write_all(br#"{"compressed":true}"#).unwrap();
        let mut data = b"openbadges\0\x01\x00\0\0".to_vec();
        data.extend_from_slice(&z.finish().unwrap());
        let mut baked = png[..8 + 25].to_vec();
        write_chunk(&mut baked, b"iTXt", &data).unwrap();
        baked.extend_from_slice(&png[8 + 25..]);
        assert_eq!(extract_png(&baked).unwrap(), r#"{"compressed":true}"#);
    }

    #[test]
    fn corruption_is_malformed_not_a_panic() {
        let mut baked = bake_png(&tiny_png(), "{}").unwrap();
        assert!(matches!(extract_png(&baked[..20]), Err(BakeError::MalformedImage(_))));
        assert!(matches!(extract_png(b"not a png"), Err(BakeError::MalformedImage(_))));

        // flip a byte inside the IHDR data
        baked[16] ^= 0xff;
        assert!(matches!(extract_png(&baked), Err(BakeError::MalformedImage(_))));

        let mut no_iend = tiny_png();
        no_iend.truncate(no_iend.len() - 12);
        assert!(matches!(extract_png(&no_iend), Err(BakeError::MalformedImage(_))));
        assert!(matches!(bake_png(&no_iend, "{}"), Err(BakeError::MalformedImage(_))));

        let mut huge = PNG_SIGNATURE.to_vec();
        huge.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, b'I', b'H', b'D', b'R']);
        huge.extend_from_slice(&[0; 8]);
        assert!(matches!(extract_png(&huge), Err(BakeError::MalformedImage(_))));
    }

    proptest! {
        #[test]
        fn bake_extract_round_trip(payload in "\\PC{0,200}") {
            let baked = bake_png(&tiny_png(), &payload).unwrap();
            prop_assert_eq!(extract_png(&baked).unwrap(), payload);
        }
    }
}
