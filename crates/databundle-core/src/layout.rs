//! The item header layout, written once and driven two ways.
//!
//! ```text
//! u16 LE   signature type
//! [u8; S]  signature             (S from the scheme)
//! [u8; P]  owner                 (P from the scheme)
//! u8       target flag, then [u8; 32] if 1
//! u8       anchor flag, then [u8; 32] if 1
//! u64 LE   tag count
//! u64 LE   tag blob length
//! [u8; N]  tag blob
//! ...      data (rest of the item)
//! ```
//!
//! [`read_header`] walks this sequence over any [`FieldSource`]. The
//! in-memory driver ([`SliceSource`]) and the sequential driver
//! ([`StreamSource`]) only differ in how a field of known length is
//! fetched, so both report the same error for the same malformed prefix.

use bytes::Bytes;
use std::borrow::Cow;
use std::io::Read;

use crate::error::{CoreError, Result};
use crate::item::BundleItem;
use crate::scheme::SignatureType;
use crate::tags::{deserialize_tags, serialize_tags};
use crate::types::Tag;

/// Upper bound on the capacity reserved up front for a streamed field.
const MAX_PREALLOC: usize = 64 * 1024;

/// Fetches fields of known length from some input.
pub(crate) trait FieldSource {
    /// Read exactly `len` bytes, or fail with `TruncatedInput` naming `field`.
    fn read_field(&mut self, len: usize, field: &'static str) -> Result<Bytes>;
}

/// Driver over a fully materialized buffer. Fields are zero-copy slices.
pub(crate) struct SliceSource {
    buf: Bytes,
    pos: usize,
}

impl SliceSource {
    pub(crate) fn new(buf: Bytes) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Everything after the current position.
    pub(crate) fn rest(&self) -> Bytes {
        self.buf.slice(self.pos..)
    }
}

impl FieldSource for SliceSource {
    fn read_field(&mut self, len: usize, field: &'static str) -> Result<Bytes> {
        let remaining = self.buf.len() - self.pos;
        if len > remaining {
            return Err(CoreError::TruncatedInput {
                field,
                needed: (len - remaining) as u64,
            });
        }
        let out = self.buf.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(out)
    }
}

/// Driver over a sequential reader.
pub(crate) struct StreamSource<R> {
    reader: R,
}

impl<R: Read> StreamSource<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { reader }
    }

    pub(crate) fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> FieldSource for StreamSource<R> {
    fn read_field(&mut self, len: usize, field: &'static str) -> Result<Bytes> {
        let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC));
        (&mut self.reader).take(len as u64).read_to_end(&mut buf)?;
        if buf.len() < len {
            return Err(CoreError::TruncatedInput {
                field,
                needed: (len - buf.len()) as u64,
            });
        }
        Ok(Bytes::from(buf))
    }
}

/// Header fields as read from the wire, tags not yet deserialized.
pub(crate) struct RawHeader {
    pub signature_type: SignatureType,
    pub signature: Bytes,
    pub owner: Bytes,
    pub target: Option<[u8; 32]>,
    pub anchor: Option<[u8; 32]>,
    pub tag_count: u64,
    pub tags_encoded: Bytes,
}

impl RawHeader {
    /// Deserialize the tag blob and check it against the declared count.
    pub(crate) fn parse_tags(&self) -> Result<Vec<Tag>> {
        let tags = deserialize_tags(&self.tags_encoded)?;
        if tags.len() as u64 != self.tag_count {
            return Err(CoreError::MalformedField(format!(
                "declared {} tags, blob holds {}",
                self.tag_count,
                tags.len()
            )));
        }
        Ok(tags)
    }
}

/// Read the header field sequence.
pub(crate) fn read_header<S: FieldSource>(src: &mut S) -> Result<RawHeader> {
    // 1. Scheme
    let raw = src.read_field(2, "signature type")?;
    let signature_type = SignatureType::lookup(u16::from_le_bytes([raw[0], raw[1]]))?;

    // 2. Fixed-length signature and owner
    let signature = src.read_field(signature_type.signature_length(), "signature")?;
    let owner = src.read_field(signature_type.public_key_length(), "owner")?;

    // 3. Optional target and anchor
    let target = read_optional_id(src, "target")?;
    let anchor = read_optional_id(src, "anchor")?;

    // 4. Tag counters
    let tag_count = read_u64(src, "tag count")?;
    let tag_len = read_u64(src, "tag bytes length")?;
    if tag_count == 0 && tag_len != 0 {
        return Err(CoreError::MalformedField(format!(
            "zero tags declared with {tag_len} tag bytes"
        )));
    }
    let tag_len = usize::try_from(tag_len)
        .map_err(|_| CoreError::MalformedField(format!("tag bytes length {tag_len} overflows")))?;

    // 5. Tag blob
    let tags_encoded = src.read_field(tag_len, "tags")?;

    Ok(RawHeader {
        signature_type,
        signature,
        owner,
        target,
        anchor,
        tag_count,
        tags_encoded,
    })
}

fn read_u64<S: FieldSource>(src: &mut S, field: &'static str) -> Result<u64> {
    let raw = src.read_field(8, field)?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&raw);
    Ok(u64::from_le_bytes(arr))
}

fn read_optional_id<S: FieldSource>(src: &mut S, field: &'static str) -> Result<Option<[u8; 32]>> {
    let flag = src.read_field(1, field)?;
    match flag[0] {
        0 => Ok(None),
        1 => {
            let raw = src.read_field(32, field)?;
            let mut id = [0u8; 32];
            id.copy_from_slice(&raw);
            Ok(Some(id))
        }
        other => Err(CoreError::MalformedField(format!(
            "{field} presence flag must be 0 or 1, got {other}"
        ))),
    }
}

/// Encode everything before the data section.
pub(crate) fn write_header(item: &BundleItem) -> Result<Vec<u8>> {
    if !item.is_signed() {
        return Err(CoreError::NotSigned);
    }
    let scheme = item.signature_type;
    check_len("signature", item.signature.len(), scheme.signature_length())?;
    check_len("owner", item.owner.len(), scheme.public_key_length())?;

    let tags_encoded: Cow<'_, [u8]> = match &item.tags_encoded {
        Some(t) => Cow::Borrowed(t),
        None => Cow::Owned(serialize_tags(&item.tags)),
    };
    // A cached blob must describe the same number of tags as the count written
    if item.tags_encoded.is_some() {
        let cached = deserialize_tags(&tags_encoded)?.len() as u64;
        if cached != item.tag_count() {
            return Err(CoreError::MalformedField(format!(
                "item has {} tags but its cached tag bytes hold {}",
                item.tag_count(),
                cached
            )));
        }
    }

    let mut buf = Vec::with_capacity(header_len(item, tags_encoded.len()));
    buf.extend_from_slice(&scheme.to_u16().to_le_bytes());
    buf.extend_from_slice(&item.signature);
    buf.extend_from_slice(&item.owner);
    write_optional_id(&mut buf, item.target.as_ref());
    write_optional_id(&mut buf, item.anchor.as_ref());
    buf.extend_from_slice(&item.tag_count().to_le_bytes());
    buf.extend_from_slice(&(tags_encoded.len() as u64).to_le_bytes());
    buf.extend_from_slice(&tags_encoded);
    Ok(buf)
}

/// Byte length of the header for `item` given its tag blob length.
pub(crate) fn header_len(item: &BundleItem, tags_len: usize) -> usize {
    let scheme = item.signature_type;
    2 + scheme.signature_length()
        + scheme.public_key_length()
        + 1
        + item.target.map_or(0, |_| 32)
        + 1
        + item.anchor.map_or(0, |_| 32)
        + 16
        + tags_len
}

fn write_optional_id(buf: &mut Vec<u8>, id: Option<&[u8; 32]>) {
    match id {
        Some(id) => {
            buf.push(1);
            buf.extend_from_slice(id);
        }
        None => buf.push(0),
    }
}

fn check_len(field: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(CoreError::MalformedField(format!(
            "{field} must be {expected} bytes, got {actual}"
        )));
    }
    Ok(())
}
