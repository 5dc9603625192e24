//! BundleItem codec: buffered and streaming encode and decode.

use bytes::{Bytes, BytesMut};
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::Path;
use tempfile::Builder;

use crate::crypto::sha256;
use crate::error::{CoreError, Result};
use crate::item::BundleItem;
use crate::layout::{header_len, read_header, write_header, RawHeader, SliceSource, StreamSource};
use crate::source::{DataSource, Payload};
use crate::types::ItemId;

/// File-name prefix for payload sinks created by streaming decode.
pub const ITEM_DATA_PREFIX: &str = "itemData-";

/// Encode a signed item into one contiguous buffer.
///
/// A streaming payload is read in full and its source rewound.
pub fn encode_item(item: &mut BundleItem) -> Result<Bytes> {
    let header = write_header(item)?;
    let mut buf = BytesMut::from(header.as_slice());
    match &mut item.data {
        Payload::Bytes(b) => buf.extend_from_slice(b),
        Payload::Source(s) => buf.extend_from_slice(&s.read_all()?),
    }
    Ok(buf.freeze())
}

/// Decode an item from a complete buffer.
///
/// Signature, owner, tags and data are slices of `binary`; nothing is copied
/// beyond the tag strings.
pub fn decode_item(binary: impl Into<Bytes>) -> Result<BundleItem> {
    let binary = binary.into();
    let mut src = SliceSource::new(binary.clone());
    let raw = read_header(&mut src)?;
    let data = src.rest();

    let item = assemble(raw, Payload::Bytes(data), Some(binary))?;
    tracing::debug!(
        "decoded item {} ({}, {} header bytes)",
        display_id(&item),
        item.signature_type,
        src.position()
    );
    Ok(item)
}

/// Decode an item from a sequential reader.
///
/// The data section is copied into a fresh temporary file in `dir`, which is
/// returned as the item's [`DataSource::Temp`] payload. The caller owns it.
pub fn decode_item_stream<R: Read>(reader: R, dir: &Path) -> Result<BundleItem> {
    let mut src = StreamSource::new(reader);
    let raw = read_header(&mut src)?;

    let mut sink = Builder::new().prefix(ITEM_DATA_PREFIX).tempfile_in(dir)?;
    let mut reader = src.into_inner();
    io::copy(&mut reader, &mut sink)?;
    sink.flush()?;
    sink.rewind()?;

    assemble(raw, Payload::Source(DataSource::Temp(sink)), None)
}

fn assemble(raw: RawHeader, data: Payload, binary: Option<Bytes>) -> Result<BundleItem> {
    let tags = raw.parse_tags()?;
    let id = ItemId::from_bytes(sha256(&raw.signature));
    Ok(BundleItem {
        signature_type: raw.signature_type,
        signature: raw.signature.to_vec(),
        owner: raw.owner.to_vec(),
        target: raw.target,
        anchor: raw.anchor,
        tags,
        tags_encoded: Some(raw.tags_encoded.to_vec()),
        data,
        id: Some(id),
        binary,
    })
}

fn display_id(item: &BundleItem) -> String {
    item.id.map(|id| id.to_b64()).unwrap_or_default()
}

/// Lazily-read encoding of an item: header first, then the payload.
///
/// The payload is never materialized. A source payload is rewound before
/// the first read and again once it is exhausted.
pub struct ItemReader<'a> {
    header: Cursor<Vec<u8>>,
    body: Body<'a>,
}

enum Body<'a> {
    Bytes(Cursor<&'a [u8]>),
    Source { source: &'a mut DataSource, done: bool },
}

/// Start a streaming encode of a signed item.
pub fn encode_item_stream(item: &mut BundleItem) -> Result<ItemReader<'_>> {
    let header = write_header(item)?;
    let body = match &mut item.data {
        Payload::Bytes(b) => Body::Bytes(Cursor::new(&b[..])),
        Payload::Source(s) => {
            s.rewind()?;
            Body::Source {
                source: s,
                done: false,
            }
        }
    };
    Ok(ItemReader {
        header: Cursor::new(header),
        body,
    })
}

impl Read for ItemReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.header.read(buf)?;
        if n > 0 || buf.is_empty() {
            return Ok(n);
        }
        match &mut self.body {
            Body::Bytes(cursor) => cursor.read(buf),
            Body::Source { source, done } => {
                if *done {
                    return Ok(0);
                }
                let n = source.read(buf)?;
                if n == 0 {
                    source.rewind()?;
                    *done = true;
                }
                Ok(n)
            }
        }
    }
}

/// Stream the encoding of a signed item into `out`. Returns bytes written.
pub fn write_item_stream<W: Write>(item: &mut BundleItem, out: &mut W) -> Result<u64> {
    let mut reader = encode_item_stream(item)?;
    let written = io::copy(&mut reader, out)?;
    Ok(written)
}

/// Byte length of the full encoding of `item`.
pub fn encoded_len(item: &mut BundleItem) -> Result<u64> {
    let tags_len = item.tags_bytes().len();
    let header = header_len(item, tags_len) as u64;
    Ok(header + item.data.len()?)
}

/// Extract the raw tag blob from an encoded item without touching its data
/// or deserializing the tags.
pub fn item_tags_bytes(binary: &[u8]) -> Result<Vec<u8>> {
    let mut src = SliceSource::new(Bytes::copy_from_slice(binary));
    let raw = read_header(&mut src)?;
    Ok(raw.tags_encoded.to_vec())
}

/// Verify that a decoded item's recomputed id matches the id declared for it.
pub(crate) fn check_declared_id(item: &BundleItem, declared: ItemId) -> Result<()> {
    let actual = ItemId::from_bytes(sha256(&item.signature));
    if actual != declared {
        tracing::warn!("item id mismatch: declared {}, recomputed {}", declared, actual);
        return Err(CoreError::IdMismatch {
            expected: declared,
            actual,
        });
    }
    Ok(())
}
