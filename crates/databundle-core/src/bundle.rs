//! Bundle codec: an ordered container of encoded items.
//!
//! ```text
//! u256 LE            item count
//! (u256 LE, [u8;32]) per item: encoded length, item id
//! ...                item encodings, concatenated in index order
//! ```
//!
//! Counters are 256-bit on the wire. Values that do not fit in 64 bits are
//! rejected as malformed.

use bytes::{Bytes, BytesMut};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tempfile::Builder;

use crate::codec::{check_declared_id, decode_item, decode_item_stream, encode_item, encoded_len, write_item_stream};
use crate::error::{CoreError, Result};
use crate::item::BundleItem;
use crate::layout::{FieldSource, StreamSource};
use crate::source::{DataSource, Payload};
use crate::types::ItemId;

/// Width of a 256-bit counter.
const U256_LEN: usize = 32;

/// Width of one index entry: length plus id.
const INDEX_ENTRY_LEN: usize = 64;

/// File-name prefix for per-item scratch files during streaming decode.
pub const BUNDLE_ITEM_PREFIX: &str = "bundleItem-";

/// File-name prefix for bundle binaries produced by streaming encode.
pub const BUNDLE_PREFIX: &str = "bundle-";

/// A decoded or assembled bundle.
#[derive(Debug)]
pub struct Bundle {
    /// Items in physical order.
    pub items: Vec<BundleItem>,
    /// The full encoding, in memory or behind an external source.
    pub binary: Payload,
}

impl Bundle {
    /// Assemble a bundle in memory from signed items.
    pub fn new(mut items: Vec<BundleItem>) -> Result<Self> {
        let mut binaries = Vec::with_capacity(items.len());
        for item in items.iter_mut() {
            let binary = match &item.binary {
                Some(b) => b.clone(),
                None => encode_item(item)?,
            };
            binaries.push(binary);
        }

        let body_len: usize = binaries.iter().map(Bytes::len).sum();
        let mut buf = BytesMut::with_capacity(U256_LEN + INDEX_ENTRY_LEN * items.len() + body_len);
        buf.extend_from_slice(&u256_le(items.len() as u64));
        for (item, binary) in items.iter().zip(&binaries) {
            let id = item.id.ok_or(CoreError::NotSigned)?;
            buf.extend_from_slice(&u256_le(binary.len() as u64));
            buf.extend_from_slice(id.as_bytes());
        }
        for binary in &binaries {
            buf.extend_from_slice(binary);
        }

        tracing::debug!("assembled bundle of {} items ({} bytes)", items.len(), buf.len());
        Ok(Self {
            items,
            binary: Payload::Bytes(buf.freeze()),
        })
    }

    /// Ids of the items, in order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().filter_map(|item| item.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The in-memory encoding, if buffered.
    pub fn binary_bytes(&self) -> Option<&Bytes> {
        self.binary.as_bytes()
    }

    /// Give up the items and keep the encoding.
    pub fn into_binary(self) -> Payload {
        self.binary
    }
}

/// Decode a bundle from a complete buffer.
///
/// Every item is decoded from its own slice and its recomputed id must
/// equal the id declared in the index.
pub fn decode_bundle(binary: impl Into<Bytes>) -> Result<Bundle> {
    let binary = binary.into();

    // 1. Count
    if binary.len() < U256_LEN {
        return Err(CoreError::TruncatedInput {
            field: "item count",
            needed: (U256_LEN - binary.len()) as u64,
        });
    }
    let count = read_u256(&binary[..U256_LEN], "item count")?;

    // 2. Index
    let index_end = index_end(count)?;
    if binary.len() < index_end {
        return Err(CoreError::TruncatedInput {
            field: "bundle index",
            needed: (index_end - binary.len()) as u64,
        });
    }

    // 3. Items
    let mut items = Vec::with_capacity(count as usize);
    let mut offset = index_end;
    for entry in binary[U256_LEN..index_end].chunks_exact(INDEX_ENTRY_LEN) {
        let (len, declared) = parse_entry(entry)?;
        let end = offset
            .checked_add(len)
            .ok_or_else(|| CoreError::MalformedField(format!("item length {len} overflows")))?;
        if end > binary.len() {
            return Err(CoreError::TruncatedInput {
                field: "bundle item",
                needed: (end - binary.len()) as u64,
            });
        }

        let item = decode_item(binary.slice(offset..end))?;
        check_declared_id(&item, declared)?;
        items.push(item);
        offset = end;
    }

    tracing::debug!("decoded bundle of {} items ({} bytes)", items.len(), binary.len());
    Ok(Bundle {
        items,
        binary: Payload::Bytes(binary),
    })
}

/// Decode a bundle from an external source without buffering it.
///
/// Each item region is copied into a scratch file in `dir`, decoded from
/// there, and the scratch file removed. Each item's data lands in its own
/// temporary file owned by the returned item. The source is kept as the
/// bundle's binary, rewound.
pub fn decode_bundle_stream(mut source: DataSource, dir: &Path) -> Result<Bundle> {
    source.rewind()?;
    let items = {
        let mut reader = BufReader::new(&mut source);

        // 1. Count and index
        let (count, index) = {
            let mut fields = StreamSource::new(&mut reader);
            let raw = fields.read_field(U256_LEN, "item count")?;
            let count = read_u256(&raw, "item count")?;
            let index_len = index_end(count)? - U256_LEN;
            (count, fields.read_field(index_len, "bundle index")?)
        };

        // 2. Items, one scratch file at a time
        let mut items = Vec::with_capacity(count as usize);
        for entry in index.chunks_exact(INDEX_ENTRY_LEN) {
            let (len, declared) = parse_entry(entry)?;

            let mut scratch = Builder::new().prefix(BUNDLE_ITEM_PREFIX).tempfile_in(dir)?;
            let copied = io::copy(&mut (&mut reader).take(len as u64), &mut scratch)?;
            if copied < len as u64 {
                return Err(CoreError::TruncatedInput {
                    field: "bundle item",
                    needed: len as u64 - copied,
                });
            }
            scratch.flush()?;
            scratch.rewind()?;

            let item = decode_item_stream(BufReader::new(scratch.as_file_mut()), dir)?;
            check_declared_id(&item, declared)?;
            items.push(item);
        }
        items
    };
    source.rewind()?;

    tracing::debug!("stream-decoded bundle of {} items", items.len());
    Ok(Bundle {
        items,
        binary: Payload::Source(source),
    })
}

/// Stream a bundle encoding of `items` into `out`. Returns bytes written.
///
/// Index entries are computed from each item's header and payload length,
/// so payloads are only read once, while being copied out.
pub fn write_bundle_stream<W: Write>(items: &mut [BundleItem], out: &mut W) -> Result<u64> {
    let mut index = Vec::with_capacity(U256_LEN + INDEX_ENTRY_LEN * items.len());
    index.extend_from_slice(&u256_le(items.len() as u64));

    let mut lengths = Vec::with_capacity(items.len());
    for item in items.iter_mut() {
        let id = item.id.ok_or(CoreError::NotSigned)?;
        let len = encoded_len(item)?;
        index.extend_from_slice(&u256_le(len));
        index.extend_from_slice(id.as_bytes());
        lengths.push(len);
    }
    out.write_all(&index)?;

    let mut written = index.len() as u64;
    for (item, expected) in items.iter_mut().zip(lengths) {
        let n = write_item_stream(item, out)?;
        if n != expected {
            return Err(CoreError::MalformedField(format!(
                "item wrote {n} bytes, index declared {expected}"
            )));
        }
        written += n;
    }
    Ok(written)
}

/// Encode `items` into a temporary file in `dir` and return the bundle
/// backed by it. Item payload sources are rewound afterwards.
pub fn encode_bundle_stream(mut items: Vec<BundleItem>, dir: &Path) -> Result<Bundle> {
    let out = Builder::new().prefix(BUNDLE_PREFIX).tempfile_in(dir)?;
    let mut writer = BufWriter::new(out);
    let written = write_bundle_stream(&mut items, &mut writer)?;
    let mut out = writer.into_inner().map_err(|e| e.into_error())?;
    out.rewind()?;

    tracing::debug!("stream-encoded bundle of {} items ({} bytes)", items.len(), written);
    Ok(Bundle {
        items,
        binary: Payload::Source(DataSource::Temp(out)),
    })
}

/// Read the declared item count from the start of a bundle.
pub fn read_item_count<R: Read>(reader: R) -> Result<u64> {
    let raw = StreamSource::new(reader).read_field(U256_LEN, "item count")?;
    read_u256(&raw, "item count")
}

fn u256_le(n: u64) -> [u8; U256_LEN] {
    let mut out = [0u8; U256_LEN];
    out[..8].copy_from_slice(&n.to_le_bytes());
    out
}

fn read_u256(raw: &[u8], field: &str) -> Result<u64> {
    if raw[8..U256_LEN].iter().any(|&b| b != 0) {
        return Err(CoreError::MalformedField(format!(
            "{field} does not fit in 64 bits"
        )));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&raw[..8]);
    Ok(u64::from_le_bytes(low))
}

/// Offset of the first item, or `MalformedField` if it overflows.
fn index_end(count: u64) -> Result<usize> {
    count
        .checked_mul(INDEX_ENTRY_LEN as u64)
        .and_then(|n| n.checked_add(U256_LEN as u64))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| CoreError::MalformedField(format!("item count {count} overflows")))
}

fn parse_entry(entry: &[u8]) -> Result<(usize, ItemId)> {
    let len = read_u256(&entry[..U256_LEN], "item length")?;
    let len = usize::try_from(len)
        .map_err(|_| CoreError::MalformedField(format!("item length {len} overflows")))?;
    let mut id = [0u8; 32];
    id.copy_from_slice(&entry[U256_LEN..INDEX_ENTRY_LEN]);
    Ok((len, ItemId::from_bytes(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;
    use crate::scheme::SignatureType;
    use std::io::Cursor;

    fn stub(data: &'static [u8], sig_byte: u8) -> BundleItem {
        let mut item = BundleItem::builder(SignatureType::Ed25519, vec![0x11; 32])
            .add_tag("n", "v")
            .data(Bytes::from_static(data))
            .build()
            .unwrap();
        item.signature = vec![sig_byte; 64];
        item.id = Some(ItemId::from_bytes(sha256(&item.signature)));
        item
    }

    #[test]
    fn test_empty_bundle() {
        let bundle = Bundle::new(vec![]).unwrap();
        let binary = bundle.binary_bytes().unwrap().clone();
        assert_eq!(binary.as_ref(), &[0u8; 32]);

        let decoded = decode_bundle(binary).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_layout_and_roundtrip() {
        let bundle = Bundle::new(vec![stub(b"one", 1), stub(b"two!", 2)]).unwrap();
        let binary = bundle.binary_bytes().unwrap().clone();

        assert_eq!(binary[0], 2);
        assert!(binary[1..32].iter().all(|&b| b == 0));
        assert_eq!(&binary[64..96], bundle.items[0].id.unwrap().as_bytes());

        let decoded = decode_bundle(binary).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.item_ids(), bundle.item_ids());
        assert_eq!(decoded.items[1].data.as_bytes().unwrap().as_ref(), b"two!");
    }

    #[test]
    fn test_short_buffers() {
        assert!(matches!(
            decode_bundle(vec![0u8; 31]),
            Err(CoreError::TruncatedInput { field: "item count", needed: 1 })
        ));

        let mut header = u256_le(2).to_vec();
        header.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            decode_bundle(header),
            Err(CoreError::TruncatedInput { field: "bundle index", needed: 64 })
        ));
    }

    #[test]
    fn test_oversized_counter_rejected() {
        let mut header = vec![0u8; 32];
        header[20] = 1;
        assert!(matches!(
            decode_bundle(header),
            Err(CoreError::MalformedField(_))
        ));
        assert!(matches!(
            decode_bundle(u256_le(u64::MAX).to_vec()),
            Err(CoreError::MalformedField(_))
        ));
    }

    #[test]
    fn test_declared_id_mismatch() {
        let bundle = Bundle::new(vec![stub(b"one", 1)]).unwrap();
        let mut binary = bundle.binary_bytes().unwrap().to_vec();
        binary[64] ^= 0xff;

        assert!(matches!(
            decode_bundle(binary),
            Err(CoreError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_stream_encode_matches_buffered() {
        let dir = tempfile::tempdir().unwrap();
        let buffered = Bundle::new(vec![stub(b"one", 1), stub(b"two", 2)]).unwrap();
        let mut streamed = encode_bundle_stream(vec![stub(b"one", 1), stub(b"two", 2)], dir.path()).unwrap();

        let bytes = streamed.binary.to_vec().unwrap();
        assert_eq!(bytes, buffered.binary_bytes().unwrap().to_vec());
    }

    #[test]
    fn test_stream_decode() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = Bundle::new(vec![stub(b"one", 1), stub(b"two", 2)]).unwrap();
        let binary = bundle.binary_bytes().unwrap().to_vec();

        let source = DataSource::from_reader(Cursor::new(binary));
        let mut decoded = decode_bundle_stream(source, dir.path()).unwrap();
        assert_eq!(decoded.item_ids(), bundle.item_ids());
        assert_eq!(decoded.items[0].data.to_vec().unwrap(), b"one");
        assert_eq!(decoded.items[1].data.to_vec().unwrap(), b"two");

        // Only the per-item data files remain; scratch copies are gone
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers.len(), 2);
        assert!(leftovers.iter().all(|n| n.starts_with("itemData-")));
    }

    #[test]
    fn test_stream_decode_short_item() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = Bundle::new(vec![stub(b"payload", 1)]).unwrap();
        let binary = bundle.binary_bytes().unwrap();
        let short = binary[..binary.len() - 3].to_vec();

        let source = DataSource::from_reader(Cursor::new(short));
        assert!(matches!(
            decode_bundle_stream(source, dir.path()),
            Err(CoreError::TruncatedInput { field: "bundle item", needed: 3 })
        ));
    }

    #[test]
    fn test_read_item_count() {
        assert_eq!(read_item_count(Cursor::new(u256_le(7))).unwrap(), 7);
        assert!(read_item_count(Cursor::new(vec![0u8; 4])).is_err());
    }
}
