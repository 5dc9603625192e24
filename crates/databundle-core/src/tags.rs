//! Tag codec: Avro binary encoding of an ordered tag list.
//!
//! The wire schema is fixed:
//!
//! ```text
//! { "type": "array",
//!   "items": { "type": "record", "name": "Tag",
//!              "fields": [ { "name": "name",  "type": "bytes" },
//!                          { "name": "value", "type": "bytes" } ] } }
//! ```
//!
//! Encoding rules:
//! - An empty list encodes to zero bytes (not a lone terminator)
//! - A non-empty list is one block: zig-zag count, the records, then `0x00`
//! - Every `bytes` value is a zig-zag length followed by the raw bytes
//!
//! **CRITICAL**: the encoded blob is part of the signed message. Any change
//! to this encoding invalidates every existing signature.

use crate::error::{CoreError, Result};
use crate::types::Tag;

/// Longest valid varint for a 64-bit zig-zag value.
const MAX_VARINT_LEN: usize = 10;

/// Serialize tags to their canonical Avro bytes.
pub fn serialize_tags(tags: &[Tag]) -> Vec<u8> {
    if tags.is_empty() {
        return Vec::new();
    }

    let payload: usize = tags.iter().map(|t| t.name.len() + t.value.len()).sum();
    let mut buf = Vec::with_capacity(payload + tags.len() * 4 + 2);

    encode_long(&mut buf, tags.len() as i64);
    for tag in tags {
        encode_bytes(&mut buf, tag.name.as_bytes());
        encode_bytes(&mut buf, tag.value.as_bytes());
    }
    // End of array
    encode_long(&mut buf, 0);
    buf
}

/// Deserialize Avro tag bytes back into an ordered tag list.
///
/// Accepts any block layout a conforming Avro writer may produce, including
/// negative block counts that carry a block byte size.
pub fn deserialize_tags(bytes: &[u8]) -> Result<Vec<Tag>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = AvroReader::new(bytes);
    let mut tags = Vec::new();

    loop {
        let count = reader.read_long()?;
        if count == 0 {
            break;
        }
        let count = if count < 0 {
            // Negative count: absolute value is the item count, followed by the block size
            let _block_size = reader.read_long()?;
            count
                .checked_neg()
                .ok_or_else(|| malformed("block count overflows"))?
        } else {
            count
        };

        for _ in 0..count {
            let name = reader.read_string()?;
            let value = reader.read_string()?;
            tags.push(Tag { name, value });
        }
    }

    if reader.remaining() != 0 {
        return Err(malformed(&format!(
            "{} trailing bytes after tag array",
            reader.remaining()
        )));
    }

    Ok(tags)
}

fn malformed(msg: &str) -> CoreError {
    CoreError::MalformedField(format!("tags: {msg}"))
}

/// Encode a zig-zag varint long.
fn encode_long(buf: &mut Vec<u8>, n: i64) {
    let mut z = ((n << 1) ^ (n >> 63)) as u64;
    while z >= 0x80 {
        buf.push((z as u8 & 0x7f) | 0x80);
        z >>= 7;
    }
    buf.push(z as u8);
}

/// Encode an Avro `bytes` value.
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_long(buf, bytes.len() as i64);
    buf.extend_from_slice(bytes);
}

/// Bounds-checked cursor over Avro bytes.
struct AvroReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> AvroReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_long(&mut self) -> Result<i64> {
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| malformed("truncated varint"))?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(((value >> 1) as i64) ^ -((value & 1) as i64));
            }
        }
        Err(malformed("varint longer than 10 bytes"))
    }

    fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_long()?;
        let len = usize::try_from(len).map_err(|_| malformed("negative length"))?;
        if len > self.remaining() {
            return Err(malformed("length exceeds remaining bytes"));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| malformed("tag is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_tags_encode_to_nothing() {
        assert!(serialize_tags(&[]).is_empty());
        assert!(deserialize_tags(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_tag_layout() {
        let bytes = serialize_tags(&[Tag::new("Content-Type", "application/txt")]);

        let mut expected = vec![0x02, 0x18];
        expected.extend_from_slice(b"Content-Type");
        expected.push(0x1e);
        expected.extend_from_slice(b"application/txt");
        expected.push(0x00);

        assert_eq!(bytes, expected);
        assert_eq!(bytes.len(), 31);
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let tags = vec![
            Tag::new("b", "2"),
            Tag::new("a", "1"),
            Tag::new("b", "2"),
            Tag::new("", ""),
        ];
        let decoded = deserialize_tags(&serialize_tags(&tags)).unwrap();
        assert_eq!(decoded, tags);
    }

    #[test]
    fn test_zigzag_encoding() {
        let mut buf = Vec::new();
        encode_long(&mut buf, 0);
        encode_long(&mut buf, -1);
        encode_long(&mut buf, 1);
        encode_long(&mut buf, 64);
        assert_eq!(buf, vec![0x00, 0x01, 0x02, 0x80, 0x01]);
    }

    #[test]
    fn test_negative_block_count() {
        // Block of one record written with a negative count and a byte size
        let mut bytes = Vec::new();
        encode_long(&mut bytes, -1);
        encode_long(&mut bytes, 4);
        encode_bytes(&mut bytes, b"k");
        encode_bytes(&mut bytes, b"v");
        encode_long(&mut bytes, 0);

        assert_eq!(deserialize_tags(&bytes).unwrap(), vec![Tag::new("k", "v")]);
    }

    #[test]
    fn test_multiple_blocks() {
        let mut bytes = Vec::new();
        encode_long(&mut bytes, 1);
        encode_bytes(&mut bytes, b"a");
        encode_bytes(&mut bytes, b"1");
        encode_long(&mut bytes, 1);
        encode_bytes(&mut bytes, b"b");
        encode_bytes(&mut bytes, b"2");
        encode_long(&mut bytes, 0);

        let tags = deserialize_tags(&bytes).unwrap();
        assert_eq!(tags, vec![Tag::new("a", "1"), Tag::new("b", "2")]);
    }

    #[test]
    fn test_rejects_truncated_and_trailing() {
        let bytes = serialize_tags(&[Tag::new("name", "value")]);

        assert!(matches!(
            deserialize_tags(&bytes[..bytes.len() - 3]),
            Err(CoreError::MalformedField(_))
        ));

        let mut trailing = bytes.clone();
        trailing.push(0x00);
        assert!(matches!(
            deserialize_tags(&trailing),
            Err(CoreError::MalformedField(_))
        ));
    }

    #[test]
    fn test_rejects_negative_length_and_bad_utf8() {
        let mut negative = Vec::new();
        encode_long(&mut negative, 1);
        encode_long(&mut negative, -3);
        assert!(deserialize_tags(&negative).is_err());

        let mut bad_utf8 = Vec::new();
        encode_long(&mut bad_utf8, 1);
        encode_bytes(&mut bad_utf8, &[0xff, 0xfe]);
        encode_bytes(&mut bad_utf8, b"v");
        encode_long(&mut bad_utf8, 0);
        assert!(deserialize_tags(&bad_utf8).is_err());
    }

    #[test]
    fn test_rejects_overlong_varint() {
        let bytes = [0xffu8; 11];
        assert!(deserialize_tags(&bytes).is_err());
    }

    proptest! {
        #[test]
        fn test_tags_roundtrip(pairs in prop::collection::vec(("\\PC{0,24}", "\\PC{0,48}"), 0..12)) {
            let tags: Vec<Tag> = pairs.into_iter().map(|(n, v)| Tag::new(n, v)).collect();
            let bytes = serialize_tags(&tags);
            prop_assert_eq!(bytes.is_empty(), tags.is_empty());
            prop_assert_eq!(deserialize_tags(&bytes).unwrap(), tags);
        }

        #[test]
        fn test_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = deserialize_tags(&bytes);
        }
    }
}
