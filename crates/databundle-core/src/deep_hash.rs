//! Deep hash: a SHA-384 digest over a nested list of typed blobs.
//!
//! ```text
//! blob(b)  = H( H("blob" ‖ len(b)) ‖ H(b) )
//! list(xs) = fold(H("list" ‖ len(xs)), |acc, x| H(acc ‖ deep(x)))
//! ```
//!
//! Lengths are ASCII decimal. The type prefix keeps a one-element list from
//! hashing like its lone element.

use sha2::{Digest, Sha384};
use std::io::SeekFrom;

use crate::crypto::sha384;
use crate::error::Result;
use crate::source::ReadSeek;

/// Read size when hashing an external stream.
const STREAM_CHUNK: usize = 64 * 1024;

/// One node of the structure being hashed.
pub enum Chunk<'a> {
    /// In-memory bytes.
    Blob(&'a [u8]),
    /// Bytes behind a seekable source. Consumed in chunks, then rewound.
    Stream(&'a mut dyn ReadSeek),
    /// An ordered list of nodes.
    List(Vec<Chunk<'a>>),
}

/// Compute the deep hash of a node.
pub fn deep_hash(chunk: Chunk<'_>) -> Result<[u8; 48]> {
    match chunk {
        Chunk::Blob(bytes) => Ok(blob_hash(bytes.len() as u64, &sha384(bytes))),
        Chunk::Stream(reader) => {
            let (len, digest) = hash_stream(reader)?;
            Ok(blob_hash(len, &digest))
        }
        Chunk::List(children) => {
            let mut acc = sha384(format!("list{}", children.len()).as_bytes());
            for child in children {
                let child_hash = deep_hash(child)?;
                acc = pair_hash(&acc, &child_hash);
            }
            Ok(acc)
        }
    }
}

fn blob_hash(len: u64, digest: &[u8; 48]) -> [u8; 48] {
    let tag = sha384(format!("blob{len}").as_bytes());
    pair_hash(&tag, digest)
}

fn pair_hash(a: &[u8; 48], b: &[u8; 48]) -> [u8; 48] {
    let mut hasher = Sha384::new();
    hasher.update(a);
    hasher.update(b);
    let mut out = [0u8; 48];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn hash_stream(reader: &mut dyn ReadSeek) -> Result<(u64, [u8; 48])> {
    let len = reader.seek(SeekFrom::End(0))?;
    reader.rewind()?;

    let mut hasher = Sha384::new();
    let mut buf = vec![0u8; STREAM_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    reader.rewind()?;

    let mut out = [0u8; 48];
    out.copy_from_slice(&hasher.finalize());
    Ok((len, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_blob_structure() {
        let expected = {
            let tag = sha384(b"blob3");
            let body = sha384(b"abc");
            let mut joined = tag.to_vec();
            joined.extend_from_slice(&body);
            sha384(&joined)
        };
        assert_eq!(deep_hash(Chunk::Blob(b"abc")).unwrap(), expected);
    }

    #[test]
    fn test_empty_list_is_tag_only() {
        assert_eq!(deep_hash(Chunk::List(vec![])).unwrap(), sha384(b"list0"));
    }

    #[test]
    fn test_list_of_one_differs_from_blob() {
        let bare = deep_hash(Chunk::Blob(b"x")).unwrap();
        let wrapped = deep_hash(Chunk::List(vec![Chunk::Blob(b"x")])).unwrap();
        assert_ne!(bare, wrapped);
    }

    #[test]
    fn test_order_sensitive() {
        let ab = deep_hash(Chunk::List(vec![Chunk::Blob(b"a"), Chunk::Blob(b"b")])).unwrap();
        let ba = deep_hash(Chunk::List(vec![Chunk::Blob(b"b"), Chunk::Blob(b"a")])).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_stream_matches_blob_and_rewinds() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut cursor = Cursor::new(data.clone());
        cursor.set_position(17);

        let streamed = deep_hash(Chunk::Stream(&mut cursor)).unwrap();
        assert_eq!(streamed, deep_hash(Chunk::Blob(&data)).unwrap());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_nested_lists() {
        let nested = deep_hash(Chunk::List(vec![
            Chunk::Blob(b"a"),
            Chunk::List(vec![Chunk::Blob(b"b")]),
        ]))
        .unwrap();
        let flat = deep_hash(Chunk::List(vec![Chunk::Blob(b"a"), Chunk::Blob(b"b")])).unwrap();
        assert_ne!(nested, flat);
    }
}
