//! External byte sources for streaming mode.
//!
//! A streaming item carries its payload as a seekable source instead of an
//! in-memory buffer. The same source is read more than once (once to hash,
//! once to encode), so every consumer rewinds it before and after use.
//!
//! Temporary files created by streaming decode are returned as
//! [`DataSource::Temp`]. The handle owns the file: it stays on disk while the
//! handle is alive and is removed when the handle is dropped, unless the
//! caller keeps it with [`DataSource::into_temp`] and `persist`.

use bytes::Bytes;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tempfile::NamedTempFile;

/// Anything that can be read sequentially and repositioned.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A re-readable byte source backing a streaming payload.
pub enum DataSource {
    /// A caller-provided file.
    File(File),
    /// A temporary file created by streaming decode or encode.
    Temp(NamedTempFile),
    /// Any other seekable reader.
    Reader(Box<dyn ReadSeek>),
}

impl DataSource {
    pub fn from_reader(reader: impl ReadSeek + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    /// Total length in bytes. Leaves the source rewound.
    pub fn stream_len(&mut self) -> io::Result<u64> {
        let len = self.seek(SeekFrom::End(0))?;
        self.rewind()?;
        Ok(len)
    }

    /// Read the whole source into memory. Leaves the source rewound.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        self.rewind()?;
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        self.rewind()?;
        Ok(buf)
    }

    /// Filesystem path, if the source is a temporary file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Temp(t) => Some(t.path()),
            _ => None,
        }
    }

    /// Take ownership of the temporary file, if that is what backs this source.
    pub fn into_temp(self) -> Option<NamedTempFile> {
        match self {
            Self::Temp(t) => Some(t),
            _ => None,
        }
    }
}

impl Read for DataSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(f) => f.read(buf),
            Self::Temp(t) => t.read(buf),
            Self::Reader(r) => r.read(buf),
        }
    }
}

impl Seek for DataSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::File(f) => f.seek(pos),
            Self::Temp(t) => t.seek(pos),
            Self::Reader(r) => r.seek(pos),
        }
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(_) => f.write_str("DataSource::File"),
            Self::Temp(t) => write!(f, "DataSource::Temp({})", t.path().display()),
            Self::Reader(_) => f.write_str("DataSource::Reader"),
        }
    }
}

impl From<File> for DataSource {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}

impl From<NamedTempFile> for DataSource {
    fn from(temp: NamedTempFile) -> Self {
        Self::Temp(temp)
    }
}

/// Payload bytes: in memory or behind an external source, never both.
pub enum Payload {
    Bytes(Bytes),
    Source(DataSource),
}

impl Payload {
    /// Length in bytes. A source is left rewound.
    pub fn len(&mut self) -> io::Result<u64> {
        match self {
            Self::Bytes(b) => Ok(b.len() as u64),
            Self::Source(s) => s.stream_len(),
        }
    }

    pub fn is_empty(&mut self) -> io::Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// The in-memory bytes, if buffered.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Source(_) => None,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }

    /// Mutable access to the external source, if streaming.
    pub fn source_mut(&mut self) -> Option<&mut DataSource> {
        match self {
            Self::Bytes(_) => None,
            Self::Source(s) => Some(s),
        }
    }

    /// Materialize the payload. A source is read in full and left rewound.
    pub fn to_vec(&mut self) -> io::Result<Vec<u8>> {
        match self {
            Self::Bytes(b) => Ok(b.to_vec()),
            Self::Source(s) => s.read_all(),
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::Bytes(Bytes::new())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "Payload::Bytes({} bytes)", b.len()),
            Self::Source(s) => write!(f, "Payload::Source({:?})", s),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

impl From<DataSource> for Payload {
    fn from(s: DataSource) -> Self {
        Self::Source(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_stream_len_rewinds() {
        let mut source = DataSource::from_reader(Cursor::new(b"hello world".to_vec()));
        source.seek(SeekFrom::Start(3)).unwrap();

        assert_eq!(source.stream_len().unwrap(), 11);
        assert_eq!(source.stream_position().unwrap(), 0);
    }

    #[test]
    fn test_read_all_is_repeatable() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"payload").unwrap();
        let mut source = DataSource::from(temp);

        assert_eq!(source.read_all().unwrap(), b"payload");
        assert_eq!(source.read_all().unwrap(), b"payload");
        assert!(source.path().is_some());
    }

    #[test]
    fn test_temp_file_removed_on_drop() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_path_buf();
        let source = DataSource::from(temp);
        assert!(path.exists());

        drop(source);
        assert!(!path.exists());
    }

    #[test]
    fn test_payload_len() {
        let mut bytes = Payload::from(b"abc".to_vec());
        assert_eq!(bytes.len().unwrap(), 3);
        assert!(bytes.as_bytes().is_some());

        let mut source = Payload::from(DataSource::from_reader(Cursor::new(vec![0u8; 10])));
        assert_eq!(source.len().unwrap(), 10);
        assert!(source.is_source());
        assert!(!source.is_empty().unwrap());
        assert!(Payload::default().is_empty().unwrap());
    }
}
