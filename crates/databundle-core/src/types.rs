//! Strong type definitions shared across the codec.
//!
//! Identifiers are newtypes so a 32-byte id cannot be confused with a
//! 32-byte target or anchor at compile time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// A 32-byte item identifier, computed as SHA-256(signature).
///
/// The id depends on the signature alone. Two items carrying the same
/// signature share an id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub [u8; 32]);

impl ItemId {
    /// Create a new ItemId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Base64url (unpadded) text form, as used by ledger gateways.
    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Parse the base64url text form.
    pub fn from_b64(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| CoreError::MalformedField(format!("id: {e}")))?;
        Self::try_from(bytes.as_slice())
            .map_err(|_| CoreError::MalformedField(format!("id must be 32 bytes, got {}", bytes.len())))
    }

    /// The zero id (used as a sentinel).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.to_b64())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_b64())
    }
}

impl AsRef<[u8]> for ItemId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ItemId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for ItemId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> std::result::Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// A name/value metadata pair. Order and duplicates are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parse an optional 32-byte field from its base64url text form.
///
/// The empty string means "absent". Anything else must decode to exactly
/// 32 bytes; a 32-byte zero value is a present field, never an absent one.
pub fn parse_id32(s: &str) -> Result<Option<[u8; 32]>> {
    if s.is_empty() {
        return Ok(None);
    }
    ItemId::from_b64(s).map(|id| Some(id.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_b64_roundtrip() {
        let id = ItemId::from_bytes([0x42; 32]);
        let text = id.to_b64();
        assert_eq!(text.len(), 43);
        assert_eq!(ItemId::from_b64(&text).unwrap(), id);
    }

    #[test]
    fn test_item_id_rejects_wrong_length() {
        let short = URL_SAFE_NO_PAD.encode([1u8; 31]);
        assert!(matches!(
            ItemId::from_b64(&short),
            Err(CoreError::MalformedField(_))
        ));
    }

    #[test]
    fn test_parse_id32_empty_is_absent() {
        assert_eq!(parse_id32("").unwrap(), None);
        let zero = URL_SAFE_NO_PAD.encode([0u8; 32]);
        assert_eq!(parse_id32(&zero).unwrap(), Some([0u8; 32]));
    }

    #[test]
    fn test_item_id_debug() {
        let id = ItemId::from_bytes([0xcd; 32]);
        assert!(format!("{:?}", id).starts_with("ItemId("));
    }

    #[test]
    fn test_tag_serde() {
        let tag = Tag::new("Content-Type", "text/plain");
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(serde_json::from_str::<Tag>(&json).unwrap(), tag);
    }
}
