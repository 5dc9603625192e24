//! BundleItem: one signed, independently verifiable record.
//!
//! An item is born unsigned, becomes signed through
//! [`sign_item`](crate::validation::sign_item), and is immutable afterwards.
//! Re-signing produces a logically new item with a new id.

use bytes::Bytes;

use crate::error::{CoreError, Result};
use crate::scheme::SignatureType;
use crate::source::{DataSource, Payload};
use crate::tags::serialize_tags;
use crate::types::{ItemId, Tag};

/// A bundle item in logical form.
#[derive(Debug)]
pub struct BundleItem {
    /// Scheme of the signature and owner key.
    pub signature_type: SignatureType,

    /// Raw signature. Empty until signed.
    pub signature: Vec<u8>,

    /// Raw owner public key, scheme-determined length.
    pub owner: Vec<u8>,

    /// Optional 32-byte target.
    pub target: Option<[u8; 32]>,

    /// Optional 32-byte anchor.
    pub anchor: Option<[u8; 32]>,

    /// Ordered tags. Duplicates allowed.
    pub tags: Vec<Tag>,

    /// Cached Avro encoding of `tags`. Recomputed from `tags` when absent.
    pub tags_encoded: Option<Vec<u8>>,

    /// Payload, in memory or behind an external source.
    pub data: Payload,

    /// SHA-256(signature). `None` until signed.
    pub id: Option<ItemId>,

    /// Cached full encoding. Only set for in-memory payloads.
    pub binary: Option<Bytes>,
}

impl BundleItem {
    /// Start building an unsigned item for the given owner key.
    pub fn builder(signature_type: SignatureType, owner: impl Into<Vec<u8>>) -> ItemBuilder {
        ItemBuilder::new(signature_type, owner)
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// The encoded tag blob, computing it from `tags` if it is not cached.
    pub fn tags_bytes(&mut self) -> &[u8] {
        let tags = &self.tags;
        self.tags_encoded.get_or_insert_with(|| serialize_tags(tags))
    }

    /// The signer's address, derived from the owner key.
    pub fn signer_address(&self) -> Result<String> {
        self.signature_type.derive_address(&self.owner)
    }

    /// Declared tag count as written on the wire.
    pub fn tag_count(&self) -> u64 {
        self.tags.len() as u64
    }

    /// Look up the first tag with the given name.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

/// Builder for unsigned items.
pub struct ItemBuilder {
    signature_type: SignatureType,
    owner: Vec<u8>,
    target: Option<[u8; 32]>,
    anchor: Option<[u8; 32]>,
    tags: Vec<Tag>,
    data: Payload,
}

impl ItemBuilder {
    pub fn new(signature_type: SignatureType, owner: impl Into<Vec<u8>>) -> Self {
        Self {
            signature_type,
            owner: owner.into(),
            target: None,
            anchor: None,
            tags: Vec::new(),
            data: Payload::default(),
        }
    }

    pub fn target(mut self, target: Option<[u8; 32]>) -> Self {
        self.target = target;
        self
    }

    pub fn anchor(mut self, anchor: Option<[u8; 32]>) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn add_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    /// Set an in-memory payload.
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Payload::Bytes(data.into());
        self
    }

    /// Set an external payload source.
    pub fn data_source(mut self, source: DataSource) -> Self {
        self.data = Payload::Source(source);
        self
    }

    /// Validate the owner length and precompute the tag encoding.
    pub fn build(self) -> Result<BundleItem> {
        let expected = self.signature_type.public_key_length();
        if self.owner.len() != expected {
            return Err(CoreError::MalformedField(format!(
                "owner must be {} bytes for {}, got {}",
                expected,
                self.signature_type,
                self.owner.len()
            )));
        }

        let tags_encoded = serialize_tags(&self.tags);
        Ok(BundleItem {
            signature_type: self.signature_type,
            signature: Vec::new(),
            owner: self.owner,
            target: self.target,
            anchor: self.anchor,
            tags: self.tags,
            tags_encoded: Some(tags_encoded),
            data: self.data,
            id: None,
            binary: None,
        })
    }
}

/// Create an unsigned item with an in-memory payload.
pub fn new_item(
    owner: impl Into<Vec<u8>>,
    signature_type: SignatureType,
    target: Option<[u8; 32]>,
    anchor: Option<[u8; 32]>,
    data: impl Into<Bytes>,
    tags: Vec<Tag>,
) -> Result<BundleItem> {
    ItemBuilder::new(signature_type, owner)
        .target(target)
        .anchor(anchor)
        .tags(tags)
        .data(data)
        .build()
}

/// Create an unsigned item whose payload stays behind an external source.
pub fn new_item_stream(
    owner: impl Into<Vec<u8>>,
    signature_type: SignatureType,
    target: Option<[u8; 32]>,
    anchor: Option<[u8; 32]>,
    source: DataSource,
    tags: Vec<Tag>,
) -> Result<BundleItem> {
    ItemBuilder::new(signature_type, owner)
        .target(target)
        .anchor(anchor)
        .tags(tags)
        .data_source(source)
        .build()
}
