//! # Databundle Core
//!
//! Primitives for signed data items and the bundles that carry them:
//! the binary codecs, the deep hash that defines what gets signed, and the
//! signature scheme registry.
//!
//! ## Key Types
//!
//! - [`BundleItem`] - One signed, independently verifiable record
//! - [`Bundle`] - An ordered container of encoded items
//! - [`ItemId`] - Content identifier, SHA-256 of the signature
//! - [`SignatureType`] - Scheme id selecting lengths and verification
//! - [`ItemSigner`] - Signing capability for one scheme
//!
//! ## Buffered and streaming
//!
//! Every codec operation has a buffered form over [`bytes::Bytes`] and a
//! streaming form over a seekable [`DataSource`]. Both walk the same field
//! sequence, defined once in the `layout` module, and produce identical bytes.

pub mod bundle;
pub mod codec;
pub mod crypto;
pub mod deep_hash;
pub mod error;
pub mod item;
mod layout;
pub mod scheme;
pub mod source;
pub mod tags;
pub mod types;
pub mod validation;

pub use bundle::{
    decode_bundle, decode_bundle_stream, encode_bundle_stream, read_item_count, write_bundle_stream,
    Bundle,
};
pub use codec::{
    decode_item, decode_item_stream, encode_item, encode_item_stream, encoded_len,
    item_tags_bytes, write_item_stream, ItemReader,
};
pub use crypto::{ArweaveSigner, Ed25519Signer, EthereumSigner, ItemSigner};
pub use deep_hash::{deep_hash, Chunk};
pub use error::{CoreError, Result, VerifyError};
pub use item::{new_item, new_item_stream, BundleItem, ItemBuilder};
pub use scheme::{SchemeConfig, SignatureType};
pub use source::{DataSource, Payload, ReadSeek};
pub use tags::{deserialize_tags, serialize_tags};
pub use types::{parse_id32, ItemId, Tag};
pub use validation::{item_signer_address, sign_item, signing_message, verify_item};
