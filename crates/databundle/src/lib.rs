//! # Databundle
//!
//! Build, sign, pack and verify data items for a content-addressed ledger.
//!
//! ## Overview
//!
//! - **Items**: signed records with an owner key, optional target and
//!   anchor, tags, and a payload. The item id is the SHA-256 of its signature.
//! - **Bundles**: an ordered container of encoded items with an index of
//!   lengths and ids.
//! - **Schemes**: RSA-PSS (ledger-native), Ed25519, secp256k1 with address
//!   recovery, and Ed25519 under the Solana profile.
//!
//! Every codec operation comes in a buffered form and a streaming form over
//! a seekable [`DataSource`]; the two produce identical bytes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use databundle::{Bundler, Ed25519Signer, Tag};
//!
//! fn example() -> databundle::Result<()> {
//!     let bundler = Bundler::new(Ed25519Signer::generate());
//!
//!     let item = bundler.create_and_sign_item(
//!         b"ar foo".to_vec(),
//!         None,
//!         None,
//!         vec![Tag::new("Content-Type", "application/txt")],
//!     )?;
//!
//!     let bundle = bundler.bundle(vec![item])?;
//!     let binary = bundle.binary_bytes().cloned().unwrap_or_default();
//!
//!     let decoded = bundler.decode_bundle(binary)?;
//!     assert_eq!(decoded.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `databundle::core` - Codecs, schemes, signers and the deep hash

pub mod bundler;
pub mod config;
pub mod error;

pub use databundle_core as core;

pub use bundler::{
    bundle_tags, check_reserved_tags, decode_bundle_stream_with, decode_bundle_with,
    reserved_tags, verify_bundle, Bundler, BUNDLE_FORMAT, BUNDLE_FORMAT_TAG, BUNDLE_VERSION,
    BUNDLE_VERSION_TAG,
};
pub use config::BundlerConfig;
pub use error::{BundlerError, Result};

// Re-export commonly used core types
pub use databundle_core::{
    decode_item, decode_item_stream, encode_item, encode_item_stream, parse_id32, sign_item,
    verify_item, write_bundle_stream, write_item_stream, ArweaveSigner, Bundle, BundleItem,
    CoreError, DataSource, Ed25519Signer, EthereumSigner, ItemId, ItemSigner, Payload,
    SignatureType, Tag, VerifyError,
};
