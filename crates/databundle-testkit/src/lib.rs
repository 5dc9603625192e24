//! # Databundle Testkit
//!
//! Testing utilities for databundle.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Deterministic Ed25519 items with every intermediate value pinned
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: One signer per scheme and a scratch directory for streaming tests
//!
//! ## Golden Vectors
//!
//! ```rust
//! use databundle_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, detail) in verify_all_vectors() {
//!     assert!(matches, "{}: {}", name, detail);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use databundle_testkit::generators::{item_from_params, ItemParams};
//!
//! proptest! {
//!     #[test]
//!     fn item_id_is_deterministic(params: ItemParams) {
//!         let i1 = item_from_params(&params);
//!         let i2 = item_from_params(&params);
//!         prop_assert_eq!(i1.id, i2.id);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use databundle_testkit::fixtures::{ed25519_signer, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let item = fixture.make_item(&ed25519_signer(), b"initial data", vec![]);
//! assert!(item.id.is_some());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{all_signers, signer_for, TestFixture};
pub use generators::{item_from_params, ItemParams};
pub use vectors::{all_vectors, generate_item_from_vector, verify_all_vectors, GoldenVector};
