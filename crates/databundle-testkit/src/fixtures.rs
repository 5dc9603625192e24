//! Test fixtures and helpers.
//!
//! Deterministic signers for every scheme and a scratch directory for
//! streaming tests.

use std::io::{Seek, Write};
use std::path::Path;

use bytes::Bytes;
use databundle_core::{
    new_item, sign_item, ArweaveSigner, BundleItem, DataSource, Ed25519Signer, EthereumSigner,
    ItemSigner, SignatureType, Tag,
};
use tempfile::{NamedTempFile, TempDir};

/// A fixed 4096-bit RSA key (PKCS#8). Generating one per test is too slow.
pub const RSA_4096_PEM: &str = include_str!("../fixtures/rsa_4096.pem");

/// A fixed secp256k1 private key.
pub const ETHEREUM_KEY_HEX: &str =
    "1f534ac18009182c07d266fe4a7903c0bcc8a66190f0967b719b2b3974a69c2f";

/// Seed for the Ed25519 and Solana fixtures.
pub const ED25519_SEED: [u8; 32] = [0x42; 32];

pub fn arweave_signer() -> ArweaveSigner {
    ArweaveSigner::from_pkcs8_pem(RSA_4096_PEM).expect("fixture RSA key is valid")
}

pub fn ed25519_signer() -> Ed25519Signer {
    Ed25519Signer::from_seed(&ED25519_SEED)
}

pub fn solana_signer() -> Ed25519Signer {
    Ed25519Signer::from_seed(&ED25519_SEED).solana()
}

pub fn ethereum_signer() -> EthereumSigner {
    EthereumSigner::from_hex(ETHEREUM_KEY_HEX).expect("fixture secp256k1 key is valid")
}

/// The fixture signer for a scheme.
pub fn signer_for(scheme: SignatureType) -> Box<dyn ItemSigner> {
    match scheme {
        SignatureType::Arweave => Box::new(arweave_signer()),
        SignatureType::Ed25519 => Box::new(ed25519_signer()),
        SignatureType::Ethereum => Box::new(ethereum_signer()),
        SignatureType::Solana => Box::new(solana_signer()),
    }
}

/// One fixture signer per registered scheme, in scheme-id order.
pub fn all_signers() -> Vec<Box<dyn ItemSigner>> {
    SignatureType::ALL.iter().map(|s| signer_for(*s)).collect()
}

/// A scratch directory for streaming sinks, removed on drop.
pub struct TestFixture {
    pub dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A file-backed source holding `data`, rewound.
    pub fn file_source(&self, data: &[u8]) -> DataSource {
        let mut file = NamedTempFile::new_in(self.path()).expect("create source file");
        file.write_all(data).expect("write source file");
        file.rewind().expect("rewind source file");
        DataSource::Temp(file)
    }

    /// Number of entries currently in the scratch directory.
    pub fn file_count(&self) -> usize {
        std::fs::read_dir(self.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// A signed in-memory item.
    pub fn make_item(&self, signer: &dyn ItemSigner, data: &[u8], tags: Vec<Tag>) -> BundleItem {
        let mut item = new_item(
            signer.owner(),
            signer.signature_type(),
            None,
            None,
            Bytes::copy_from_slice(data),
            tags,
        )
        .expect("build item");
        sign_item(&mut item, signer).expect("sign item");
        item
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
