//! Signature scheme registry.
//!
//! Every item names its signature scheme with a `u16` on the wire. The
//! scheme fixes the signature length and the owner (public key) length, and
//! selects the verification and address-derivation procedure.
//!
//! The table is fixed by the wire protocol: an entry may never change
//! without allocating a new scheme id.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto;
use crate::error::{CoreError, Result, VerifyError};

/// Fixed field lengths for one signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeConfig {
    /// Wire identifier.
    pub scheme_id: u16,
    /// Signature length in bytes.
    pub signature_length: usize,
    /// Owner (public key) length in bytes.
    pub public_key_length: usize,
    /// Human-readable scheme name.
    pub name: &'static str,
}

/// Registry, indexed by `scheme_id - 1`.
static SCHEMES: [SchemeConfig; 4] = [
    SchemeConfig {
        scheme_id: 1,
        signature_length: 512,
        public_key_length: 512,
        name: "arweave",
    },
    SchemeConfig {
        scheme_id: 2,
        signature_length: 64,
        public_key_length: 32,
        name: "ed25519",
    },
    SchemeConfig {
        scheme_id: 3,
        signature_length: 65,
        public_key_length: 65,
        name: "ethereum",
    },
    SchemeConfig {
        scheme_id: 4,
        signature_length: 64,
        public_key_length: 32,
        name: "solana",
    },
];

/// The signature scheme of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum SignatureType {
    /// RSA-4096 PSS over SHA-256, the ledger's native scheme.
    Arweave = 1,
    /// Ed25519.
    Ed25519 = 2,
    /// secp256k1 ECDSA with public-key recovery.
    Ethereum = 3,
    /// Ed25519 under the Solana key profile.
    Solana = 4,
}

impl SignatureType {
    /// All registered schemes, in id order.
    pub const ALL: [SignatureType; 4] = [
        SignatureType::Arweave,
        SignatureType::Ed25519,
        SignatureType::Ethereum,
        SignatureType::Solana,
    ];

    /// Convert to u16 for serialization.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Try to parse from u16.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Arweave),
            2 => Some(Self::Ed25519),
            3 => Some(Self::Ethereum),
            4 => Some(Self::Solana),
            _ => None,
        }
    }

    /// Look up the registry entry for a wire id.
    pub fn lookup(value: u16) -> Result<Self> {
        Self::from_u16(value).ok_or(CoreError::UnsupportedScheme(value))
    }

    /// The registry entry for this scheme.
    pub fn config(self) -> &'static SchemeConfig {
        &SCHEMES[self as usize - 1]
    }

    pub fn signature_length(self) -> usize {
        self.config().signature_length
    }

    pub fn public_key_length(self) -> usize {
        self.config().public_key_length
    }

    /// Verify `signature` over the deep-hash `message` for the key in `owner`.
    pub fn verify(
        self,
        owner: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> std::result::Result<(), VerifyError> {
        match self {
            Self::Arweave => crypto::rsa_pss_verify(owner, message, signature),
            Self::Ed25519 | Self::Solana => crypto::ed25519_verify(owner, message, signature),
            Self::Ethereum => crypto::ethereum_verify(owner, message, signature),
        }
    }

    /// Derive the signer's address from an owner key.
    pub fn derive_address(self, owner: &[u8]) -> Result<String> {
        if owner.len() != self.public_key_length() {
            return Err(CoreError::MalformedField(format!(
                "owner must be {} bytes for {}, got {}",
                self.public_key_length(),
                self,
                owner.len()
            )));
        }
        match self {
            Self::Arweave => Ok(crypto::arweave_address(owner)),
            Self::Ed25519 | Self::Solana => Ok(bs58::encode(owner).into_string()),
            Self::Ethereum => crypto::ethereum_address(owner).map(|a| crypto::checksum_address(&a)),
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_roundtrip() {
        for scheme in SignatureType::ALL {
            let value = scheme.to_u16();
            assert_eq!(SignatureType::from_u16(value), Some(scheme));
            assert_eq!(scheme.config().scheme_id, value);
        }
    }

    #[test]
    fn test_registry_lengths() {
        assert_eq!(SignatureType::Arweave.signature_length(), 512);
        assert_eq!(SignatureType::Arweave.public_key_length(), 512);
        assert_eq!(SignatureType::Ed25519.signature_length(), 64);
        assert_eq!(SignatureType::Ed25519.public_key_length(), 32);
        assert_eq!(SignatureType::Ethereum.signature_length(), 65);
        assert_eq!(SignatureType::Ethereum.public_key_length(), 65);
        assert_eq!(SignatureType::Solana.signature_length(), 64);
        assert_eq!(SignatureType::Solana.public_key_length(), 32);
    }

    #[test]
    fn test_unknown_scheme() {
        assert!(matches!(
            SignatureType::lookup(0),
            Err(CoreError::UnsupportedScheme(0))
        ));
        assert!(matches!(
            SignatureType::lookup(5),
            Err(CoreError::UnsupportedScheme(5))
        ));
    }

    #[test]
    fn test_ed25519_address_is_base58() {
        let owner = [0u8; 32];
        let addr = SignatureType::Ed25519.derive_address(&owner).unwrap();
        assert_eq!(addr, "11111111111111111111111111111111");
        assert!(SignatureType::Solana.derive_address(&owner[..31]).is_err());
    }
}
