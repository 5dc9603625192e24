//! Cryptographic primitives for the databundle core.
//!
//! Wraps the three unrelated signature systems behind one signing
//! capability ([`ItemSigner`]) and one verification entry point per scheme.
//!
//! - RSA-4096 PSS over SHA-256 (ledger-native)
//! - Ed25519 (also used under the Solana key profile)
//! - secp256k1 ECDSA with public-key recovery over the Ethereum
//!   personal-message hash

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature as DalekSignature, Signer as _, SigningKey, Verifier, VerifyingKey};
use k256::ecdsa::{
    RecoveryId, Signature as EcdsaSignature, SigningKey as EcdsaSigningKey,
    VerifyingKey as EcdsaVerifyingKey,
};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384};
use sha3::Keccak256;
use std::fmt;

use crate::error::{CoreError, Result, VerifyError};
use crate::scheme::SignatureType;

/// RSA public exponent used by every ledger-native key.
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// PSS salt length used when signing (the SHA-256 output size).
const PSS_SALT_LEN: usize = 32;

/// Compute SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compute SHA-384.
pub fn sha384(data: &[u8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    out.copy_from_slice(&Sha384::digest(data));
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Signing capability
// ─────────────────────────────────────────────────────────────────────────────

/// A signing capability for one signature scheme.
///
/// The orchestrator only sees the declared scheme, the owner key in wire
/// form, and raw signatures over the deep-hash message.
pub trait ItemSigner {
    /// The scheme this signer produces signatures for.
    fn signature_type(&self) -> SignatureType;

    /// The owner public key, exactly as it is laid out on the wire.
    fn owner(&self) -> Vec<u8>;

    /// Sign the deep-hash message.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;

    /// The signer's address under its scheme.
    fn address(&self) -> Result<String> {
        self.signature_type().derive_address(&self.owner())
    }
}

impl<T: ItemSigner + ?Sized> ItemSigner for Box<T> {
    fn signature_type(&self) -> SignatureType {
        (**self).signature_type()
    }

    fn owner(&self) -> Vec<u8> {
        (**self).owner()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        (**self).sign(message)
    }
}

/// Ledger-native RSA-4096 PSS signer.
#[derive(Clone)]
pub struct ArweaveSigner {
    key: RsaPrivateKey,
}

impl ArweaveSigner {
    /// Wrap an RSA private key. The modulus must be exactly 4096 bits.
    pub fn new(key: RsaPrivateKey) -> Result<Self> {
        let expected = SignatureType::Arweave.public_key_length();
        if key.size() != expected {
            return Err(CoreError::MalformedField(format!(
                "rsa modulus must be {} bytes, got {}",
                expected,
                key.size()
            )));
        }
        Ok(Self { key })
    }

    /// Load from a PKCS#8 PEM document.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| CoreError::MalformedField(format!("pkcs8 key: {e}")))?;
        Self::new(key)
    }

    /// Load from a PKCS#1 PEM document.
    pub fn from_pkcs1_pem(pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| CoreError::MalformedField(format!("pkcs1 key: {e}")))?;
        Self::new(key)
    }
}

impl ItemSigner for ArweaveSigner {
    fn signature_type(&self) -> SignatureType {
        SignatureType::Arweave
    }

    fn owner(&self) -> Vec<u8> {
        left_pad(&self.key.n().to_bytes_be(), SignatureType::Arweave.public_key_length())
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let hashed = Sha256::digest(message);
        let mut rng = rand::thread_rng();
        self.key
            .sign_with_rng(&mut rng, Pss::new::<Sha256>(), &hashed)
            .map_err(|e| CoreError::Signing(e.to_string()))
    }
}

impl fmt::Debug for ArweaveSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArweaveSigner({})", arweave_address(&self.owner()))
    }
}

/// Ed25519 signer, for either the plain Ed25519 or the Solana scheme id.
#[derive(Clone)]
pub struct Ed25519Signer {
    key: SigningKey,
    scheme: SignatureType,
}

impl Ed25519Signer {
    /// Create from a 32-byte seed (scheme 2).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
            scheme: SignatureType::Ed25519,
        }
    }

    /// Generate a new random key (scheme 2).
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            key: SigningKey::generate(&mut rng),
            scheme: SignatureType::Ed25519,
        }
    }

    /// Label signatures with the Solana scheme id instead.
    pub fn solana(mut self) -> Self {
        self.scheme = SignatureType::Solana;
        self
    }
}

impl ItemSigner for Ed25519Signer {
    fn signature_type(&self) -> SignatureType {
        self.scheme
    }

    fn owner(&self) -> Vec<u8> {
        self.key.verifying_key().to_bytes().to_vec()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ed25519Signer({}, {})",
            self.scheme,
            bs58::encode(self.key.verifying_key().as_bytes()).into_string()
        )
    }
}

/// secp256k1 signer producing 65-byte recoverable signatures (r ‖ s ‖ v).
#[derive(Clone)]
pub struct EthereumSigner {
    key: EcdsaSigningKey,
}

impl EthereumSigner {
    /// Parse a hex-encoded 32-byte private key (with or without `0x`).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(s).map_err(|e| CoreError::MalformedField(format!("private key: {e}")))?;
        let key = EcdsaSigningKey::from_slice(&bytes)
            .map_err(|_| CoreError::MalformedField("invalid secp256k1 private key".into()))?;
        Ok(Self { key })
    }

    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            key: EcdsaSigningKey::random(&mut rng),
        }
    }
}

impl ItemSigner for EthereumSigner {
    fn signature_type(&self) -> SignatureType {
        SignatureType::Ethereum
    }

    fn owner(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let prehash = ethereum_message_hash(message);
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(&prehash)
            .map_err(|e| CoreError::Signing(e.to_string()))?;

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&sig.to_bytes());
        out.push(recid.to_byte() + 27);
        Ok(out)
    }
}

impl fmt::Debug for EthereumSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = address_of(self.key.verifying_key());
        write!(f, "EthereumSigner({})", checksum_address(&addr))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Verification primitives
// ─────────────────────────────────────────────────────────────────────────────

/// Verify an RSA-PSS signature. `owner` is the big-endian modulus.
///
/// Accepts both the digest-length salt and the maximal salt, so signatures
/// from signers that use either convention verify.
pub(crate) fn rsa_pss_verify(
    owner: &[u8],
    message: &[u8],
    signature: &[u8],
) -> std::result::Result<(), VerifyError> {
    let key = RsaPublicKey::new(
        BigUint::from_bytes_be(owner),
        BigUint::from(RSA_PUBLIC_EXPONENT),
    )
    .map_err(|e| VerifyError::MalformedField(format!("rsa owner: {e}")))?;

    let hashed = Sha256::digest(message);
    let max_salt = key.size().saturating_sub(PSS_SALT_LEN + 2);

    for salt_len in [PSS_SALT_LEN, max_salt] {
        let scheme = Pss::new_with_salt::<Sha256>(salt_len);
        if key.verify(scheme, &hashed, signature).is_ok() {
            return Ok(());
        }
    }
    Err(VerifyError::SignatureInvalid("rsa-pss verification failed".into()))
}

/// Verify an Ed25519 signature. `owner` is the raw 32-byte public key.
pub(crate) fn ed25519_verify(
    owner: &[u8],
    message: &[u8],
    signature: &[u8],
) -> std::result::Result<(), VerifyError> {
    let key_bytes: [u8; 32] = owner
        .try_into()
        .map_err(|_| VerifyError::MalformedField("ed25519 owner must be 32 bytes".into()))?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| VerifyError::SignatureInvalid("invalid ed25519 public key".into()))?;
    let sig = DalekSignature::from_slice(signature)
        .map_err(|_| VerifyError::MalformedField("ed25519 signature must be 64 bytes".into()))?;

    verifying_key
        .verify(message, &sig)
        .map_err(|_| VerifyError::SignatureInvalid("ed25519 verification failed".into()))
}

/// Verify a recoverable secp256k1 signature by recovering the signer and
/// comparing its address with the address of `owner`.
pub(crate) fn ethereum_verify(
    owner: &[u8],
    message: &[u8],
    signature: &[u8],
) -> std::result::Result<(), VerifyError> {
    if signature.len() != 65 {
        return Err(VerifyError::MalformedField(
            "ethereum signature must be 65 bytes".into(),
        ));
    }
    let expected = ethereum_address(owner)?;

    let mut sig = EcdsaSignature::from_slice(&signature[..64])
        .map_err(|_| VerifyError::SignatureInvalid("invalid ecdsa signature".into()))?;
    let v = signature[64];
    let v = if v >= 27 { v - 27 } else { v };
    let mut recid = RecoveryId::from_byte(v)
        .ok_or_else(|| VerifyError::SignatureInvalid(format!("invalid recovery id {v}")))?;

    // High-S signatures recover the same key once normalized with the parity flipped
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
    }

    let prehash = ethereum_message_hash(message);
    let recovered = EcdsaVerifyingKey::recover_from_prehash(&prehash, &sig, recid)
        .map_err(|_| VerifyError::SignatureInvalid("public key recovery failed".into()))?;

    if address_of(&recovered) != expected {
        return Err(VerifyError::SignatureInvalid(
            "recovered signer does not match owner".into(),
        ));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Address derivation
// ─────────────────────────────────────────────────────────────────────────────

/// Ledger-native address: base64url(SHA-256(modulus)).
pub fn arweave_address(owner: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(sha256(owner))
}

/// Raw 20-byte Ethereum address of an uncompressed SEC1 public key.
pub fn ethereum_address(owner: &[u8]) -> Result<[u8; 20]> {
    let key = EcdsaVerifyingKey::from_sec1_bytes(owner)
        .map_err(|_| CoreError::MalformedField("owner is not a secp256k1 public key".into()))?;
    Ok(address_of(&key))
}

fn address_of(key: &EcdsaVerifyingKey) -> [u8; 20] {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    out
}

/// EIP-55 mixed-case checksum encoding of an address.
pub fn checksum_address(addr: &[u8; 20]) -> String {
    let lower = hex::encode(addr);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Keccak-256 of the Ethereum personal-message envelope around `message`.
pub fn ethereum_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes.to_vec();
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(bytes);
    out
}
