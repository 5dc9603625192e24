//! Item signing and verification.

use crate::codec::encode_item;
use crate::crypto::{sha256, ItemSigner};
use crate::deep_hash::{deep_hash, Chunk};
use crate::error::{CoreError, Result, VerifyError};
use crate::item::BundleItem;
use crate::source::Payload;
use crate::tags::serialize_tags;
use crate::types::ItemId;

/// Format marker, the first field of every signed message.
const FORMAT_NAME: &[u8] = b"dataitem";

/// Format version, the second field of every signed message.
const FORMAT_VERSION: &[u8] = b"1";

/// Compute the message that is signed for `item`: the deep hash of
///
/// ```text
/// ["dataitem", "1", scheme id, owner, target, anchor, tags, data]
/// ```
///
/// Absent target and anchor hash as empty blobs. A source payload is
/// streamed and rewound.
pub fn signing_message(item: &mut BundleItem) -> Result<[u8; 48]> {
    if item.tags_encoded.is_none() {
        item.tags_encoded = Some(serialize_tags(&item.tags));
    }
    let scheme_id = item.signature_type.to_u16().to_string();
    let tags = item.tags_encoded.as_deref().unwrap_or_default();
    let target = item.target.as_ref().map_or(&[][..], |t| &t[..]);
    let anchor = item.anchor.as_ref().map_or(&[][..], |a| &a[..]);

    let data = match &mut item.data {
        Payload::Bytes(b) => Chunk::Blob(&b[..]),
        Payload::Source(s) => Chunk::Stream(s),
    };

    deep_hash(Chunk::List(vec![
        Chunk::Blob(FORMAT_NAME),
        Chunk::Blob(FORMAT_VERSION),
        Chunk::Blob(scheme_id.as_bytes()),
        Chunk::Blob(&item.owner),
        Chunk::Blob(target),
        Chunk::Blob(anchor),
        Chunk::Blob(tags),
        data,
    ]))
}

/// Sign `item` in place.
///
/// Sets the signature and `id = SHA-256(signature)`. For an in-memory
/// payload the full encoding is also cached in `binary`.
pub fn sign_item(item: &mut BundleItem, signer: &dyn ItemSigner) -> Result<()> {
    // 1. Signer must produce the item's scheme
    let scheme = signer.signature_type();
    if scheme != item.signature_type {
        return Err(CoreError::SchemeMismatch {
            signer: scheme.to_u16(),
            item: item.signature_type.to_u16(),
        });
    }

    // 2. Sign the deep hash
    let message = signing_message(item)?;
    let signature = signer.sign(&message)?;
    if signature.len() != scheme.signature_length() {
        return Err(CoreError::Signing(format!(
            "{} signer returned {} bytes, expected {}",
            scheme,
            signature.len(),
            scheme.signature_length()
        )));
    }

    // 3. Derive id and finalize
    item.id = Some(ItemId::from_bytes(sha256(&signature)));
    item.signature = signature;
    item.binary = None;
    if !item.data.is_source() {
        item.binary = Some(encode_item(item)?);
    }

    tracing::debug!(
        "signed item {} ({})",
        item.id.map(|id| id.to_b64()).unwrap_or_default(),
        scheme
    );
    Ok(())
}

/// Verify a signed item.
///
/// The id check runs first and does not depend on the scheme. The
/// signature is then checked against the recomputed deep hash.
pub fn verify_item(item: &mut BundleItem) -> std::result::Result<(), VerifyError> {
    // 1. Signed at all
    if !item.is_signed() {
        return Err(VerifyError::NotSigned);
    }

    // 2. Id is the hash of the signature
    let actual = ItemId::from_bytes(sha256(&item.signature));
    let expected = item.id.ok_or(VerifyError::NotSigned)?;
    if actual != expected {
        return Err(VerifyError::IdMismatch { expected, actual });
    }

    // 3. Field lengths fixed by the scheme
    let scheme = item.signature_type;
    if item.signature.len() != scheme.signature_length() {
        return Err(VerifyError::MalformedField(format!(
            "signature must be {} bytes for {}, got {}",
            scheme.signature_length(),
            scheme,
            item.signature.len()
        )));
    }
    if item.owner.len() != scheme.public_key_length() {
        return Err(VerifyError::MalformedField(format!(
            "owner must be {} bytes for {}, got {}",
            scheme.public_key_length(),
            scheme,
            item.owner.len()
        )));
    }

    // 4. Signature over the deep hash
    let message = signing_message(item)?;
    scheme.verify(&item.owner, &message, &item.signature)
}

/// The address of whoever signed `item`.
pub fn item_signer_address(item: &BundleItem) -> Result<String> {
    item.signer_address()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Ed25519Signer, EthereumSigner};
    use crate::item::new_item;
    use crate::scheme::SignatureType;
    use crate::types::Tag;
    use bytes::Bytes;

    fn unsigned(signer: &dyn ItemSigner, data: &'static [u8]) -> BundleItem {
        new_item(
            signer.owner(),
            signer.signature_type(),
            None,
            None,
            Bytes::from_static(data),
            vec![Tag::new("Content-Type", "application/txt")],
        )
        .unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = Ed25519Signer::from_seed(&[0x42; 32]);
        let mut item = unsigned(&signer, b"ar foo");

        sign_item(&mut item, &signer).unwrap();
        assert_eq!(item.signature.len(), 64);
        assert_eq!(item.id.unwrap().0, sha256(&item.signature));
        assert!(item.binary.is_some());

        verify_item(&mut item).expect("signed item should verify");
    }

    #[test]
    fn test_scheme_mismatch() {
        let signer = Ed25519Signer::from_seed(&[1; 32]);
        let mut item = new_item(
            signer.owner(),
            SignatureType::Solana,
            None,
            None,
            Bytes::new(),
            vec![],
        )
        .unwrap();

        assert!(matches!(
            sign_item(&mut item, &signer),
            Err(CoreError::SchemeMismatch { signer: 2, item: 4 })
        ));
        assert!(!item.is_signed());
    }

    #[test]
    fn test_unsigned_item_fails_verify() {
        let signer = Ed25519Signer::from_seed(&[1; 32]);
        let mut item = unsigned(&signer, b"x");
        assert!(matches!(verify_item(&mut item), Err(VerifyError::NotSigned)));
    }

    #[test]
    fn test_tampered_data_fails() {
        let signer = EthereumSigner::generate();
        let mut item = unsigned(&signer, b"ar foo");
        sign_item(&mut item, &signer).unwrap();
        let id = item.id;

        item.data = Payload::from(b"ar fop".to_vec());
        assert!(matches!(
            verify_item(&mut item),
            Err(VerifyError::SignatureInvalid(_))
        ));
        assert_eq!(item.id, id);
    }

    #[test]
    fn test_tampered_signature_fails() {
        let signer = Ed25519Signer::from_seed(&[9; 32]);
        let mut item = unsigned(&signer, b"data");
        sign_item(&mut item, &signer).unwrap();

        item.signature[10] ^= 0x01;
        assert!(matches!(
            verify_item(&mut item),
            Err(VerifyError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_tag_cache_recomputed() {
        let signer = Ed25519Signer::from_seed(&[3; 32]);
        let mut item = unsigned(&signer, b"data");
        sign_item(&mut item, &signer).unwrap();

        item.tags_encoded = None;
        verify_item(&mut item).expect("recomputed tags should match");
    }

    #[test]
    fn test_message_covers_target() {
        let signer = Ed25519Signer::from_seed(&[5; 32]);
        let mut a = unsigned(&signer, b"data");
        let mut b = unsigned(&signer, b"data");
        b.target = Some([0; 32]);

        assert_ne!(signing_message(&mut a).unwrap(), signing_message(&mut b).unwrap());
    }

    #[test]
    fn test_signer_address() {
        let signer = Ed25519Signer::from_seed(&[5; 32]);
        let item = unsigned(&signer, b"");
        assert_eq!(item_signer_address(&item).unwrap(), signer.address().unwrap());
    }
}
