//! Golden test vectors for deterministic verification.
//!
//! Ed25519 signatures are deterministic, so an Ed25519 or Solana item built
//! from a fixed seed has fixed bytes end to end: tag blob, deep hash,
//! signature, id and full encoding. Every implementation must reproduce them.

use bytes::Bytes;
use serde::Serialize;

use databundle_core::{
    crypto::sha256, encode_item, new_item, sign_item, signing_message, BundleItem, Ed25519Signer,
    ItemSigner, SignatureType, Tag,
};

/// A golden test vector.
#[derive(Debug, Clone, Serialize)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Ed25519 seed.
    pub seed: [u8; 32],
    /// Scheme id (Ed25519 or Solana).
    pub scheme: u16,
    pub target: Option<[u8; 32]>,
    pub anchor: Option<[u8; 32]>,
    pub tags: Vec<(&'static str, &'static str)>,
    pub data: &'static [u8],

    // Expected outputs (hex unless noted)
    pub expected_owner: &'static str,
    pub expected_tags: &'static str,
    pub expected_message: &'static str,
    pub expected_signature: &'static str,
    /// Base64url.
    pub expected_id: &'static str,
    pub expected_len: usize,
    /// SHA-256 of the full encoding.
    pub expected_binary_sha256: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    let mut counting = [0u8; 32];
    for (i, b) in counting.iter_mut().enumerate() {
        *b = i as u8;
    }

    vec![
        GoldenVector {
            name: "ed25519 ar foo with content type",
            seed: [0x42; 32],
            scheme: 2,
            target: None,
            anchor: None,
            tags: vec![("Content-Type", "application/txt")],
            data: b"ar foo",
            expected_owner: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_tags: "0218436f6e74656e742d547970651e6170706c69636174696f6e2f74787400",
            expected_message: "8833ef755ea64d3215576d8f61919e2d413902a863ed2d9b\
                               2cf7883929c90501e5a4669126c442fa7addcbbd00ef1b64",
            expected_signature: "4842249ed04069266872a0d68a5b551b2c5cdc4fa39134a9b974640c0ba60276\
                                 5b9882848b2b5e95ad84d1335f702a3548de97e82f97e5457627dd8d3c41370f",
            expected_id: "J4OsbJ3WayQxZsNHlxk7th3utbRZ0Kfog1Mg7-UbrZ4",
            expected_len: 153,
            expected_binary_sha256:
                "a1b0eaf0dfa4cce7d429e70358acc24a8c2b4a1d9e0a44d93cb1594c7e3c8e1b",
        },
        GoldenVector {
            name: "solana with target, anchor and duplicate tags",
            seed: [0x07; 32],
            scheme: 4,
            target: Some([0xaa; 32]),
            anchor: Some(counting),
            tags: vec![("App-Name", "golden"), ("App-Name", "dup")],
            data: b"",
            expected_owner: "ea4a6c63e29c520abef5507b132ec5f9954776aebebe7b92421eea691446d22c",
            expected_tags: "04104170702d4e616d650c676f6c64656e104170702d4e616d650664757000",
            expected_message: "c1694ab1a1842324298c8cab50e92dd3898fd42a71b9f60a\
                               ae6fee7e9984b4867d8e0b5c4280c407625128608e2bc269",
            expected_signature: "c00cd78a0b2a3fb9efce258ac7808438c003a84eac5035e9b6e4146f2d6107be\
                                 28c6246abd517b66621f946c7612199fa27283041316867d9699693038eaf902",
            expected_id: "Br-GnZy5tBFZQPHpyL2RPgd57m2BMu2xs_BQjj5cXnE",
            expected_len: 211,
            expected_binary_sha256:
                "9d916c781bc1f67c8087b900cade31fa31bb0ad2bd2bce342fccca9c15b432bc",
        },
        GoldenVector {
            name: "ed25519 empty item",
            seed: [0x00; 32],
            scheme: 2,
            target: None,
            anchor: None,
            tags: vec![],
            data: b"",
            expected_owner: "3b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29",
            expected_tags: "",
            expected_message: "4ec9e4e7e118f6accf0a38bee985759e00cdd03a79f64603\
                               20173a9ad197383d3f49f2bf5a33579cbb84390972d18ce9",
            expected_signature: "f3918c93f7d6cf7379a9478593705a6c3c140d25069e9ffba8752ff27e462116\
                                 5fc5ab60c6d00930184e916e5d7853b09805829d8077f6831d53d6257506990f",
            expected_id: "WdxUE9yEg8t-RdNG6EtyjMvl0RW1xGOIS6jRVKg0-tY",
            expected_len: 116,
            expected_binary_sha256:
                "b2092f25d09eec58b87c9b36b21174029267458633515c75cb4c258ee835a5cf",
        },
    ]
}

/// Bundle of the first two vectors, in order.
pub const GOLDEN_BUNDLE_LEN: usize = 524;

/// SHA-256 of [the golden bundle](GOLDEN_BUNDLE_LEN).
pub const GOLDEN_BUNDLE_SHA256: &str =
    "eca35c6e2d2b7a653dbb0f2623f70303992154281eea822a938c02391b31d35d";

/// The signer a vector is built with.
pub fn signer_from_vector(vector: &GoldenVector) -> Ed25519Signer {
    let signer = Ed25519Signer::from_seed(&vector.seed);
    if vector.scheme == SignatureType::Solana.to_u16() {
        signer.solana()
    } else {
        signer
    }
}

/// Build and sign the item described by a vector.
pub fn generate_item_from_vector(vector: &GoldenVector) -> BundleItem {
    let signer = signer_from_vector(vector);
    let tags = vector
        .tags
        .iter()
        .map(|(n, v)| Tag::new(*n, *v))
        .collect();

    let mut item = new_item(
        signer.owner(),
        signer.signature_type(),
        vector.target,
        vector.anchor,
        Bytes::from_static(vector.data),
        tags,
    )
    .expect("vector item is well formed");
    sign_item(&mut item, &signer).expect("vector item signs");
    item
}

/// Check every vector. Returns `(name, matches, first mismatching field)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let mismatch = first_mismatch(v);
            (v.name.to_string(), mismatch.is_none(), mismatch.unwrap_or_default())
        })
        .collect()
}

fn first_mismatch(vector: &GoldenVector) -> Option<String> {
    let mut item = generate_item_from_vector(vector);
    let message = match signing_message(&mut item) {
        Ok(m) => m,
        Err(e) => return Some(format!("message: {e}")),
    };
    let binary = match encode_item(&mut item) {
        Ok(b) => b,
        Err(e) => return Some(format!("binary: {e}")),
    };

    let checks = [
        ("owner", hex::encode(&item.owner), vector.expected_owner.to_string()),
        (
            "tags",
            hex::encode(item.tags_encoded.clone().unwrap_or_default()),
            vector.expected_tags.to_string(),
        ),
        ("message", hex::encode(message), vector.expected_message.to_string()),
        ("signature", hex::encode(&item.signature), vector.expected_signature.to_string()),
        (
            "id",
            item.id.map(|id| id.to_b64()).unwrap_or_default(),
            vector.expected_id.to_string(),
        ),
        ("len", binary.len().to_string(), vector.expected_len.to_string()),
        (
            "binary",
            hex::encode(sha256(&binary)),
            vector.expected_binary_sha256.to_string(),
        ),
    ];

    checks
        .into_iter()
        .find(|(_, got, want)| got != want)
        .map(|(field, got, want)| format!("{field}: got {got}, want {want}"))
}

/// The vectors as pretty JSON, for sharing with other implementations.
pub fn vectors_json() -> String {
    serde_json::to_string_pretty(&all_vectors()).unwrap_or_default()
}
