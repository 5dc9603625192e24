//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use databundle_core::{new_item, sign_item, BundleItem, Ed25519Signer, ItemSigner, Tag};

/// Generate a tag with short printable name and value.
pub fn tag() -> impl Strategy<Value = Tag> {
    ("[A-Za-z0-9-]{0,16}", "\\PC{0,32}").prop_map(|(name, value)| Tag::new(name, value))
}

/// Generate an ordered tag list, duplicates allowed.
pub fn tags(max: usize) -> impl Strategy<Value = Vec<Tag>> {
    prop::collection::vec(tag(), 0..=max)
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate an optional 32-byte target or anchor.
pub fn optional_id() -> impl Strategy<Value = Option<[u8; 32]>> {
    any::<Option<[u8; 32]>>()
}

/// Parameters for generating an Ed25519-signed item.
#[derive(Debug, Clone)]
pub struct ItemParams {
    pub seed: [u8; 32],
    pub solana: bool,
    pub target: Option<[u8; 32]>,
    pub anchor: Option<[u8; 32]>,
    pub tags: Vec<Tag>,
    pub data: Vec<u8>,
}

impl Arbitrary for ItemParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(),
            any::<bool>(),
            optional_id(),
            optional_id(),
            tags(8),
            payload(2048),
        )
            .prop_map(|(seed, solana, target, anchor, tags, data)| ItemParams {
                seed,
                solana,
                target,
                anchor,
                tags,
                data,
            })
            .boxed()
    }
}

impl ItemParams {
    pub fn signer(&self) -> Ed25519Signer {
        let signer = Ed25519Signer::from_seed(&self.seed);
        if self.solana {
            signer.solana()
        } else {
            signer
        }
    }
}

/// Build and sign an item from parameters.
pub fn item_from_params(params: &ItemParams) -> BundleItem {
    let signer = params.signer();
    let mut item = new_item(
        signer.owner(),
        signer.signature_type(),
        params.target,
        params.anchor,
        Bytes::from(params.data.clone()),
        params.tags.clone(),
    )
    .expect("generated item is well formed");
    sign_item(&mut item, &signer).expect("generated item signs");
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use databundle_core::{decode_item, deserialize_tags, serialize_tags, verify_item};

    proptest! {
        #[test]
        fn test_tags_roundtrip(tags in tags(16)) {
            let bytes = serialize_tags(&tags);
            prop_assert_eq!(deserialize_tags(&bytes).unwrap(), tags);
        }

        #[test]
        fn test_item_id_deterministic(params: ItemParams) {
            let i1 = item_from_params(&params);
            let i2 = item_from_params(&params);
            prop_assert_eq!(i1.id, i2.id);
            prop_assert_eq!(i1.binary, i2.binary);
        }

        #[test]
        fn test_decoded_item_verifies(params: ItemParams) {
            let item = item_from_params(&params);
            let mut decoded = decode_item(item.binary.clone().unwrap()).unwrap();

            prop_assert_eq!(decoded.id, item.id);
            prop_assert_eq!(decoded.target, params.target);
            prop_assert_eq!(decoded.anchor, params.anchor);
            prop_assert_eq!(&decoded.tags, &params.tags);
            prop_assert_eq!(decoded.data.as_bytes().unwrap().as_ref(), params.data.as_slice());
            prop_assert!(verify_item(&mut decoded).is_ok());
        }

        #[test]
        fn test_different_payload_different_id(
            seed in any::<[u8; 32]>(),
            p1 in payload(100),
            p2 in payload(100),
        ) {
            prop_assume!(p1 != p2);

            let base = ItemParams {
                seed,
                solana: false,
                target: None,
                anchor: None,
                tags: vec![],
                data: p1,
            };
            let other = ItemParams { data: p2, ..base.clone() };

            prop_assert_ne!(item_from_params(&base).id, item_from_params(&other).id);
        }
    }
}
