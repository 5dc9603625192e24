//! Property tests over generated items.

use proptest::prelude::*;

use databundle::{decode_bundle_with, verify_bundle, Bundle, BundlerConfig};
use databundle_testkit::generators::{item_from_params, ItemParams};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_bundle_roundtrip(params in prop::collection::vec(any::<ItemParams>(), 0..6)) {
        let items: Vec<_> = params.iter().map(item_from_params).collect();
        let ids: Vec<_> = items.iter().map(|i| i.id.unwrap()).collect();

        let bundle = Bundle::new(items).unwrap();
        let binary = bundle.binary_bytes().unwrap().clone();
        let mut decoded = decode_bundle_with(binary, &BundlerConfig::default()).unwrap();

        prop_assert_eq!(decoded.item_ids(), ids);
        for (item, p) in decoded.items.iter().zip(&params) {
            prop_assert_eq!(&item.tags, &p.tags);
            prop_assert_eq!(item.data.as_bytes().unwrap().as_ref(), p.data.as_slice());
        }
        prop_assert!(verify_bundle(&mut decoded).is_ok());
    }

    #[test]
    fn test_truncated_bundle_never_panics(
        params in prop::collection::vec(any::<ItemParams>(), 1..3),
        cut in any::<prop::sample::Index>(),
    ) {
        let items: Vec<_> = params.iter().map(item_from_params).collect();
        let binary = Bundle::new(items).unwrap().binary_bytes().unwrap().clone();
        let at = cut.index(binary.len());

        prop_assert!(decode_bundle_with(binary.slice(..at), &BundlerConfig::default()).is_err());
    }
}
