//! Property tests for environment value masking.

use proptest::prelude::*;

use spinx::config::{display_value, is_sensitive, mask_secret, merge_environment};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: A masked value never reveals the whole secret.
    #[test]
    fn property_mask_never_reveals_value(value in "[A-Za-z0-9]{1,64}") {
        let masked = mask_secret(&value);
        prop_assert!(!masked.contains(&value));
        prop_assert!(masked.contains("***"));
    }

    /// PROPERTY: Sensitive-looking keys are always masked, others shown verbatim.
    #[test]
    fn property_display_value_masks_sensitive_keys(
        prefix in "[A-Z]{0,8}",
        value in "[A-Za-z0-9]{1,64}",
    ) {
        let secret_key = format!("{prefix}_TOKEN");
        prop_assert!(!display_value(&secret_key, &value).contains(&value));

        let plain_key = format!("{prefix}_PORT");
        prop_assume!(!is_sensitive(&plain_key));
        prop_assert_eq!(display_value(&plain_key, &value), value);
    }

    /// PROPERTY: Explicit entries win over `.env` entries for the same key.
    #[test]
    fn property_explicit_environment_wins(
        file in proptest::collection::btree_map("[A-Z]{1,6}", "[a-z0-9]{0,8}", 0..8),
        explicit in proptest::collection::btree_map("[A-Z]{1,6}", "[a-z0-9]{0,8}", 0..8),
    ) {
        let merged = merge_environment(file.clone(), explicit.clone());
        for (key, value) in &explicit {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        for (key, value) in &file {
            if !explicit.contains_key(key) {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
        prop_assert!(merged.len() <= file.len() + explicit.len());
    }
}
