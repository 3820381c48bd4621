//! Property tests for the packed words and the outcome decoder.

use super::*;
use commonware_codec::{Encode, ReadExt};
use commonware_cryptography::sha256::Digest;
use proptest::prelude::*;

fn arb_word() -> impl Strategy<Value = Word256> {
    prop::array::uniform32(any::<u8>()).prop_map(Word256)
}

fn arb_raw_config() -> impl Strategy<Value = DomainConfig> {
    (
        any::<u32>(),
        prop::array::uniform4(0u16..=2_500),
        prop::array::uniform4(0u16..=2_500),
        0u8..=MAX_DECIMAL,
    )
        .prop_map(|(box_top, chances, ratios, decimal)| DomainConfig {
            box_top,
            chances,
            ratios,
            decimal,
            ..Default::default()
        })
}

proptest! {
    #[test]
    fn domain_word_round_trips(word in arb_word()) {
        prop_assert_eq!(DomainConfig::from_word(&word).to_word(), word);
    }

    #[test]
    fn action_word_round_trips(word in arb_word()) {
        let green = GreenAction::from_word(&word);
        prop_assert_eq!(green.to_word(), word);

        let encoded = green.encode();
        prop_assert_eq!(GreenAction::read(&mut &encoded[..]).unwrap(), green);
    }

    #[test]
    fn accumulated_boundaries_never_decrease(raw in arb_raw_config()) {
        // Eight fields of at most 25% each can still overflow; both outcomes are valid.
        match raw.accumulate() {
            Ok(stored) => {
                prop_assert!(stored.is_cumulative());
                prop_assert_eq!(stored.box_top, raw.box_top);
                prop_assert_eq!(
                    DomainConfig::from_word(&stored.to_word()),
                    stored
                );
            }
            Err(PackError::ChanceOverflow { total, max }) => prop_assert!(total > max),
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn decoder_is_deterministic(
        raw in arb_raw_config(),
        action_id in any::<u32>(),
        boxes in 0u16..=512,
        hash in prop::array::uniform32(any::<u8>()),
    ) {
        let Ok(stored) = raw.accumulate() else {
            return Ok(());
        };
        let hash = Digest(hash);
        let first = calculate_gifts(&stored.boundaries(), action_id, boxes, &hash);
        let second = calculate_gifts(&stored.boundaries(), action_id, boxes, &hash);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.total_wins() as usize, first.won.len());
        prop_assert!(first.won.iter().all(|won| won.offset < boxes));
        prop_assert!(first.won.windows(2).all(|pair| pair[0].offset < pair[1].offset));
    }
}
