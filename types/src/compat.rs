#![cfg(test)]
use crate::execution::{Event, Greenized, Instruction, Key, Value};
use crate::greenbox::{
    Address, Asset, DomainConfig, GreenAction, Word256, SEED_PAYMENT_FLAG,
};
use commonware_codec::Encode;

#[test]
fn key_encoding_is_stable() {
    assert_eq!(Key::Commit.encode().as_ref(), &[1u8]);
    assert_eq!(Key::Domain(1).encode().as_ref(), &[10u8, 0, 1]);
    assert_eq!(Key::Action(0x0102_0304).encode().as_ref(), &[11u8, 1, 2, 3, 4]);
    assert_eq!(Key::RevealQueue.encode().as_ref(), &[13u8]);

    let mut expected = vec![19u8, 1];
    expected.extend_from_slice(&[0xAB; 20]);
    assert_eq!(
        Key::Balance(Asset::Seed, Address([0xAB; 20])).encode().as_ref(),
        expected.as_slice()
    );
}

#[test]
fn index_encoding_is_packed_big_endian() {
    assert_eq!(
        Value::ActionIds(vec![1, 0x0100]).encode().as_ref(),
        &[15u8, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 1, 0]
    );
}

#[test]
fn register_domain_encoding_is_stable() {
    let raw = DomainConfig {
        box_top: 200_000,
        chances: [15, 200, 1000, 0],
        ratios: [500, 1500, 0, 0],
        decimal: 8,
        ..Default::default()
    };
    let instruction = Instruction::RegisterDomain {
        domain_id: 1,
        packed: raw.to_word(),
        reset_sold: false,
    };

    let mut expected = vec![10u8, 0, 1];
    expected.extend_from_slice(&[0, 0, 0, 0]);
    expected.extend_from_slice(&200_000u32.to_be_bytes());
    for v in [15u16, 200, 1000, 0, 500, 1500, 0, 0] {
        expected.extend_from_slice(&v.to_be_bytes());
    }
    expected.push(8);
    expected.extend_from_slice(&[0; 3]);
    expected.extend_from_slice(&[0; 4]);
    expected.push(0);
    assert_eq!(instruction.encode().as_ref(), expected.as_slice());
}

#[test]
fn green_action_word_is_stable() {
    let green = GreenAction {
        commit_block: 100,
        domain_id: 1,
        box_start: 123,
        box_amount: SEED_PAYMENT_FLAG | 234,
        actor: Address([0x11; 20]),
    };
    let expected = Word256::from_hex(
        "0x0000006400010000007b80ea1111111111111111111111111111111111111111",
    )
    .expect("valid word");
    assert_eq!(green.to_word(), expected);
}

#[test]
fn greenized_event_encoding_is_stable() {
    let event = Event::DomainGreenized(Greenized {
        actor: Address([0x22; 20]),
        action_id: 1,
        commit_block: 7,
        domain_id: 1,
        box_start: 0,
        box_amount: 123,
    });

    let mut expected = vec![31u8];
    expected.extend_from_slice(&[0x22; 20]);
    expected.extend_from_slice(&[0, 0, 0, 1]);
    expected.extend_from_slice(&[0, 0, 0, 7]);
    expected.extend_from_slice(&[0, 1]);
    expected.extend_from_slice(&[0, 0, 0, 0]);
    expected.extend_from_slice(&[0, 123]);
    assert_eq!(event.encode().as_ref(), expected.as_slice());
}
