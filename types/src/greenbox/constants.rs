/// Scale of the raw chance/ratio inputs accepted by domain registration (parts per 10 000).
pub const RAW_CHANCE_SCALE: u32 = 10_000;

/// Scale of the converted tier boundaries (a box value is a `u16`).
pub const CHANCE_SCALE: u32 = 65_536;

/// Largest cumulative boundary a 16-bit field can hold.
pub const MAX_CUMULATIVE_CHANCE: u32 = u16::MAX as u32;

/// Number of tier boundaries per domain (four chance tiers, then four ratio tiers).
pub const TIER_COUNT: usize = 8;

/// Bit 15 of a purchase amount selects the seed-payment path.
pub const SEED_PAYMENT_FLAG: u16 = 0x8000;

/// Bits 0..=14 of a purchase amount carry the box count.
pub const BOX_AMOUNT_MASK: u16 = 0x7FFF;

/// Node ids live in the 23 low bits of the domain word's node field.
pub const MAX_NODE_ID: u32 = (1 << 23) - 1;

/// Node revenue shares are whole percentages.
pub const MAX_NODE_PERCENTAGE: u8 = 100;

/// Largest price exponent a domain may configure (`10^decimal` base units per box).
pub const MAX_DECIMAL: u8 = 18;

/// Default number of queue entries one `RevealBoxes` call may process.
pub const DEFAULT_REVEAL_BATCH: u32 = 64;

/// Default block hash lookback (matches the EVM `BLOCKHASH` window).
pub const DEFAULT_LOOKBACK: u64 = 256;

/// Maximum pixel map attached to a purchase.
pub const MAX_PIXELS_LENGTH: usize = 1_024;

/// Maximum ids accepted by a single `RevealBoxesWithHash`.
pub const MAX_REVEAL_WITH_HASH: usize = 512;

/// Maximum length of a rejection reason.
pub const MAX_REASON_LENGTH: usize = 128;

/// Decoding bound for append-only id indexes.
pub const MAX_INDEX_LENGTH: usize = 1 << 24;

/// Decoding bound for the pending and overtime queues.
pub const MAX_QUEUE_LENGTH: usize = 1 << 20;
