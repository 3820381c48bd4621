//! Wire types shared by the greenbox execution layer and its off-chain tooling.
//!
//! Everything persisted or emitted by execution is defined here together with its
//! `commonware-codec` encoding. The packed 256-bit words in [`greenbox`] are the external
//! interface consumed by indexers and must stay bit-compatible.

pub mod execution;
pub mod greenbox;

pub use execution::{
    genesis_block, transaction_namespace, Account, Block, Event, Greenized, Instruction, Key,
    Output, Transaction, Value, NAMESPACE,
};

#[cfg(test)]
mod compat;
