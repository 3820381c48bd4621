//! Greenbox domain types.
//!
//! Defines domain/action/node records, the packed words consumed by indexers, the
//! energy ledger records, the manager-signed commands, and the pure outcome decoder.

mod address;
mod codec;
mod constants;
mod domain;
mod action;
mod gifts;
mod ledger;
mod node;
mod signed;
mod word;

pub use action::*;
pub use address::*;
pub use codec::{read_bytes, read_reason, reason_encode_size, write_reason};
pub use constants::*;
pub use domain::*;
pub use gifts::*;
pub use ledger::*;
pub use node::*;
pub use signed::*;
pub use word::*;

#[cfg(test)]
mod tests;
