//! Greenbox execution layer.
//!
//! This crate contains the deterministic settlement logic for reward boxes: domain
//! registration, box purchases, node sales, the commit/reveal queue and the lucky fund.
//! Transactions run inside a [`Layer`] that buffers writes until the block commits.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution; height and timestamp come from [`BlockContext`].
//! - Box outcomes derive only from the resolved block hash and the action id.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Minimal execution pipeline (example)
//! ```rust,ignore
//! use greenbox_execution::{state_transition::execute_state_transition, BlockContext};
//!
//! # async fn example(
//! #     state: &mut greenbox_execution::Memory,
//! #     settings: &greenbox_types::greenbox::Settings,
//! #     window: &greenbox_execution::BlockHashWindow,
//! # ) -> anyhow::Result<()> {
//! // Height must be exactly `committed_height + 1`; the window ends at the previous block.
//! let result = execute_state_transition(
//!     state,
//!     settings,
//!     window,
//!     BlockContext::new(1, 1_700_000_000),
//!     vec![],
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod hash_window;
pub mod state_transition;
pub mod views;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


mod layer;

mod state;

pub use error::GreenboxError;
pub use hash_window::{BlockContext, BlockHashWindow, WindowError};
pub use layer::Layer;
#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
pub use state::{nonce, PrepareError, State, Status};
