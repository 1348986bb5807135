//! # Domain Layer for the Ledger
//!
//! Pure state with no I/O.
//!
//! ## Contents
//!
//! - **pow**: difficulty check and nonce search
//! - **block_store**: every accepted block, chain walks
//! - **fork_index**: fork tips and the longest chain
//! - **state**: materialized filenames, identities, assets and votes
//! - **pool**: transactions waiting for a block
//! - **value_objects**: settings, snapshots, block outcomes
//!
//! ## Lock Order
//!
//! Fork Index → Block Store → Ledger State → Pool. Block handling holds the
//! fork index write lock for its whole duration, which serializes blocks.

mod block_store;
mod fork_index;
mod pool;
pub mod pow;
mod state;
mod value_objects;

pub use block_store::*;
pub use fork_index::*;
pub use pool::*;
pub use state::*;
pub use value_objects::*;
