//! Proof of work.
//!
//! Difficulty is counted in leading zero hex digits of the block hash, so
//! each unit is four bits of work.

use rand::Rng;
use shared_types::{Block, Hash, Transaction};

/// Upper bound for the difficulty: a hash has 64 hex digits.
pub const MAX_DIFFICULTY: u32 = 64;

/// How many nonces are tried between two cancellation checks.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Number of leading `0` hex digits in `hash`.
pub fn leading_zero_hex_digits(hash: &Hash) -> u32 {
    let mut digits = 0;
    for byte in hash {
        if *byte == 0 {
            digits += 2;
            continue;
        }
        if byte >> 4 == 0 {
            digits += 1;
        }
        break;
    }
    digits
}

pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    leading_zero_hex_digits(hash) >= difficulty
}

/// Whether the block's hash carries enough work.
pub fn is_valid(block: &Block, difficulty: u32) -> bool {
    meets_difficulty(&block.hash(), difficulty)
}

/// Search random nonces until the block meets `difficulty`.
///
/// Blocking. `cancelled` is polled every [`CANCEL_CHECK_INTERVAL`] attempts;
/// returns `None` once it reports true.
pub fn search<F>(
    prev_hash: Hash,
    transactions: Vec<Transaction>,
    difficulty: u32,
    cancelled: F,
) -> Option<Block>
where
    F: Fn() -> bool,
{
    let mut block = Block::new(prev_hash, [0u8; 32], transactions);
    let mut rng = rand::thread_rng();
    let mut attempts: u64 = 0;

    loop {
        if attempts % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
            return None;
        }
        rng.fill(&mut block.nonce[..]);
        if is_valid(&block, difficulty) {
            return Some(block);
        }
        attempts = attempts.wrapping_add(1);
    }
}
