pub mod hash;
pub mod pubkey;
pub mod serde_utils;

pub use hash::{Hash, Root, H256};
pub use pubkey::BlsPublicKey;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Consensus-layer time unit.
pub type Slot = u64;
/// Fixed-length group of slots.
pub type Epoch = u64;
pub type ValidatorIndex = u64;
pub type Gwei = u64;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),
    
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, TypesError>;

/// A position on the beacon chain: the slot of a block and its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub slot: Slot,
    pub root: Root,
}

impl Coordinate {
    pub fn new(slot: Slot, root: Root) -> Self {
        Self { slot, root }
    }
}

/// Epoch containing `slot`.
pub fn epoch_at_slot(slot: Slot, slots_per_epoch: u64) -> Epoch {
    slot / slots_per_epoch
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_epoch_arithmetic() {
        assert_eq!(epoch_at_slot(0, 32), 0);
        assert_eq!(epoch_at_slot(31, 32), 0);
        assert_eq!(epoch_at_slot(32, 32), 1);
        assert_eq!(epoch_at_slot(100, 32), 3);
    }
}
