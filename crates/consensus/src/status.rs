use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse validator lifecycle state derived from the beacon node's status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorStatus {
    Active,
    Pending,
    Unknown,
}

impl ValidatorStatus {
    /// Classify a raw status such as `active_ongoing` or `pending_queued`.
    ///
    /// Anything that is neither active nor pending is `Unknown`.
    pub fn classify(raw: &str) -> Self {
        if raw.contains("active") {
            ValidatorStatus::Active
        } else if raw.contains("pending") {
            ValidatorStatus::Pending
        } else {
            ValidatorStatus::Unknown
        }
    }
}

impl fmt::Display for ValidatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorStatus::Active => write!(f, "active"),
            ValidatorStatus::Pending => write!(f, "pending"),
            ValidatorStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_classify() {
        assert_eq!(ValidatorStatus::classify("active_ongoing"), ValidatorStatus::Active);
        assert_eq!(ValidatorStatus::classify("active_exiting"), ValidatorStatus::Active);
        assert_eq!(ValidatorStatus::classify("active_slashed"), ValidatorStatus::Active);
        assert_eq!(ValidatorStatus::classify("pending_queued"), ValidatorStatus::Pending);
        assert_eq!(ValidatorStatus::classify("pending_initialized"), ValidatorStatus::Pending);
        assert_eq!(ValidatorStatus::classify("exited_unslashed"), ValidatorStatus::Unknown);
        assert_eq!(ValidatorStatus::classify("withdrawal_done"), ValidatorStatus::Unknown);
        assert_eq!(ValidatorStatus::classify(""), ValidatorStatus::Unknown);
    }
}
