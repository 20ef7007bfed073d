use relay_monitor_types::{BlsPublicKey, Epoch, Slot};
use std::time::Duration;
use thiserror::Error;

pub mod api;
pub mod cache;
pub mod client;
pub mod metrics;
pub mod sse;
pub mod status;
pub mod stream;

pub use api::{BeaconApi, EventStream, HttpBeaconApi, ProposerDuty, SignedBeaconBlock, ValidatorRecord};
pub use cache::BoundedCache;
pub use client::{ConsensusClient, ValidatorInfo};
pub use metrics::CacheMetrics;
pub use status::ValidatorStatus;
pub use stream::{decode_head_event, HeadStream};

/// Capacity shared by the proposer, execution-hash and validator caches.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("could not find proposer for slot {0}")]
    ProposerNotFound(Slot),
    
    #[error("could not find execution hash for slot {0}")]
    ExecutionHashNotFound(Slot),
    
    #[error("missing validator entry for public key {0}")]
    ValidatorNotFound(BlsPublicKey),
    
    #[error("could not fetch proposer duties in epoch {epoch} because node is syncing")]
    NodeSyncing { epoch: Epoch },
    
    #[error("no execution hashes present before slot {0} (inclusive)")]
    BackfillExhausted(Slot),
    
    #[error("block at slot {0} has no execution payload")]
    MissingExecutionPayload(Slot),
    
    #[error("could not fetch validators from remote endpoint because they do not exist")]
    ValidatorsUnavailable,
    
    #[error("Transport error: {0}")]
    Transport(String),
    
    #[error("Decode error: {0}")]
    Decode(String),
    
    #[error("Request to {url} failed with status: {status}")]
    Status { status: u16, url: String },
    
    #[error("Malformed head event: {0}")]
    MalformedHeadEvent(String),
    
    #[error("Cache capacity must be greater than 0")]
    InvalidCacheCapacity,
    
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl ConsensusError {
    /// Whether the error is a plain cache miss.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ConsensusError::ProposerNotFound(_)
                | ConsensusError::ExecutionHashNotFound(_)
                | ConsensusError::ValidatorNotFound(_)
        )
    }
}

impl From<reqwest::Error> for ConsensusError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ConsensusError::Decode(err.to_string())
        } else {
            ConsensusError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Settings for talking to a beacon node.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the beacon node API
    pub endpoint: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Idle connections kept open to the node
    pub max_idle_per_host: usize,
    /// Capacity of each of the three caches
    pub cache_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5052".to_string(),
            request_timeout: Duration::from_secs(30),
            max_idle_per_host: 128,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}
