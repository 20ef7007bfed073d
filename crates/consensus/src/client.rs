use prometheus::Registry;
use relay_monitor_types::{epoch_at_slot, BlsPublicKey, Epoch, Hash, Slot, ValidatorIndex};
use std::ops::Range;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{BeaconApi, ValidatorRecord};
use crate::cache::BoundedCache;
use crate::metrics::CacheMetrics;
use crate::status::ValidatorStatus;
use crate::stream::HeadStream;
use crate::{ClientConfig, ConsensusError, Result};

/// Validator scheduled to propose a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidatorInfo {
    pub public_key: BlsPublicKey,
    pub index: ValidatorIndex,
}

/// Cached view of beacon chain state, filled on demand from a beacon node.
///
/// Accessors prefixed with `get_` only read the caches; `fetch_` methods go
/// to the node on a miss. Fetches are not retried and may be cancelled by
/// dropping the returned future.
pub struct ConsensusClient {
    api: Arc<dyn BeaconApi>,
    
    // slot -> ValidatorInfo
    proposers: BoundedCache<Slot, ValidatorInfo>,
    // slot -> execution block hash
    execution_hashes: BoundedCache<Slot, Hash>,
    // public key -> validator record
    validators: BoundedCache<BlsPublicKey, ValidatorRecord>,
    
    metrics: CacheMetrics,
}

impl ConsensusClient {
    /// Create a client with empty caches.
    pub fn build(api: Arc<dyn BeaconApi>, config: &ClientConfig, registry: &Registry) -> Result<Self> {
        let metrics = CacheMetrics::new(registry)?;
        
        let proposers = BoundedCache::new(config.cache_capacity, metrics.proposer_cache_length.clone())?;
        let execution_hashes = BoundedCache::new(config.cache_capacity, metrics.execution_cache_length.clone())?;
        let validators = BoundedCache::new(config.cache_capacity, metrics.validator_cache_length.clone())?;
        
        Ok(Self {
            api,
            proposers,
            execution_hashes,
            validators,
            metrics,
        })
    }
    
    /// Create a client and warm its caches around `current_slot`.
    ///
    /// Warmup failures are logged and never fail construction.
    pub async fn new(
        api: Arc<dyn BeaconApi>,
        config: &ClientConfig,
        registry: &Registry,
        current_slot: Slot,
        slots_per_epoch: u64,
    ) -> Result<Self> {
        let client = Self::build(api, config, registry)?;
        client.load_current_context(current_slot, slots_per_epoch).await;
        Ok(client)
    }
    
    /// Slots whose execution hashes are loaded during warmup:
    /// `[max(0, current_slot - slots_per_epoch), slots_per_epoch)`.
    ///
    /// The window is empty once `current_slot` reaches two epochs.
    pub fn warmup_window(current_slot: Slot, slots_per_epoch: u64) -> Range<Slot> {
        current_slot.saturating_sub(slots_per_epoch)..slots_per_epoch
    }
    
    async fn load_current_context(&self, current_slot: Slot, slots_per_epoch: u64) {
        let current_epoch = epoch_at_slot(current_slot, slots_per_epoch);
        
        for slot in Self::warmup_window(current_slot, slots_per_epoch) {
            if let Err(e) = self.fetch_execution_hash(slot).await {
                warn!("could not fetch latest execution hash for slot {}: {}", slot, e);
            }
        }
        
        for epoch in [current_epoch, current_epoch + 1] {
            if let Err(e) = self.fetch_proposers(epoch).await {
                warn!("could not load consensus state for epoch {}: {}", epoch, e);
            }
        }
        
        if let Err(e) = self.fetch_validators().await {
            warn!("could not load validators: {}", e);
        }
        
        info!(
            current_slot,
            current_epoch,
            execution_hashes = self.execution_hashes.len(),
            proposers = self.proposers.len(),
            validators = self.validators.len(),
            "loaded consensus context"
        );
    }
    
    pub fn get_proposer(&self, slot: Slot) -> Result<ValidatorInfo> {
        self.proposers
            .get(&slot)
            .ok_or(ConsensusError::ProposerNotFound(slot))
    }
    
    pub fn get_proposer_public_key(&self, slot: Slot) -> Result<BlsPublicKey> {
        self.get_proposer(slot).map(|validator| validator.public_key)
    }
    
    /// Load the proposer schedule of `epoch`.
    ///
    /// Nothing is cached unless the whole duty list was retrieved.
    pub async fn fetch_proposers(&self, epoch: Epoch) -> Result<()> {
        let duties = self.api.proposer_duties(epoch).await?;
        
        for duty in &duties {
            self.proposers.add(
                duty.slot,
                ValidatorInfo {
                    public_key: duty.pubkey,
                    index: duty.validator_index,
                },
            );
        }
        
        debug!(epoch, duties = duties.len(), "cached proposer duties");
        Ok(())
    }
    
    pub fn get_execution_hash(&self, slot: Slot) -> Result<Hash> {
        self.execution_hashes
            .get(&slot)
            .ok_or(ConsensusError::ExecutionHashNotFound(slot))
    }
    
    /// Execution block hash of `slot`, read through the cache.
    ///
    /// A skipped slot inherits the hash of the nearest earlier cached slot.
    pub async fn fetch_execution_hash(&self, slot: Slot) -> Result<Hash> {
        if let Ok(hash) = self.get_execution_hash(slot) {
            return Ok(hash);
        }
        
        let block = match self.api.signed_block(slot).await? {
            Some(block) => block,
            None => return self.backfill_execution_hash(slot),
        };
        
        let hash = block.execution_block_hash()?;
        self.execution_hashes.add(slot, hash);
        
        Ok(hash)
    }
    
    /// Propagate the nearest earlier cached hash forward through `slot`.
    ///
    /// Assumes no block was produced between that ancestor and `slot`.
    fn backfill_execution_hash(&self, slot: Slot) -> Result<Hash> {
        let (ancestor, hash) = self
            .execution_hashes
            .last_before(&slot)
            .ok_or(ConsensusError::BackfillExhausted(slot))?;
        
        // Anything older than the capacity would be evicted by the newer fills
        let capacity = self.execution_hashes.capacity() as u64;
        let first = (ancestor + 1).max(slot.saturating_add(1).saturating_sub(capacity));
        for filled in first..=slot {
            self.execution_hashes.add(filled, hash);
        }
        
        debug!(slot, ancestor, %hash, "backfilled execution hash");
        Ok(hash)
    }
    
    /// Execution hash the block at `slot` should build on.
    pub async fn get_parent_hash(&self, slot: Slot) -> Result<Hash> {
        let target = slot
            .checked_sub(1)
            .ok_or(ConsensusError::BackfillExhausted(slot))?;
        
        match self.get_execution_hash(target) {
            Ok(hash) => Ok(hash),
            Err(_) => self.fetch_execution_hash(target).await,
        }
    }
    
    /// Load the validator set of the head state.
    pub async fn fetch_validators(&self) -> Result<()> {
        let validators = self
            .api
            .state_validators()
            .await?
            .ok_or(ConsensusError::ValidatorsUnavailable)?;
        
        for validator in validators {
            self.validators.add(validator.validator.pubkey, validator);
        }
        
        Ok(())
    }
    
    pub fn get_validator(&self, public_key: &BlsPublicKey) -> Result<ValidatorRecord> {
        self.validators
            .get(public_key)
            .ok_or(ConsensusError::ValidatorNotFound(*public_key))
    }
    
    pub fn get_validator_status(&self, public_key: &BlsPublicKey) -> Result<ValidatorStatus> {
        let validator = self.get_validator(public_key)?;
        Ok(ValidatorStatus::classify(&validator.status))
    }
    
    /// Follow the node's canonical head until `cancel` fires.
    pub fn stream_heads(&self, cancel: CancellationToken) -> HeadStream {
        HeadStream::spawn(self.api.clone(), cancel)
    }
    
    /// Forget proposer and execution-hash entries at or after `slot`.
    ///
    /// Meant for consumers that observe a reorganization; entries are
    /// otherwise never invalidated.
    pub fn invalidate_from(&self, slot: Slot) {
        let proposers = self.proposers.remove_from(&slot);
        let hashes = self.execution_hashes.remove_from(&slot);
        info!(slot, proposers, hashes, "invalidated cached consensus state");
    }
    
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}
