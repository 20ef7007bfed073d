use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

use crate::{ConsensusError, Result};

/// Population gauges for the consensus caches.
///
/// Each client owns its own set, registered into the registry handed to it
/// at construction.
#[derive(Clone)]
pub struct CacheMetrics {
    pub proposer_cache_length: IntGauge,
    pub execution_cache_length: IntGauge,
    pub validator_cache_length: IntGauge,
    registry: Registry,
}

impl CacheMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let proposer_cache_length = IntGauge::new(
            "relay_monitor_proposer_cache_length",
            "The size of the proposer cache",
        )?;
        let execution_cache_length = IntGauge::new(
            "relay_monitor_execution_cache_length",
            "The size of the execution cache",
        )?;
        let validator_cache_length = IntGauge::new(
            "relay_monitor_validator_cache_length",
            "The size of the validator cache",
        )?;
        
        registry.register(Box::new(proposer_cache_length.clone()))?;
        registry.register(Box::new(execution_cache_length.clone()))?;
        registry.register(Box::new(validator_cache_length.clone()))?;
        
        proposer_cache_length.set(0);
        execution_cache_length.set(0);
        validator_cache_length.set(0);
        
        Ok(Self {
            proposer_cache_length,
            execution_cache_length,
            validator_cache_length,
            registry: registry.clone(),
        })
    }
    
    /// Render every metric in the owning registry in the text exposition format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ConsensusError::Decode(e.to_string()))
    }
}
