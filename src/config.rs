use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use relay_monitor_consensus::ClientConfig;
use relay_monitor_types::{epoch_at_slot, Epoch, Slot};

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Beacon node connection
    pub consensus: ConsensusConfig,
    /// Chain parameters
    pub chain: ChainConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Beacon node API endpoint
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Idle connections kept per host
    pub max_idle_connections: usize,
    /// Entries per cache
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Network name
    pub network: String,
    /// Slots in an epoch
    pub slots_per_epoch: u64,
    /// Slot duration in seconds
    pub seconds_per_slot: u64,
    /// Unix timestamp of slot 0
    pub genesis_time: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level
    pub level: String,
    /// Enable JSON logging
    pub json: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5052".to_string(),
            timeout: 30,
            max_idle_connections: 128,
            cache_capacity: 128,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: "mainnet".to_string(),
            slots_per_epoch: 32,
            seconds_per_slot: 12,
            genesis_time: 1_606_824_023,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ConsensusConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            request_timeout: Duration::from_secs(self.timeout),
            max_idle_per_host: self.max_idle_connections,
            cache_capacity: self.cache_capacity,
        }
    }
}

impl ChainConfig {
    /// Slot in progress at `now`; slot 0 before genesis.
    pub fn current_slot(&self, now: SystemTime) -> Slot {
        let now = now
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        now.saturating_sub(self.genesis_time) / self.seconds_per_slot
    }
    
    pub fn current_epoch(&self, now: SystemTime) -> Epoch {
        epoch_at_slot(self.current_slot(now), self.slots_per_epoch)
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context("Failed to read configuration file")?;
        
        let config: Config = toml::from_str(&content)
            .context("Failed to parse configuration")?;
        
        config.validate()?;
        
        Ok(config)
    }
    
    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;
        
        fs::write(path, content)
            .context("Failed to write configuration file")?;
        
        Ok(())
    }
    
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let endpoint = &self.consensus.endpoint;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            anyhow::bail!("consensus endpoint must be an http(s) URL, got {:?}", endpoint);
        }
        
        if self.consensus.timeout == 0 {
            anyhow::bail!("timeout must be greater than 0");
        }
        
        if self.consensus.cache_capacity == 0 {
            anyhow::bail!("cache_capacity must be greater than 0");
        }
        
        if self.chain.slots_per_epoch == 0 {
            anyhow::bail!("slots_per_epoch must be greater than 0");
        }
        
        if self.chain.seconds_per_slot == 0 {
            anyhow::bail!("seconds_per_slot must be greater than 0");
        }
        
        Ok(())
    }
    
    /// Get configuration for specific network
    pub fn for_network(network: &str) -> Result<Self> {
        let mut config = Config::default();
        
        config.chain.genesis_time = match network.to_lowercase().as_str() {
            "mainnet" | "main" => 1_606_824_023,
            "sepolia" => 1_655_733_600,
            "holesky" => 1_695_902_400,
            _ => anyhow::bail!("Unknown network: {}", network),
        };
        config.chain.network = network.to_lowercase();
        
        Ok(config)
    }
}
