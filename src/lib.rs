// Core modules
pub mod config;

// Re-export commonly used types
pub use config::{ChainConfig, Config, ConsensusConfig, LogConfig};

// Re-export crate modules
pub use relay_monitor_analysis as analysis;
pub use relay_monitor_consensus as consensus;
pub use relay_monitor_types as types;
