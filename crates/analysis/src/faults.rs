use relay_monitor_types::BlsPublicKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a relay, usually its public URL.
pub type RelayId = String;

/// Fault counters per validator public key.
pub type FaultRecord = HashMap<BlsPublicKey, Faults>;

/// Categories a bid or payload observation can be counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    TotalBids,
    MalformedBids,
    ConsensusInvalidBids,
    PaymentInvalidBids,
    IgnoredPreferencesBids,
    MalformedPayloads,
    ConsensusInvalidPayloads,
    UnavailablePayloads,
}

impl FaultKind {
    pub const ALL: [FaultKind; 8] = [
        FaultKind::TotalBids,
        FaultKind::MalformedBids,
        FaultKind::ConsensusInvalidBids,
        FaultKind::PaymentInvalidBids,
        FaultKind::IgnoredPreferencesBids,
        FaultKind::MalformedPayloads,
        FaultKind::ConsensusInvalidPayloads,
        FaultKind::UnavailablePayloads,
    ];
}

/// Independent tallies; `total_bids` is not the sum of the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faults {
    pub total_bids: u64,
    pub malformed_bids: u64,
    pub consensus_invalid_bids: u64,
    pub payment_invalid_bids: u64,
    pub ignored_preferences_bids: u64,
    pub malformed_payloads: u64,
    pub consensus_invalid_payloads: u64,
    pub unavailable_payloads: u64,
}

impl Faults {
    fn counter_mut(&mut self, kind: FaultKind) -> &mut u64 {
        match kind {
            FaultKind::TotalBids => &mut self.total_bids,
            FaultKind::MalformedBids => &mut self.malformed_bids,
            FaultKind::ConsensusInvalidBids => &mut self.consensus_invalid_bids,
            FaultKind::PaymentInvalidBids => &mut self.payment_invalid_bids,
            FaultKind::IgnoredPreferencesBids => &mut self.ignored_preferences_bids,
            FaultKind::MalformedPayloads => &mut self.malformed_payloads,
            FaultKind::ConsensusInvalidPayloads => &mut self.consensus_invalid_payloads,
            FaultKind::UnavailablePayloads => &mut self.unavailable_payloads,
        }
    }
    
    pub fn record(&mut self, kind: FaultKind) {
        let counter = self.counter_mut(kind);
        *counter = counter.saturating_add(1);
    }
    
    pub fn count(&self, kind: FaultKind) -> u64 {
        match kind {
            FaultKind::TotalBids => self.total_bids,
            FaultKind::MalformedBids => self.malformed_bids,
            FaultKind::ConsensusInvalidBids => self.consensus_invalid_bids,
            FaultKind::PaymentInvalidBids => self.payment_invalid_bids,
            FaultKind::IgnoredPreferencesBids => self.ignored_preferences_bids,
            FaultKind::MalformedPayloads => self.malformed_payloads,
            FaultKind::ConsensusInvalidPayloads => self.consensus_invalid_payloads,
            FaultKind::UnavailablePayloads => self.unavailable_payloads,
        }
    }
}

/// Fault records of every observed relay.
///
/// Owned by a single analysis pipeline; there is no internal locking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultLedger {
    relays: HashMap<RelayId, FaultRecord>,
}

impl FaultLedger {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn record(&mut self, relay: &str, public_key: BlsPublicKey, kind: FaultKind) {
        self.relays
            .entry(relay.to_string())
            .or_default()
            .entry(public_key)
            .or_default()
            .record(kind);
    }
    
    pub fn faults(&self, relay: &str, public_key: &BlsPublicKey) -> Option<&Faults> {
        self.relays.get(relay)?.get(public_key)
    }
    
    pub fn relays(&self) -> impl Iterator<Item = (&RelayId, &FaultRecord)> {
        self.relays.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_counters_are_independent() {
        let key = BlsPublicKey::repeat_byte(1);
        let other = BlsPublicKey::repeat_byte(2);
        let mut record = FaultRecord::new();
        record.entry(other).or_default().record(FaultKind::TotalBids);
        
        record.entry(key).or_default().record(FaultKind::MalformedBids);
        record.entry(key).or_default().record(FaultKind::MalformedBids);
        
        let faults = &record[&key];
        assert_eq!(faults.malformed_bids, 2);
        for kind in FaultKind::ALL {
            if kind != FaultKind::MalformedBids {
                assert_eq!(faults.count(kind), 0, "{:?}", kind);
            }
        }
        assert_eq!(record[&other].total_bids, 1);
        assert_eq!(record[&other].malformed_bids, 0);
    }
    
    #[test]
    fn test_record_matches_count() {
        let mut faults = Faults::default();
        for (n, kind) in FaultKind::ALL.into_iter().enumerate() {
            for _ in 0..=n {
                faults.record(kind);
            }
        }
        for (n, kind) in FaultKind::ALL.into_iter().enumerate() {
            assert_eq!(faults.count(kind), n as u64 + 1);
        }
    }
    
    #[test]
    fn test_ledger_per_relay() {
        let key = BlsPublicKey::repeat_byte(9);
        let mut ledger = FaultLedger::new();
        
        ledger.record("https://relay-a.example", key, FaultKind::TotalBids);
        ledger.record("https://relay-a.example", key, FaultKind::UnavailablePayloads);
        ledger.record("https://relay-b.example", key, FaultKind::TotalBids);
        
        let a = ledger.faults("https://relay-a.example", &key).unwrap();
        assert_eq!(a.total_bids, 1);
        assert_eq!(a.unavailable_payloads, 1);
        
        let b = ledger.faults("https://relay-b.example", &key).unwrap();
        assert_eq!(b.unavailable_payloads, 0);
        
        assert!(ledger.faults("https://relay-c.example", &key).is_none());
        assert_eq!(ledger.relays().count(), 2);
    }
    
    #[test]
    fn test_json_field_names() {
        let mut faults = Faults::default();
        faults.record(FaultKind::IgnoredPreferencesBids);
        
        let json = serde_json::to_value(&faults).unwrap();
        assert_eq!(json["ignored_preferences_bids"], 1);
        assert_eq!(json["total_bids"], 0);
        assert_eq!(json.as_object().unwrap().len(), 8);
    }
}
