//! Serde helpers for the beacon API's JSON conventions.

/// Integers encoded as decimal strings, e.g. `"slot": "4096"`.
///
/// Bare JSON numbers are accepted on input as well.
pub mod quoted_u64 {
    use serde::{de, Deserializer, Serializer};
    use std::fmt;
    
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }
    
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(QuotedU64Visitor)
    }
    
    struct QuotedU64Visitor;
    
    impl<'de> de::Visitor<'de> for QuotedU64Visitor {
        type Value = u64;
        
        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer or a decimal string")
        }
        
        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }
        
        fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
            value.parse().map_err(|_| E::custom(format!("invalid decimal integer: {value:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Duty {
        #[serde(with = "super::quoted_u64")]
        slot: u64,
    }
    
    #[test]
    fn test_quoted_u64() {
        let duty: Duty = serde_json::from_str(r#"{"slot":"4096"}"#).unwrap();
        assert_eq!(duty.slot, 4096);
        assert_eq!(serde_json::to_string(&duty).unwrap(), r#"{"slot":"4096"}"#);
        
        let bare: Duty = serde_json::from_str(r#"{"slot":12}"#).unwrap();
        assert_eq!(bare.slot, 12);
        
        assert!(serde_json::from_str::<Duty>(r#"{"slot":"twelve"}"#).is_err());
        assert!(serde_json::from_str::<Duty>(r#"{"slot":"-1"}"#).is_err());
    }
}
