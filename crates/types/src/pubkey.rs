use crate::{Result, TypesError};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const BLS_PUBLIC_KEY_LEN: usize = 48;

/// Compressed BLS12-381 public key identifying a validator.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlsPublicKey([u8; BLS_PUBLIC_KEY_LEN]);

impl BlsPublicKey {
    pub fn from_bytes(bytes: [u8; BLS_PUBLIC_KEY_LEN]) -> Self {
        BlsPublicKey(bytes)
    }
    
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != BLS_PUBLIC_KEY_LEN {
            return Err(TypesError::InvalidLength {
                expected: BLS_PUBLIC_KEY_LEN,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; BLS_PUBLIC_KEY_LEN];
        bytes.copy_from_slice(slice);
        Ok(BlsPublicKey(bytes))
    }
    
    pub fn repeat_byte(byte: u8) -> Self {
        BlsPublicKey([byte; BLS_PUBLIC_KEY_LEN])
    }
}

impl FromStr for BlsPublicKey {
    type Err = TypesError;
    
    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        
        if s.len() != BLS_PUBLIC_KEY_LEN * 2 {
            return Err(TypesError::InvalidLength {
                expected: BLS_PUBLIC_KEY_LEN * 2,
                actual: s.len(),
            });
        }
        
        let bytes = hex::decode(s).map_err(|_| TypesError::InvalidHex(s.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsPublicKey({})", self)
    }
}

impl From<[u8; BLS_PUBLIC_KEY_LEN]> for BlsPublicKey {
    fn from(bytes: [u8; BLS_PUBLIC_KEY_LEN]) -> Self {
        BlsPublicKey::from_bytes(bytes)
    }
}

impl Serialize for BlsPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlsPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_pubkey_from_str() {
        let hex = format!("0x{}", "a1".repeat(48));
        let key = BlsPublicKey::from_str(&hex).unwrap();
        assert_eq!(key, BlsPublicKey::repeat_byte(0xa1));
        assert_eq!(key.to_string(), hex);
        
        // Prefix is optional on input
        let bare = BlsPublicKey::from_str(&"a1".repeat(48)).unwrap();
        assert_eq!(bare, key);
    }
    
    #[test]
    fn test_pubkey_rejects_bad_input() {
        assert!(matches!(
            BlsPublicKey::from_str("0x1234"),
            Err(TypesError::InvalidLength { expected: 96, actual: 4 })
        ));
        assert!(matches!(
            BlsPublicKey::from_str(&"zz".repeat(48)),
            Err(TypesError::InvalidHex(_))
        ));
        assert!(BlsPublicKey::from_slice(&[0u8; 32]).is_err());
    }
    
    #[test]
    fn test_pubkey_json() {
        let key = BlsPublicKey::repeat_byte(0x07);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "07".repeat(48)));
        
        let decoded: BlsPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, key);
        
        assert!(serde_json::from_str::<BlsPublicKey>("\"0xdead\"").is_err());
    }
}
