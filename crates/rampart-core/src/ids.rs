//! Identifier types.
//!
//! Every identifier is 16 random bytes, shown and serialized as lowercase
//! hex so it can be used directly as a storage key and a JSON map key.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; 16]);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(rand::random())
            }

            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            /// Convert to hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from hex string.
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let bytes = hex::decode(s)?;
                let arr: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| hex::FromHexError::InvalidStringLength)?;
                Ok(Self(arr))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(de::Error::custom)
            }
        }
    };
}

define_id!(
    /// A player's account identifier.
    PlayerId
);

define_id!(
    /// A network's identifier. Stable across renames.
    NetworkId
);

define_id!(
    /// A bastion's or acid block's identifier.
    ClaimId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn hex_roundtrip() {
        let id = NetworkId::from_bytes([7u8; 16]);
        assert_eq!(NetworkId::from_hex(&id.to_hex()).unwrap(), id);
        assert_eq!(id.to_string().len(), 32);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(PlayerId::from_hex("abcd").is_err());
        assert!("zz".parse::<ClaimId>().is_err());
    }

    #[test]
    fn random_ids_differ() {
        assert_ne!(ClaimId::random(), ClaimId::random());
    }

    #[test]
    fn usable_as_json_map_key() {
        let mut map = HashMap::new();
        map.insert(PlayerId::from_bytes([1u8; 16]), 5u32);

        let json = serde_json::to_string(&map).unwrap();
        let back: HashMap<PlayerId, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
