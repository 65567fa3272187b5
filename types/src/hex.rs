//! Hex codec and serde helpers.
//!
//! Human-readable formats (JSON, TOML) see lowercase hex strings; binary
//! formats (bincode) see raw bytes.

use crate::error::TypesError;

pub fn encode(bytes: &[u8]) -> String {
    ::hex::encode(bytes)
}

pub fn decode(s: &str) -> Result<Vec<u8>, TypesError> {
    ::hex::decode(s).map_err(|e| TypesError::InvalidHex(e.to_string()))
}

pub fn decode_array<const N: usize>(s: &str) -> Result<[u8; N], TypesError> {
    let bytes = decode(s)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| TypesError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        })
}

/// Serde adapter for 32-byte arrays.
pub mod bytes32 {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.serialize_str(&super::encode(bytes))
        } else {
            bytes.serialize(s)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        if d.is_human_readable() {
            let s = String::deserialize(d)?;
            super::decode_array(&s).map_err(D::Error::custom)
        } else {
            <[u8; 32]>::deserialize(d)
        }
    }
}

/// Serde adapter for variable-length byte strings.
pub mod bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.serialize_str(&super::encode(bytes))
        } else {
            s.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        if d.is_human_readable() {
            let s = String::deserialize(d)?;
            super::decode(&s).map_err(D::Error::custom)
        } else {
            <Vec<u8>>::deserialize(d)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let bytes = vec![0x00, 0x7f, 0xff, 0x10];
        assert_eq!(encode(&bytes), "007fff10");
        assert_eq!(decode("007fff10").unwrap(), bytes);
    }

    #[test]
    fn decode_rejects_odd_length() {
        assert!(decode("abc").is_err());
    }

    #[test]
    fn decode_rejects_non_hex() {
        assert!(decode("zz").is_err());
    }

    #[test]
    fn decode_array_checks_length() {
        assert!(decode_array::<4>("0011").is_err());
        assert_eq!(decode_array::<2>("0011").unwrap(), [0x00, 0x11]);
    }
}
