//! Storage for the entity cache and the triple memo.
//!
//! Two tiers serve different access patterns:
//!
//! - [`MemStore`]: hot lookups in a concurrent hashmap (DashMap)
//! - [`DurableStore`]: persistent tables in ACID transactions (redb)
//!
//! Records are encoded with bincode before they reach redb.

pub mod durable;
pub mod mem;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use crate::error::StoreResult;
use crate::error::StoreError;
pub use durable::{DurableStore, StrTable};
pub use mem::MemStore;

/// Encode a record for a durable table.
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization {
        message: format!("encode failed: {e}"),
    })
}

/// Decode a record read from a durable table.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("decode failed: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_garbage_is_serialization_error() {
        let result: StoreResult<(String, f64)> = decode(&[0xff]);
        assert!(matches!(result, Err(StoreError::Serialization { .. })));
    }

    #[test]
    fn encode_decode_optional_fields() {
        let value: (Option<String>, f64) = (None, 0.0);
        let back: (Option<String>, f64) = decode(&encode(&value).unwrap()).unwrap();
        assert_eq!(back, value);
    }
}
