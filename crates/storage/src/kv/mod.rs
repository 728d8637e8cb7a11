#![forbid(unsafe_code)]

pub(crate) mod memory;
pub(crate) mod sqlite;

use crate::clock::ts_ms_to_rfc3339;
use crate::error::StoreError;
use serde_json::Value;

/// Largest single item, counted as key bytes plus encoded value bytes.
pub const QUOTA_BYTES_PER_ITEM: usize = 8_192;
/// Largest total across every item.
pub const QUOTA_BYTES: usize = 102_400;

/// A write observed through the change feed.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    /// Device that made the write.
    pub origin: String,
    pub ts_ms: i64,
}

impl StorageChange {
    /// When the write happened, as RFC 3339 UTC.
    pub fn at(&self) -> String {
        ts_ms_to_rfc3339(self.ts_ms)
    }
}

/// Synchronized key/value storage. `poll_changes` yields writes made by other
/// handles since the previous poll, in commit order; a handle never sees its own.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writing a value identical to the stored one is a no-op and produces no change.
    fn save(&mut self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Bytes used by `key`, or by every item when `key` is `None`.
    fn bytes_in_use(&self, key: Option<&str>) -> Result<usize, StoreError>;

    fn poll_changes(&mut self) -> Result<Vec<StorageChange>, StoreError>;

    fn quota_bytes_per_item(&self) -> usize {
        QUOTA_BYTES_PER_ITEM
    }

    fn quota_bytes(&self) -> usize {
        QUOTA_BYTES
    }
}

pub fn item_size(key: &str, encoded: &str) -> usize {
    key.len() + encoded.len()
}

pub(crate) fn check_quota(
    key: &str,
    item_bytes: usize,
    other_bytes: usize,
    per_item: usize,
    total: usize,
) -> Result<(), StoreError> {
    if item_bytes > per_item {
        return Err(StoreError::QuotaExceeded {
            key: key.to_string(),
            bytes: item_bytes,
            quota: per_item,
        });
    }
    if item_bytes + other_bytes > total {
        return Err(StoreError::QuotaExceeded {
            key: key.to_string(),
            bytes: item_bytes + other_bytes,
            quota: total,
        });
    }
    Ok(())
}

pub(crate) fn decode_stored(key: &str, encoded: &str) -> Result<Value, StoreError> {
    serde_json::from_str(encoded).map_err(|err| StoreError::Corrupt {
        key: key.to_string(),
        reason: err.to_string(),
    })
}
