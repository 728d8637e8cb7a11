#![forbid(unsafe_code)]

use super::{KeyValueStore, QUOTA_BYTES, QUOTA_BYTES_PER_ITEM, StorageChange, check_quota, decode_stored, item_size};
use crate::clock::now_ms;
use crate::error::StoreError;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug)]
struct Shared {
    items: BTreeMap<String, String>,
    log: Vec<StorageChange>,
    quota_per_item: usize,
}

/// In-process store. Handles made with [`MemoryKvStore::connect`] act as separate
/// devices over the same data; a `clone` is the same device.
#[derive(Clone, Debug)]
pub struct MemoryKvStore {
    shared: Rc<RefCell<Shared>>,
    device: String,
    cursor: usize,
    failing_saves: Rc<Cell<usize>>,
}

impl MemoryKvStore {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                items: BTreeMap::new(),
                log: Vec::new(),
                quota_per_item: QUOTA_BYTES_PER_ITEM,
            })),
            device: device.into(),
            cursor: 0,
            failing_saves: Rc::new(Cell::new(0)),
        }
    }

    /// A second device over the same data. It only sees changes made after it connects.
    pub fn connect(&self, device: impl Into<String>) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            device: device.into(),
            cursor: self.shared.borrow().log.len(),
            failing_saves: Rc::new(Cell::new(0)),
        }
    }

    /// The next `count` saves through this device fail with `StoreError::Unavailable`.
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.set(count);
    }

    pub fn set_quota_per_item(&self, bytes: usize) {
        self.shared.borrow_mut().quota_per_item = bytes;
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.shared.borrow().items.get(key).cloned()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.shared
            .borrow()
            .items
            .get(key)
            .map(|encoded| decode_stored(key, encoded))
            .transpose()
    }

    fn save(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        let pending = self.failing_saves.get();
        if pending > 0 {
            self.failing_saves.set(pending - 1);
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }

        let encoded = serde_json::to_string(value)?;
        let mut shared = self.shared.borrow_mut();
        if shared.items.get(key) == Some(&encoded) {
            return Ok(());
        }

        let other_bytes = shared
            .items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| item_size(k, v))
            .sum();
        check_quota(
            key,
            item_size(key, &encoded),
            other_bytes,
            shared.quota_per_item,
            QUOTA_BYTES,
        )?;

        let old = shared.items.insert(key.to_string(), encoded);
        let old_value = old.map(|old| decode_stored(key, &old)).transpose()?;
        shared.log.push(StorageChange {
            key: key.to_string(),
            old_value,
            new_value: Some(value.clone()),
            origin: self.device.clone(),
            ts_ms: now_ms(),
        });
        Ok(())
    }

    fn bytes_in_use(&self, key: Option<&str>) -> Result<usize, StoreError> {
        let shared = self.shared.borrow();
        Ok(shared
            .items
            .iter()
            .filter(|(k, _)| key.is_none_or(|key| key == k.as_str()))
            .map(|(k, v)| item_size(k, v))
            .sum())
    }

    fn poll_changes(&mut self) -> Result<Vec<StorageChange>, StoreError> {
        let shared = self.shared.borrow();
        let fresh = shared.log[self.cursor..]
            .iter()
            .filter(|change| change.origin != self.device)
            .cloned()
            .collect();
        self.cursor = shared.log.len();
        Ok(fresh)
    }

    fn quota_bytes_per_item(&self) -> usize {
        self.shared.borrow().quota_per_item
    }
}
