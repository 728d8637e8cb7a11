#![forbid(unsafe_code)]

use crate::error::StoreError;
use crate::kv::KeyValueStore;
use lt_core::{FlatRecord, Settings, record::apply_defaults_all};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

pub const LIST_KEY: &str = "links-v1";
pub const SETTINGS_KEY: &str = "settings-v1";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// Identical to the last successful save, so nothing was sent.
    Unchanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub bytes_in_use: usize,
    pub quota_bytes: usize,
    pub percent: u32,
}

impl Usage {
    pub fn new(bytes_in_use: usize, quota_bytes: usize) -> Self {
        let percent = if quota_bytes == 0 {
            100
        } else {
            (bytes_in_use * 100).div_ceil(quota_bytes)
        };
        Self {
            bytes_in_use,
            quota_bytes,
            percent: u32::try_from(percent).unwrap_or(u32::MAX),
        }
    }
}

/// Decodes a stored list value and fills in record defaults.
pub fn decode_list(value: Value) -> Result<Vec<FlatRecord>, StoreError> {
    let mut records: Vec<FlatRecord> =
        serde_json::from_value(value).map_err(|err| StoreError::Corrupt {
            key: LIST_KEY.to_string(),
            reason: err.to_string(),
        })?;
    apply_defaults_all(&mut records);
    Ok(records)
}

/// Typed access to the two synchronized keys, with save deduplication.
#[derive(Debug)]
pub struct LinkStorage<S> {
    kv: S,
    last_saved_list: Option<String>,
    last_saved_settings: Option<String>,
}

impl<S: KeyValueStore> LinkStorage<S> {
    pub fn new(kv: S) -> Self {
        Self {
            kv,
            last_saved_list: None,
            last_saved_settings: None,
        }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }

    /// A missing list loads as empty.
    pub fn load_list(&mut self) -> Result<Vec<FlatRecord>, StoreError> {
        let Some(value) = self.kv.load(LIST_KEY)? else {
            debug!("no stored list, starting empty");
            return Ok(Vec::new());
        };
        let records = decode_list(value)?;
        self.remember_list(&records)?;
        Ok(records)
    }

    pub fn save_list(&mut self, records: &[FlatRecord]) -> Result<SaveOutcome, StoreError> {
        let encoded = serde_json::to_string(records)?;
        if self.last_saved_list.as_deref() == Some(encoded.as_str()) {
            return Ok(SaveOutcome::Unchanged);
        }
        let value = serde_json::to_value(records)?;
        match self.kv.save(LIST_KEY, &value) {
            Ok(()) => {
                info!(records = records.len(), bytes = encoded.len(), "list saved");
                self.last_saved_list = Some(encoded);
                Ok(SaveOutcome::Written)
            }
            Err(err) => {
                error!(error = %err, "list save failed");
                Err(err)
            }
        }
    }

    /// Records `records` as what storage currently holds, e.g. after applying a
    /// change that arrived from another device.
    pub fn remember_list(&mut self, records: &[FlatRecord]) -> Result<(), StoreError> {
        self.last_saved_list = Some(serde_json::to_string(records)?);
        Ok(())
    }

    pub fn load_settings(&mut self) -> Result<Settings, StoreError> {
        let settings = Settings::from_stored(self.kv.load(SETTINGS_KEY)?);
        self.remember_settings(&settings)?;
        Ok(settings)
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<SaveOutcome, StoreError> {
        let encoded = serde_json::to_string(settings)?;
        if self.last_saved_settings.as_deref() == Some(encoded.as_str()) {
            return Ok(SaveOutcome::Unchanged);
        }
        let value = serde_json::to_value(settings)?;
        match self.kv.save(SETTINGS_KEY, &value) {
            Ok(()) => {
                info!("settings saved");
                self.last_saved_settings = Some(encoded);
                Ok(SaveOutcome::Written)
            }
            Err(err) => {
                error!(error = %err, "settings save failed");
                Err(err)
            }
        }
    }

    pub fn remember_settings(&mut self, settings: &Settings) -> Result<(), StoreError> {
        self.last_saved_settings = Some(serde_json::to_string(settings)?);
        Ok(())
    }

    /// Usage of the list key against the per-item quota.
    pub fn usage(&self) -> Result<Usage, StoreError> {
        Ok(Usage::new(
            self.kv.bytes_in_use(Some(LIST_KEY))?,
            self.kv.quota_bytes_per_item(),
        ))
    }
}
