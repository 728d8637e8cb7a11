#![forbid(unsafe_code)]

use crate::index::NameIndex;
use crate::record::FlatRecord;
use crate::validate::{ValidationError, check_fields};
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no record named {0:?}")]
    NotFound(String),
}

/// A change that was applied to the store, carrying what is needed to undo it exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    Added { name: String },
    Removed { record: FlatRecord, position: usize },
    Updated { position: usize, previous: FlatRecord },
    Toggled { name: String },
    Swapped { a: String, b: String },
}

impl Applied {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added { .. } => "add",
            Self::Removed { .. } => "remove",
            Self::Updated { .. } => "update",
            Self::Toggled { .. } => "toggle",
            Self::Swapped { .. } => "swap",
        }
    }
}

/// The flat list plus its name index. All writes go through the mutation methods,
/// each of which leaves the index exactly in step with the list before returning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<FlatRecord>,
    index: NameIndex,
    revision: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<FlatRecord>) -> Self {
        let index = NameIndex::from_records(&records);
        Self {
            records,
            index,
            revision: 0,
        }
    }

    pub fn records(&self) -> &[FlatRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn index(&self) -> &NameIndex {
        &self.index
    }

    /// Bumped by every successful write, reverts included.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.position(name)
    }

    pub fn get(&self, name: &str) -> Option<&FlatRecord> {
        self.position(name).map(|p| &self.records[p])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Owned copy of the list for persistence.
    pub fn snapshot(&self) -> Vec<FlatRecord> {
        self.records.clone()
    }

    pub fn add(&mut self, record: FlatRecord) -> Result<Applied, MutationError> {
        let record = normalized(record);
        self.validate(&record, None)?;

        let name = record.name.clone();
        self.records.push(record);
        self.index.patch_append(&name, self.records.len() - 1);
        self.bump("add", &name);
        Ok(Applied::Added { name })
    }

    pub fn remove(&mut self, name: &str) -> Result<Applied, MutationError> {
        let position = self.require(name)?;
        let record = self.records.remove(position);
        self.index.rebuild_all(&self.records);
        self.bump("remove", name);
        Ok(Applied::Removed { record, position })
    }

    /// Replaces the record called `original_name` in place. Children that reference the
    /// old name are left untouched.
    pub fn update(
        &mut self,
        original_name: &str,
        record: FlatRecord,
    ) -> Result<Applied, MutationError> {
        let position = self.require(original_name)?;
        let record = normalized(record);
        self.validate(&record, Some(original_name))?;

        let renamed = record.name != original_name;
        let previous = std::mem::replace(&mut self.records[position], record);
        if renamed {
            self.index.rebuild_all(&self.records);
        }
        self.bump("update", original_name);
        Ok(Applied::Updated { position, previous })
    }

    pub fn toggle_task_complete(&mut self, name: &str) -> Result<Applied, MutationError> {
        let position = self.require(name)?;
        flip_complete(&mut self.records[position]);
        self.bump("toggle", name);
        Ok(Applied::Toggled {
            name: name.to_string(),
        })
    }

    /// Exchanges two records' positions. Sibling checks belong to the caller.
    pub fn swap_positions(&mut self, a: &str, b: &str) -> Result<Applied, MutationError> {
        let pa = self.require(a)?;
        let pb = self.require(b)?;
        self.records.swap(pa, pb);
        self.index.patch_swap(a, b);
        self.bump("swap", a);
        Ok(Applied::Swapped {
            a: a.to_string(),
            b: b.to_string(),
        })
    }

    /// Wholesale replacement, used when another device's list wins.
    pub fn replace_all(&mut self, records: Vec<FlatRecord>) {
        self.records = records;
        self.index.rebuild_all(&self.records);
        self.revision += 1;
    }

    /// Undoes `applied`. Validation is skipped: the change being undone was valid
    /// against the state it came from.
    pub fn revert(&mut self, applied: &Applied) -> Result<(), MutationError> {
        match applied {
            Applied::Added { name } => {
                let position = self.require(name)?;
                self.records.remove(position);
                self.index.rebuild_all(&self.records);
            }
            Applied::Removed { record, position } => {
                let position = (*position).min(self.records.len());
                self.records.insert(position, record.clone());
                self.index.rebuild_all(&self.records);
            }
            Applied::Updated { position, previous } => {
                let Some(slot) = self.records.get_mut(*position) else {
                    return Err(MutationError::NotFound(previous.name.clone()));
                };
                let renamed = slot.name != previous.name;
                *slot = previous.clone();
                if renamed {
                    self.index.rebuild_all(&self.records);
                }
            }
            Applied::Toggled { name } => {
                let position = self.require(name)?;
                flip_complete(&mut self.records[position]);
            }
            Applied::Swapped { a, b } => {
                let pa = self.require(a)?;
                let pb = self.require(b)?;
                self.records.swap(pa, pb);
                self.index.patch_swap(a, b);
            }
        }
        self.bump("revert", applied.kind());
        Ok(())
    }

    fn require(&self, name: &str) -> Result<usize, MutationError> {
        self.index
            .position(name)
            .ok_or_else(|| MutationError::NotFound(name.to_string()))
    }

    fn validate(
        &self,
        record: &FlatRecord,
        original_name: Option<&str>,
    ) -> Result<(), ValidationError> {
        check_fields(
            &record.name,
            record.url.as_deref().unwrap_or_default(),
            record.parent.as_deref().unwrap_or_default(),
            original_name,
            |name| self.index.contains(name),
        )
    }

    fn bump(&mut self, op: &'static str, name: &str) {
        self.revision += 1;
        debug!(op, name, revision = self.revision, len = self.records.len(), "record store updated");
    }
}

fn normalized(mut record: FlatRecord) -> FlatRecord {
    record.trim_fields();
    record
}

fn flip_complete(record: &mut FlatRecord) {
    record.task_complete = if record.is_complete() { None } else { Some(true) };
}
