#![forbid(unsafe_code)]

use super::build::{TreeBuild, build_tree};
use crate::record::FlatRecord;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

pub type Fingerprint = [u8; 32];

/// Content fingerprint of a flat list: every field of every record, in order.
pub fn fingerprint(records: &[FlatRecord]) -> Fingerprint {
    fn field(hasher: &mut Sha256, tag: u8, value: Option<&[u8]>) {
        hasher.update([tag]);
        match value {
            Some(bytes) => {
                hasher.update((bytes.len() as u64).to_le_bytes());
                hasher.update(bytes);
            }
            None => hasher.update(u64::MAX.to_le_bytes()),
        }
    }

    let mut hasher = Sha256::new();
    hasher.update((records.len() as u64).to_le_bytes());
    for record in records {
        field(&mut hasher, b'n', Some(record.name.as_bytes()));
        field(&mut hasher, b'u', record.url.as_deref().map(str::as_bytes));
        field(&mut hasher, b'p', record.parent.as_deref().map(str::as_bytes));
        field(
            &mut hasher,
            b'c',
            record.task_complete.map(|c| if c { &b"1"[..] } else { &b"0"[..] }),
        );
        field(&mut hasher, b'i', record.icon.map(|i| i.as_str().as_bytes()));
        let border = record.border.map(|b| [b.as_u8()]);
        field(&mut hasher, b'b', border.as_ref().map(|b| &b[..]));
    }
    hasher.finalize().into()
}

/// Single-entry memo over `build_tree`, keyed by content rather than identity, so an
/// in-place field edit invalidates it as surely as a membership change.
#[derive(Debug, Default)]
pub struct TreeCache {
    entry: Option<(Fingerprint, Arc<TreeBuild>)>,
    hits: u64,
    misses: u64,
}

impl TreeCache {
    pub fn build(&mut self, records: &[FlatRecord]) -> Arc<TreeBuild> {
        let key = fingerprint(records);
        if let Some((cached_key, cached)) = &self.entry
            && *cached_key == key
        {
            self.hits += 1;
            debug!(records = records.len(), "tree cache hit");
            return Arc::clone(cached);
        }
        self.misses += 1;
        let built = Arc::new(build_tree(records));
        self.entry = Some((key, Arc::clone(&built)));
        built
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
