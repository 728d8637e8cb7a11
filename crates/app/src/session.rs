#![forbid(unsafe_code)]

use crate::error::SessionError;
use crate::flags::{FooterMessage, PermissionProbe, derive_footer};
use crate::reconciler::PendingSync;
use lt_core::{
    Applied, FaviconProvider, FlatRecord, IconBorder, Observable, RecordStore, Settings,
    SubscriptionId, TreeBuild, TreeCache, TreeDiagnostic,
};
use lt_storage::{KeyValueStore, LinkStorage, StorageChange, Usage, decode_list};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Field values submitted by an edit form. Completion state is not part of it; the
/// edited record keeps whatever it had.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordEdit {
    pub name: String,
    pub url: Option<String>,
    pub parent: Option<String>,
    pub icon: Option<FaviconProvider>,
    pub border: Option<IconBorder>,
}

impl RecordEdit {
    pub fn from_record(record: &FlatRecord) -> Self {
        Self {
            name: record.name.clone(),
            url: record.url.clone(),
            parent: record.parent.clone(),
            icon: record.icon,
            border: record.border,
        }
    }
}

/// Owns the list, its index and everything derived from it for one application run.
///
/// Every write runs mutate, persist, rebuild in that order. When persisting fails the
/// mutation is reverted before the error is returned, so nothing observable ever
/// reflects a change that storage did not accept.
pub struct AppSession<S, P> {
    store: RecordStore,
    storage: LinkStorage<S>,
    cache: TreeCache,
    permission: P,
    tree: Observable<Arc<TreeBuild>>,
    settings: Observable<Settings>,
    footer: Observable<Vec<FooterMessage>>,
}

impl<S: KeyValueStore, P: PermissionProbe> AppSession<S, P> {
    pub fn load(kv: S, permission: P) -> Result<Self, SessionError> {
        let mut storage = LinkStorage::new(kv);
        let records = storage.load_list()?;
        let settings = storage.load_settings()?;

        let store = RecordStore::from_records(records);
        let mut cache = TreeCache::default();
        let tree = cache.build(store.records());
        log_diagnostics(&tree.diagnostics);
        let footer = derive_footer(store.records(), &permission);
        info!(records = store.len(), "session loaded");

        Ok(Self {
            store,
            storage,
            cache,
            permission,
            tree: Observable::new(tree),
            settings: Observable::new(settings),
            footer: Observable::new(footer),
        })
    }

    pub fn records(&self) -> &[FlatRecord] {
        self.store.records()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn tree(&self) -> &Arc<TreeBuild> {
        self.tree.get()
    }

    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    pub fn footer(&self) -> &[FooterMessage] {
        self.footer.get()
    }

    pub fn storage(&self) -> &LinkStorage<S> {
        &self.storage
    }

    pub fn permission_mut(&mut self) -> &mut P {
        &mut self.permission
    }

    pub fn subscribe_tree(&mut self, listener: impl FnMut(&Arc<TreeBuild>) + 'static) -> SubscriptionId {
        self.tree.subscribe(listener)
    }

    pub fn unsubscribe_tree(&mut self, id: SubscriptionId) -> bool {
        self.tree.unsubscribe(id)
    }

    pub fn subscribe_footer(&mut self, listener: impl FnMut(&Vec<FooterMessage>) + 'static) -> SubscriptionId {
        self.footer.subscribe(listener)
    }

    pub fn usage(&self) -> Result<Usage, SessionError> {
        Ok(self.storage.usage()?)
    }

    /// Linked records without an explicit provider take the user's default one.
    pub fn add(&mut self, mut record: FlatRecord) -> Result<(), SessionError> {
        self.prepare(&mut record);
        let applied = self.store.add(record)?;
        self.commit(applied)
    }

    pub fn remove(&mut self, name: &str) -> Result<(), SessionError> {
        let applied = self.store.remove(name)?;
        self.commit(applied)
    }

    /// Replaces `original_name` with the edited fields. Picking a provider other than
    /// the current default makes it the new default; a link left without one gets
    /// the default.
    pub fn edit(&mut self, original_name: &str, edit: RecordEdit) -> Result<(), SessionError> {
        let existing = self
            .store
            .get(original_name)
            .ok_or_else(|| SessionError::NotFound(original_name.to_string()))?;
        let mut record = FlatRecord {
            name: edit.name,
            url: edit.url,
            parent: edit.parent,
            task_complete: existing.task_complete,
            icon: edit.icon,
            border: edit.border,
        };
        self.prepare(&mut record);

        let chosen = record.url_str().and(edit.icon);
        let applied = self.store.update(original_name, record)?;
        self.commit(applied)?;

        if let Some(chosen) = chosen
            && chosen != self.settings.get().default_favicon_provider
        {
            let mut settings = self.settings.get().clone();
            settings.default_favicon_provider = chosen;
            if let Err(err) = self.save_settings(settings) {
                warn!(error = %err, "edit saved but default provider was not");
            }
        }
        Ok(())
    }

    fn prepare(&self, record: &mut FlatRecord) {
        record.trim_fields();
        if record.url.is_some() && record.icon.is_none() {
            record.icon = Some(self.settings.get().default_favicon_provider);
        }
        record.apply_defaults();
    }

    pub fn toggle_task_complete(&mut self, name: &str) -> Result<(), SessionError> {
        let applied = self.store.toggle_task_complete(name)?;
        self.commit(applied)
    }

    /// Toggle coming from the context menu. Returns `false` without touching anything
    /// when that shortcut is disabled in settings.
    pub fn context_toggle(&mut self, name: &str) -> Result<bool, SessionError> {
        if !self.settings.get().enable_right_click_complete {
            return Ok(false);
        }
        self.toggle_task_complete(name)?;
        Ok(true)
    }

    /// Swaps `name` with the previous record of its sibling group. Returns `false` at
    /// the top of the group.
    pub fn move_up(&mut self, name: &str) -> Result<bool, SessionError> {
        self.move_within_siblings(name, Direction::Up)
    }

    pub fn move_down(&mut self, name: &str) -> Result<bool, SessionError> {
        self.move_within_siblings(name, Direction::Down)
    }

    pub fn save_settings(&mut self, settings: Settings) -> Result<(), SessionError> {
        self.storage
            .save_settings(&settings)
            .map_err(SessionError::Persistence)?;
        if settings != *self.settings.get() {
            self.settings.set(settings);
        }
        Ok(())
    }

    /// Re-derives footer flags, e.g. after the permission state changed.
    pub fn refresh_flags(&mut self) {
        let footer = derive_footer(self.store.records(), &self.permission);
        if footer != *self.footer.get() {
            self.footer.set(footer);
        }
    }

    /// Writes made by other devices since the last call.
    pub fn poll_storage(&mut self) -> Result<Vec<StorageChange>, SessionError> {
        Ok(self.storage.kv_mut().poll_changes()?)
    }

    /// Replaces local state with externally written values. The last write observed
    /// wins; nothing is merged. A payload that does not decode leaves state as it was.
    pub fn apply_external(&mut self, pending: PendingSync) -> Result<(), SessionError> {
        let list = match pending.list {
            Some(Some(value)) => Some(decode_list(value)?),
            Some(None) => Some(Vec::new()),
            None => None,
        };
        let settings = pending.settings.map(Settings::from_stored);

        if let Some(records) = list {
            self.storage.remember_list(&records)?;
            self.store.replace_all(records);
        }
        if let Some(settings) = settings {
            self.storage.remember_settings(&settings)?;
            if settings != *self.settings.get() {
                self.settings.set(settings);
            }
        }
        self.refresh();
        Ok(())
    }

    fn move_within_siblings(&mut self, name: &str, direction: Direction) -> Result<bool, SessionError> {
        let position = self
            .store
            .position(name)
            .ok_or_else(|| SessionError::NotFound(name.to_string()))?;
        let siblings = self.tree.get().sibling_positions(position);
        let Some(slot) = siblings.iter().position(|p| *p == position) else {
            return Ok(false);
        };
        let neighbor = match direction {
            Direction::Up => slot.checked_sub(1).and_then(|s| siblings.get(s)),
            Direction::Down => siblings.get(slot + 1),
        };
        let Some(&neighbor) = neighbor else {
            return Ok(false);
        };

        let other = self.store.records()[neighbor].name.clone();
        let applied = self.store.swap_positions(name, &other)?;
        self.commit(applied)?;
        Ok(true)
    }

    fn commit(&mut self, applied: Applied) -> Result<(), SessionError> {
        match self.storage.save_list(self.store.records()) {
            Ok(_) => {
                self.refresh();
                Ok(())
            }
            Err(err) => {
                error!(op = applied.kind(), error = %err, "save failed, rolling back");
                if let Err(revert_err) = self.store.revert(&applied) {
                    error!(op = applied.kind(), error = %revert_err, "rollback failed");
                }
                self.refresh();
                Err(SessionError::Persistence(err))
            }
        }
    }

    fn refresh(&mut self) {
        let built = self.cache.build(self.store.records());
        if !Arc::ptr_eq(&built, self.tree.get()) {
            log_diagnostics(&built.diagnostics);
            self.tree.set(built);
        }
        self.refresh_flags();
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

fn log_diagnostics(diagnostics: &[TreeDiagnostic]) {
    if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "tree built with recovered anomalies");
    }
}
