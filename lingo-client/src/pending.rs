use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use lingo_common::UserId;
use tracing::warn;

use crate::storage::Storage;

/// Storage key holding the ids this client has sent friend requests to.
pub const PENDING_REQUESTS_KEY: &str = "locallySentRequests";

/// Friend-request recipients this client believes it has asked, persisted
/// across restarts as a JSON array of ids.
///
/// Entries are only added by a dispatch and only removed by its rollback;
/// nothing expires them.
pub struct PendingRequestSet {
    storage: Arc<dyn Storage>,
    ids: HashSet<UserId>,
}

impl PendingRequestSet {
    /// Reads the persisted list. Anything absent, unreadable or malformed
    /// yields an empty set.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let ids = match storage.get(PENDING_REQUESTS_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<UserId>>(&raw)
                .map(|ids| ids.into_iter().collect())
                .unwrap_or_else(|err| {
                    warn!(%err, "ignoring malformed pending request list");
                    HashSet::new()
                }),
            Ok(None) => HashSet::new(),
            Err(err) => {
                warn!(%err, "could not read pending request list");
                HashSet::new()
            }
        };
        Self { storage, ids }
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.ids.contains(id)
    }
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
    /// Ids in sorted order.
    pub fn ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Inserts `id` and persists before returning. Returns whether it was new.
    /// On a failed write the in-memory set is left as it was.
    pub fn add(&mut self, id: UserId) -> io::Result<bool> {
        if !self.ids.insert(id.clone()) {
            return Ok(false);
        }
        if let Err(err) = self.persist() {
            self.ids.remove(&id);
            return Err(err);
        }
        Ok(true)
    }

    /// Deletes `id` and persists before returning. Returns whether it was present.
    pub fn remove(&mut self, id: &UserId) -> io::Result<bool> {
        if !self.ids.remove(id) {
            return Ok(false);
        }
        if let Err(err) = self.persist() {
            self.ids.insert(id.clone());
            return Err(err);
        }
        Ok(true)
    }

    fn persist(&self) -> io::Result<()> {
        if self.is_empty() {
            return self.storage.remove(PENDING_REQUESTS_KEY);
        }
        let raw = serde_json::to_string(&self.ids())?;
        self.storage.set(PENDING_REQUESTS_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    fn memory() -> Arc<dyn Storage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn absent_or_malformed_lists_load_empty() {
        let storage = memory();
        assert!(PendingRequestSet::load(storage.clone()).is_empty());

        for raw in ["", "not json", "{\"u1\":true}", "[1, 2]", "[\"u1\"", "null"] {
            storage.set(PENDING_REQUESTS_KEY, raw).unwrap();
            assert!(PendingRequestSet::load(storage.clone()).is_empty(), "{raw:?} should load empty");
        }
    }

    #[test]
    fn added_ids_survive_a_fresh_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path()).unwrap());
        let mut pending = PendingRequestSet::load(storage.clone());
        pending.add(UserId::from("u42")).unwrap();
        pending.add(UserId::from("u7")).unwrap();

        let reloaded = PendingRequestSet::load(storage.clone());
        assert!(reloaded.contains(&UserId::from("u42")));
        assert_eq!(reloaded.ids(), vec![UserId::from("u42"), UserId::from("u7")]);
        assert_eq!(storage.get(PENDING_REQUESTS_KEY).unwrap().as_deref(), Some(r#"["u42","u7"]"#));
    }

    #[test]
    fn adding_twice_is_idempotent() {
        let storage = memory();
        let mut pending = PendingRequestSet::load(storage.clone());
        assert!(pending.add(UserId::from("u42")).unwrap());
        let once = storage.get(PENDING_REQUESTS_KEY).unwrap();
        assert!(!pending.add(UserId::from("u42")).unwrap());
        assert_eq!(pending.ids().len(), 1);
        assert_eq!(storage.get(PENDING_REQUESTS_KEY).unwrap(), once);
    }

    #[test]
    fn removal_is_persisted() {
        let storage = memory();
        let mut pending = PendingRequestSet::load(storage.clone());
        pending.add(UserId::from("u42")).unwrap();
        assert!(pending.remove(&UserId::from("u42")).unwrap());
        assert!(!pending.remove(&UserId::from("u42")).unwrap());
        assert_eq!(storage.get(PENDING_REQUESTS_KEY).unwrap(), None);
        assert!(PendingRequestSet::load(storage).is_empty());
    }

    struct ReadOnly;
    impl Storage for ReadOnly {
        fn get(&self, _: &str) -> io::Result<Option<String>> {
            Ok(None)
        }
        fn set(&self, _: &str, _: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
        fn remove(&self, _: &str) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_writes_leave_memory_untouched() {
        let mut pending = PendingRequestSet::load(Arc::new(ReadOnly));
        assert!(pending.add(UserId::from("u42")).is_err());
        assert!(!pending.contains(&UserId::from("u42")));
    }
}
