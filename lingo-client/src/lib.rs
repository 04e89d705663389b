//! Client side of Lingo: the HTTP API client plus the local state that keeps
//! friend-request buttons honest while the server catches up.

use std::io;
use std::sync::Arc;

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod friends;
pub mod notice;
pub mod optimistic;
pub mod outgoing;
pub mod pending;
pub mod storage;
pub mod sync;

pub use client::{ApiClient, FriendApi};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use friends::{FriendsBoard, FriendsPage};
pub use notice::{Level, Notice, Notices};
pub use sync::{DispatchOutcome, FriendSync};

use storage::{FileStorage, Storage};

/// Opens the on-disk state directory named by `config`.
pub fn open_storage(config: &ClientConfig) -> io::Result<Arc<dyn Storage>> {
    Ok(Arc::new(FileStorage::open(&config.state_dir)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_lives_in_the_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig { state_dir: dir.path().join("state"), ..Default::default() };
        let storage = open_storage(&config).unwrap();
        storage.set(pending::PENDING_REQUESTS_KEY, "[]").unwrap();
        assert!(dir.path().join("state").join("locallySentRequests.json").exists());
    }
}
