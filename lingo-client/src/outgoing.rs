use std::collections::HashSet;

use lingo_common::{FriendRequestView, UserId};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::client::FriendApi;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Freshness {
    /// Never read from the server.
    #[default]
    Unknown,
    Fresh,
    /// The last read failed; the set is whatever the read before it returned.
    Stale,
}

/// Recipients of the caller's pending outgoing requests, as last read from
/// the server. Only ever replaced wholesale.
#[derive(Debug, Default)]
pub struct OutgoingRequests {
    ids: HashSet<UserId>,
    freshness: Freshness,
    issued: u64,
    applied: u64,
}

impl OutgoingRequests {
    pub fn contains(&self, id: &UserId) -> bool {
        self.ids.contains(id)
    }
    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    fn begin_read(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Applies a read unless a later one already landed.
    fn replace(&mut self, read: u64, records: &[FriendRequestView]) -> bool {
        if read <= self.applied {
            return false;
        }
        self.applied = read;
        self.ids = records.iter().map(|record| record.recipient.id.clone()).collect();
        self.freshness = Freshness::Fresh;
        true
    }

    fn mark_stale(&mut self, read: u64) {
        if read > self.applied {
            self.freshness = Freshness::Stale;
        }
    }
}

/// Re-reads the outgoing requests. A failed read keeps the previous set.
pub async fn reconcile<A>(api: &A, outgoing: &Mutex<OutgoingRequests>) -> Freshness
where
    A: FriendApi + ?Sized,
{
    let read = outgoing.lock().begin_read();
    let result = api.outgoing_friend_requests().await;
    let mut outgoing = outgoing.lock();
    match result {
        Ok(records) => {
            if outgoing.replace(read, &records) {
                debug!(count = records.len(), "outgoing friend requests reconciled");
            }
        }
        Err(err) => {
            warn!(%err, "could not read outgoing friend requests, keeping the last known set");
            outgoing.mark_stale(read);
        }
    }
    outgoing.freshness()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_common::{FriendRequestId, User};

    fn record(recipient: &str) -> FriendRequestView {
        FriendRequestView {
            id: FriendRequestId(format!("req-{recipient}")),
            recipient: User { id: UserId::from(recipient), ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn reads_replace_the_set_in_full() {
        let mut outgoing = OutgoingRequests::default();
        assert_eq!(outgoing.freshness(), Freshness::Unknown);

        let read = outgoing.begin_read();
        outgoing.replace(read, &[record("u1"), record("u2")]);
        assert!(outgoing.contains(&UserId::from("u1")));
        assert_eq!(outgoing.freshness(), Freshness::Fresh);

        let read = outgoing.begin_read();
        outgoing.replace(read, &[]);
        assert!(!outgoing.contains(&UserId::from("u1")));
        assert!(!outgoing.contains(&UserId::from("u2")));
    }

    #[test]
    fn late_reads_do_not_overwrite_newer_ones() {
        let mut outgoing = OutgoingRequests::default();
        let older = outgoing.begin_read();
        let newer = outgoing.begin_read();
        assert!(outgoing.replace(newer, &[record("u2")]));
        assert!(!outgoing.replace(older, &[record("u1")]));
        outgoing.mark_stale(older);
        assert!(outgoing.contains(&UserId::from("u2")));
        assert_eq!(outgoing.freshness(), Freshness::Fresh);
    }

    #[test]
    fn failures_keep_the_set_and_mark_it_stale() {
        let mut outgoing = OutgoingRequests::default();
        let read = outgoing.begin_read();
        outgoing.replace(read, &[record("u1")]);
        let read = outgoing.begin_read();
        outgoing.mark_stale(read);
        assert!(outgoing.contains(&UserId::from("u1")));
        assert_eq!(outgoing.freshness(), Freshness::Stale);
    }
}
