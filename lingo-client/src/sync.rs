//! Optimistic friend-request dispatch.
//!
//! A send is recorded in the [`PendingRequestSet`] before the network call is
//! issued, so [`FriendSync::has_request_been_sent`] flips to `true` at once.
//! When the call resolves:
//!
//! - success: the entry stays and the outgoing set is re-read from the server;
//! - the server says the request already exists: the entry stays;
//! - any other failure: the entry is removed again and the error is surfaced.
//!
//! At most one dispatch per recipient is in flight; a second one is refused
//! with [`DispatchOutcome::InFlight`] and touches nothing.
//!
//! The call and its resolution run on a spawned task, so they complete even
//! if the caller stops waiting.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use lingo_common::{FriendRequest, UserId};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::client::FriendApi;
use crate::error::Result;
use crate::notice::Notices;
use crate::outgoing::{reconcile, Freshness, OutgoingRequests};
use crate::pending::PendingRequestSet;
use crate::storage::Storage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The server stored the request.
    Confirmed(FriendRequest),
    /// The server already had a request (or friendship) for this pair.
    AlreadyRequested,
    /// Another dispatch to the same recipient has not resolved yet.
    InFlight,
}

pub struct FriendSync<A> {
    state: Arc<SyncState<A>>,
}

struct SyncState<A> {
    api: A,
    pending: Mutex<PendingRequestSet>,
    outgoing: Mutex<OutgoingRequests>,
    in_flight: Arc<Mutex<HashSet<UserId>>>,
    notices: Notices,
}

impl<A: FriendApi + 'static> FriendSync<A> {
    pub fn new(api: A, storage: Arc<dyn Storage>, notices: Notices) -> Self {
        Self {
            state: Arc::new(SyncState {
                api,
                pending: Mutex::new(PendingRequestSet::load(storage)),
                outgoing: Mutex::new(OutgoingRequests::default()),
                in_flight: Default::default(),
                notices,
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.state.api
    }
    pub fn notices(&self) -> &Notices {
        &self.state.notices
    }

    /// Whether the UI should show `id` as already asked.
    pub fn has_request_been_sent(&self, id: &UserId) -> bool {
        self.state.outgoing.lock().contains(id) || self.state.pending.lock().contains(id)
    }

    pub fn pending_ids(&self) -> Vec<UserId> {
        self.state.pending.lock().ids()
    }
    pub fn freshness(&self) -> Freshness {
        self.state.outgoing.lock().freshness()
    }
    pub fn is_in_flight(&self, id: &UserId) -> bool {
        self.state.in_flight.lock().contains(id)
    }

    /// Re-reads the outgoing requests from the server.
    pub async fn refresh(&self) -> Freshness {
        self.state.refresh().await
    }

    pub async fn send_request(&self, recipient: &UserId) -> Result<DispatchOutcome> {
        let Some(in_flight) = InFlight::claim(&self.state.in_flight, recipient) else {
            debug!(recipient_id = %recipient, "friend request already in flight");
            return Ok(DispatchOutcome::InFlight);
        };

        self.state.pending.lock().add(recipient.clone())?;

        let state = Arc::clone(&self.state);
        let recipient = recipient.clone();
        tokio::spawn(async move {
            let outcome = state.dispatch(&recipient).await;
            drop(in_flight);
            outcome
        })
        .await?
    }
}

impl<A: FriendApi> SyncState<A> {
    async fn refresh(&self) -> Freshness {
        reconcile(&self.api, &self.outgoing).await
    }

    async fn dispatch(&self, recipient: &UserId) -> Result<DispatchOutcome> {
        match self.api.send_friend_request(recipient).await {
            Ok(request) => {
                info!(recipient_id = %recipient, request_id = %request.id, "friend request sent");
                self.notices.success("Friend request sent");
                self.refresh().await;
                Ok(DispatchOutcome::Confirmed(request))
            }
            Err(err) if err.is_already_satisfied() => {
                info!(recipient_id = %recipient, %err, "friend request already exists");
                self.notices.error("Friend request already sent");
                Ok(DispatchOutcome::AlreadyRequested)
            }
            Err(err) => {
                warn!(recipient_id = %recipient, %err, "friend request failed, rolling back");
                if let Err(io) = self.pending.lock().remove(recipient) {
                    warn!(recipient_id = %recipient, err = %io, "could not persist rollback");
                }
                self.notices.error(err.to_string());
                Err(err)
            }
        }
    }
}

/// Marks a key as in flight until dropped.
pub(crate) struct InFlight<K: Eq + Hash> {
    set: Arc<Mutex<HashSet<K>>>,
    key: K,
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    pub(crate) fn claim(set: &Arc<Mutex<HashSet<K>>>, key: &K) -> Option<Self> {
        set.lock().insert(key.clone()).then(|| Self { set: Arc::clone(set), key: key.clone() })
    }
}

impl<K: Eq + Hash> Drop for InFlight<K> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}
