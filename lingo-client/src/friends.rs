use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lingo_common::{FriendRequestId, FriendRequestView, User};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::client::FriendApi;
use crate::error::{ClientError, Result};
use crate::notice::Notices;
use crate::optimistic::Optimistic;
use crate::sync::InFlight;

/// What the friends screen renders: requests waiting on the caller and the
/// caller's friends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FriendsBoard {
    pub pending: Vec<FriendRequestView>,
    pub friends: Vec<User>,
}

/// Moves a request out of `pending` and its sender into `friends`.
#[derive(Debug)]
pub struct AcceptRequest {
    request: FriendRequestView,
    removed_at: Option<usize>,
    added_friend: bool,
}

impl AcceptRequest {
    pub fn new(request: FriendRequestView) -> Self {
        Self { request, removed_at: None, added_friend: false }
    }
    pub fn sender(&self) -> &User {
        &self.request.sender
    }
}

impl Optimistic<FriendsBoard> for AcceptRequest {
    fn apply(&mut self, board: &mut FriendsBoard) {
        self.removed_at = board.pending.iter().position(|request| request.id == self.request.id);
        if let Some(index) = self.removed_at {
            board.pending.remove(index);
        }
        let sender = &self.request.sender;
        self.added_friend = !board.friends.iter().any(|friend| friend.id == sender.id);
        if self.added_friend {
            board.friends.push(sender.clone());
        }
    }

    fn revert(&mut self, board: &mut FriendsBoard) {
        if std::mem::take(&mut self.added_friend) {
            let sender = &self.request.sender.id;
            if let Some(index) = board.friends.iter().rposition(|friend| &friend.id == sender) {
                board.friends.remove(index);
            }
        }
        if let Some(index) = self.removed_at.take() {
            if !board.pending.iter().any(|request| request.id == self.request.id) {
                let index = index.min(board.pending.len());
                board.pending.insert(index, self.request.clone());
            }
        }
    }
}

/// Friends screen state plus the optimistic accept flow.
///
/// Each accept resolves on its own task, so a caller that stops waiting
/// still gets the board confirmed or rolled back.
pub struct FriendsPage<A> {
    state: Arc<PageState<A>>,
}

struct PageState<A> {
    api: A,
    board: Mutex<FriendsBoard>,
    accepting: Arc<Mutex<HashSet<FriendRequestId>>>,
    edits: AtomicU64,
    notices: Notices,
}

impl<A: FriendApi + 'static> FriendsPage<A> {
    pub fn new(api: A, notices: Notices) -> Self {
        Self {
            state: Arc::new(PageState {
                api,
                board: Mutex::new(FriendsBoard::default()),
                accepting: Default::default(),
                edits: AtomicU64::new(0),
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
    pub fn board(&self) -> FriendsBoard {
        self.state.board.lock().clone()
    }
    pub fn is_accepting(&self, id: &FriendRequestId) -> bool {
        self.state.accepting.lock().contains(id)
    }

    pub async fn load(&self) -> Result<()> {
        match self.state.fetch().await {
            Ok(board) => {
                *self.state.board.lock() = board;
                Ok(())
            }
            Err(err) => {
                warn!(%err, "could not load friends");
                self.state.notices.error("Could not load friends. Try again later.");
                Err(err)
            }
        }
    }

    pub async fn accept(&self, id: &FriendRequestId) -> Result<()> {
        let Some(accepting) = InFlight::claim(&self.state.accepting, id) else {
            return Err(ClientError::NotPending(id.clone()));
        };
        let command = {
            let mut board = self.state.board.lock();
            let request = board
                .pending
                .iter()
                .find(|request| &request.id == id)
                .cloned()
                .ok_or_else(|| ClientError::NotPending(id.clone()))?;
            let mut command = AcceptRequest::new(request);
            command.apply(&mut *board);
            command
        };
        self.state.edits.fetch_add(1, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        let id = id.clone();
        tokio::spawn(async move { state.resolve_accept(&id, command, accepting).await }).await?
    }
}

impl<A: FriendApi> PageState<A> {
    async fn resolve_accept(
        &self,
        id: &FriendRequestId,
        mut command: AcceptRequest,
        accepting: InFlight<FriendRequestId>,
    ) -> Result<()> {
        let result = self.api.accept_friend_request(id).await;
        match result {
            Ok(_) => {
                info!(request_id = %id, "friend request accepted");
                self.notices.success(format!("You are now friends with {}", command.sender().full_name));
                drop(accepting);
                let settled = self.accepting.lock().is_empty();
                if settled {
                    self.refresh_settled().await;
                }
                Ok(())
            }
            Err(err) => {
                warn!(request_id = %id, %err, "accept failed, rolling back");
                command.revert(&mut *self.board.lock());
                self.notices.error(format!("Failed to accept friend request: {err}"));
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> Result<FriendsBoard> {
        let (requests, friends) = futures::try_join!(self.api.friend_requests(), self.api.friends())?;
        Ok(FriendsBoard { pending: requests.incoming_reqs, friends })
    }

    /// Re-reads the board unless an accept started while the read was out.
    async fn refresh_settled(&self) {
        let edits = self.edits.load(Ordering::SeqCst);
        match self.fetch().await {
            Ok(board) => {
                if self.accepting.lock().is_empty() && self.edits.load(Ordering::SeqCst) == edits {
                    *self.board.lock() = board;
                } else {
                    debug!("skipping friends refresh, an accept is in progress");
                }
            }
            Err(err) => warn!(%err, "background friends refresh failed"),
        }
    }
}
