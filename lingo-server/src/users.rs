use anyhow::Context;
use lingo_common::non_api_structs::UserData;
use lingo_common::{
    FriendRequest, FriendRequestId, FriendRequestStatus, FriendRequestView, SignupRequest, User, UserId,
};
use sled::{Db, Tree};
use tracing::debug;
use uuid::Uuid;

use crate::{AppError, Result};

/// sled-backed record store. Every value is a serde_json document.
#[derive(Clone)]
pub struct Users {
    users: Tree,
    emails: Tree,
    sessions: Tree,
    requests: Tree,
    request_pairs: Tree,
}

impl Users {
    pub fn new(db: &Db) -> Result<Self> {
        Ok(Self {
            users: db.open_tree("users")?,
            emails: db.open_tree("emails")?,
            sessions: db.open_tree("sessions")?,
            requests: db.open_tree("friend_requests")?,
            request_pairs: db.open_tree("friend_request_pairs")?,
        })
    }

    pub fn user(&self, user: &UserId) -> Result<UserData> {
        let bytes = self
            .users
            .get(user.0.as_bytes())?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
    pub fn try_user_mut(&self, user: &UserId, func: impl FnOnce(&mut UserData) -> Result<()>) -> Result<()> {
        let mut user_data = self.user(user)?;
        func(&mut user_data)?;
        self.users.insert(user.0.as_bytes(), serde_json::to_vec(&user_data)?)?;
        Ok(())
    }
    pub fn user_mut(&self, user: &UserId, func: impl FnOnce(&mut UserData)) -> Result<()> {
        self.try_user_mut(user, |user_data| {
            func(user_data);
            Ok(())
        })
    }

    pub fn create_user(&self, signup: &SignupRequest) -> Result<User> {
        let uuid = Uuid::new_v4();
        let id = UserId(uuid.to_string());
        let email = signup.email.trim().to_lowercase();
        let claimed = self
            .emails
            .compare_and_swap(email.as_bytes(), None as Option<&[u8]>, Some(id.0.as_bytes()))?;
        if claimed.is_err() {
            return Err(AppError::email_taken());
        }
        let avatar = uuid.as_u128() % 100 + 1;
        let profile = User {
            id: id.clone(),
            full_name: signup.full_name.trim().to_string(),
            email,
            profile_pic: format!("https://avatar.iran.liara.run/public/{avatar}.png"),
            ..Default::default()
        };
        self.users.insert(id.0.as_bytes(), serde_json::to_vec(&UserData::new(profile.clone()))?)?;
        debug!(user_id = %id, "user created");
        Ok(profile)
    }

    /// The account registered under `email`, compared case-insensitively.
    pub fn user_by_email(&self, email: &str) -> Result<Option<UserId>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .emails
            .get(email.as_bytes())?
            .map(|bytes| String::from_utf8(bytes.to_vec()).context("email index holds a non-utf8 user id"))
            .transpose()?
            .map(UserId))
    }

    pub fn all_users(&self) -> Result<Vec<UserData>> {
        self.users
            .iter()
            .values()
            .map(|bytes| -> Result<UserData> { Ok(serde_json::from_slice(&bytes?)?) })
            .collect()
    }

    pub fn profile(&self, user: &UserId) -> Result<User> {
        Ok(self.user(user)?.profile)
    }
    pub fn profiles(&self, users: &[UserId]) -> Result<Vec<User>> {
        users.iter().map(|user| self.profile(user)).collect()
    }

    pub fn create_session(&self, user: &UserId) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.as_bytes(), user.0.as_bytes())?;
        Ok(token)
    }
    pub fn session_user(&self, token: &str) -> Result<Option<UserId>> {
        Ok(self
            .sessions
            .get(token.as_bytes())?
            .map(|bytes| String::from_utf8(bytes.to_vec()).context("session holds a non-utf8 user id"))
            .transpose()?
            .map(UserId))
    }
    pub fn end_session(&self, token: &str) -> Result<()> {
        self.sessions.remove(token.as_bytes())?;
        Ok(())
    }

    pub fn request(&self, id: &FriendRequestId) -> Result<FriendRequest> {
        let bytes = self
            .requests
            .get(id.0.as_bytes())?
            .ok_or_else(|| AppError::not_found("Friend request not found"))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
    pub fn put_request(&self, request: &FriendRequest) -> Result<()> {
        self.requests.insert(request.id.0.as_bytes(), serde_json::to_vec(request)?)?;
        Ok(())
    }
    pub fn requests(&self) -> Result<Vec<FriendRequest>> {
        self.requests
            .iter()
            .values()
            .map(|bytes| -> Result<FriendRequest> { Ok(serde_json::from_slice(&bytes?)?) })
            .collect()
    }
    pub fn requests_where(&self, filter: impl Fn(&FriendRequest) -> bool) -> Result<Vec<FriendRequestView>> {
        self.requests()?
            .into_iter()
            .filter(|request| filter(request))
            .map(|request| self.view(request))
            .collect()
    }
    pub fn view(&self, request: FriendRequest) -> Result<FriendRequestView> {
        Ok(FriendRequestView {
            sender: self.profile(&request.sender)?,
            recipient: self.profile(&request.recipient)?,
            id: request.id,
            status: request.status,
        })
    }

    /// Stores a new pending request unless one already links the two users,
    /// in either direction.
    pub fn open_request(&self, sender: &UserId, recipient: &UserId) -> Result<FriendRequest> {
        self.open_request_with(sender, recipient, Self::put_request)
    }

    fn open_request_with(
        &self,
        sender: &UserId,
        recipient: &UserId,
        store: impl FnOnce(&Self, &FriendRequest) -> Result<()>,
    ) -> Result<FriendRequest> {
        let request = FriendRequest {
            id: FriendRequestId(Uuid::new_v4().to_string()),
            sender: sender.clone(),
            recipient: recipient.clone(),
            status: FriendRequestStatus::Pending,
        };
        let claimed = self.request_pairs.compare_and_swap(
            pair_key(sender, recipient),
            None as Option<&[u8]>,
            Some(request.id.0.as_bytes()),
        )?;
        if claimed.is_err() {
            return Err(AppError::already_requested());
        }
        if let Err(err) = store(self, &request) {
            // release the pair only if it still points at this request
            let _ = self.request_pairs.compare_and_swap(
                pair_key(sender, recipient),
                Some(request.id.0.as_bytes()),
                None as Option<&[u8]>,
            )?;
            return Err(err);
        }
        Ok(request)
    }

    pub fn accept_request(&self, request: &mut FriendRequest) -> Result<()> {
        request.status = FriendRequestStatus::Accepted;
        self.put_request(request)?;
        self.request_pairs.remove(pair_key(&request.sender, &request.recipient))?;
        let (sender, recipient) = (request.sender.clone(), request.recipient.clone());
        self.user_mut(&request.sender, |user| {
            user.add_friend(recipient);
        })?;
        self.user_mut(&request.recipient, |user| {
            user.add_friend(sender);
        })?;
        Ok(())
    }
}

fn pair_key(a: &UserId, b: &UserId) -> Vec<u8> {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}", low.0, high.0).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Users {
        let db = sled::Config::new().temporary(true).open().unwrap();
        Users::new(&db).unwrap()
    }

    fn signup(users: &Users, name: &str) -> User {
        users
            .create_user(&SignupRequest { full_name: name.to_string(), email: format!("{name}@lingo.test") })
            .unwrap()
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let users = users();
        signup(&users, "ana");
        let err = users
            .create_user(&SignupRequest { full_name: "Other".into(), email: "ANA@lingo.test".into() })
            .unwrap_err();
        assert_eq!(err.code, lingo_common::ErrorCode::EmailTaken);
    }

    #[test]
    fn sessions_resolve_until_ended() {
        let users = users();
        let ana = signup(&users, "ana");
        let token = users.create_session(&ana.id).unwrap();
        assert_eq!(users.session_user(&token).unwrap(), Some(ana.id.clone()));
        users.end_session(&token).unwrap();
        assert_eq!(users.session_user(&token).unwrap(), None);
    }

    #[test]
    fn login_finds_accounts_by_email() {
        let users = users();
        let ana = signup(&users, "ana");
        assert_eq!(users.user_by_email(" ANA@lingo.test ").unwrap(), Some(ana.id));
        assert_eq!(users.user_by_email("bo@lingo.test").unwrap(), None);
    }

    #[test]
    fn failed_store_releases_the_pair() {
        let users = users();
        let ana = signup(&users, "ana");
        let bo = signup(&users, "bo");
        let err = users
            .open_request_with(&ana.id, &bo.id, |_, _| Err(AppError::internal("disk full")))
            .unwrap_err();
        assert_eq!(err.code, lingo_common::ErrorCode::Internal);
        assert!(users.requests().unwrap().is_empty());

        let request = users.open_request(&ana.id, &bo.id).unwrap();
        assert_eq!(users.request(&request.id).unwrap().status, FriendRequestStatus::Pending);
    }

    #[test]
    fn one_pending_request_per_pair() {
        let users = users();
        let ana = signup(&users, "ana");
        let bo = signup(&users, "bo");
        let mut request = users.open_request(&ana.id, &bo.id).unwrap();
        let err = users.open_request(&bo.id, &ana.id).unwrap_err();
        assert_eq!(err.code, lingo_common::ErrorCode::AlreadyRequested);

        users.accept_request(&mut request).unwrap();
        assert!(users.user(&ana.id).unwrap().is_friend(&bo.id));
        assert!(users.user(&bo.id).unwrap().is_friend(&ana.id));
        let stored = users.request(&request.id).unwrap();
        assert_eq!(stored.status, FriendRequestStatus::Accepted);
    }
}
