use serde::{Deserialize, Serialize};
use crate::{User, UserId};

/// Server-side record kept per user. Never sent over the wire as is.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserData {
    pub profile: User,
    pub friends: Vec<UserId>,
}

impl UserData {
    pub fn new(profile: User) -> Self {
        Self { profile, friends: Vec::new() }
    }
    pub fn is_friend(&self, other: &UserId) -> bool {
        self.friends.contains(other)
    }
    /// Returns whether `other` was newly added.
    pub fn add_friend(&mut self, other: UserId) -> bool {
        if self.is_friend(&other) {
            return false;
        }
        self.friends.push(other);
        true
    }
}
