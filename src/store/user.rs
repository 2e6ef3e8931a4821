use crate::core::User;
use crate::store::{DbState, StoreTx};

impl DbState {
    pub fn find_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).cloned()
    }

    pub fn find_user_by_address(&self, address: &str) -> Option<User> {
        self.users.values().find(|u| u.address == address).cloned()
    }
}

impl StoreTx<'_> {
    pub fn upsert_user(&mut self, user: User) {
        self.state
            .users
            .entry(user.user_id.clone())
            .or_insert(user);
    }
}
