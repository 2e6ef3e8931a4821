use rust_decimal::Decimal;

use crate::core::Borrow;
use crate::store::{DbState, StoreError, StoreTx};

impl DbState {
    pub fn find_borrow(&self, user_id: &str, asset_id: &str) -> Option<Borrow> {
        self.borrows
            .get(&(user_id.to_string(), asset_id.to_string()))
            .cloned()
    }

    pub fn borrows_by_user(&self, user_id: &str) -> Vec<Borrow> {
        let mut rows: Vec<_> = self
            .borrows
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        rows
    }

    pub fn sum_of_principals(&self, asset_id: &str) -> Decimal {
        self.borrows
            .values()
            .filter(|b| b.asset_id == asset_id)
            .map(|b| b.principal)
            .sum()
    }
}

impl StoreTx<'_> {
    pub fn save_borrow(&mut self, mut borrow: Borrow) {
        borrow.updated_at = self.now;
        let key = (borrow.user_id.clone(), borrow.asset_id.clone());
        if !self.state.borrows.contains_key(&key) {
            borrow.created_at = self.now;
        }
        self.state.borrows.insert(key, borrow);
    }

    pub fn update_borrow(&mut self, borrow: &mut Borrow) -> Result<(), StoreError> {
        let key = (borrow.user_id.clone(), borrow.asset_id.clone());
        let current = self.state.borrows.get_mut(&key).ok_or(StoreError::NotFound)?;
        if current.version != borrow.version {
            return Err(StoreError::Conflict);
        }
        borrow.version += 1;
        borrow.updated_at = self.now;
        *current = borrow.clone();
        Ok(())
    }
}
