use rust_decimal::Decimal;

use crate::core::Supply;
use crate::store::{DbState, StoreError, StoreTx};

impl DbState {
    pub fn find_supply(&self, user_id: &str, ctoken_asset_id: &str) -> Option<Supply> {
        self.supplies
            .get(&(user_id.to_string(), ctoken_asset_id.to_string()))
            .cloned()
    }

    pub fn supplies_by_user(&self, user_id: &str) -> Vec<Supply> {
        let mut rows: Vec<_> = self
            .supplies
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.ctoken_asset_id.cmp(&b.ctoken_asset_id));
        rows
    }

    pub fn sum_of_collaterals(&self, ctoken_asset_id: &str) -> Decimal {
        self.supplies
            .values()
            .filter(|s| s.ctoken_asset_id == ctoken_asset_id)
            .map(|s| s.collaterals)
            .sum()
    }
}

impl StoreTx<'_> {
    pub fn save_supply(&mut self, mut supply: Supply) {
        supply.updated_at = self.now;
        let key = (supply.user_id.clone(), supply.ctoken_asset_id.clone());
        if !self.state.supplies.contains_key(&key) {
            supply.created_at = self.now;
        }
        self.state.supplies.insert(key, supply);
    }

    pub fn update_supply(&mut self, supply: &mut Supply) -> Result<(), StoreError> {
        let key = (supply.user_id.clone(), supply.ctoken_asset_id.clone());
        let current = self.state.supplies.get_mut(&key).ok_or(StoreError::NotFound)?;
        if current.version != supply.version {
            return Err(StoreError::Conflict);
        }
        supply.version += 1;
        supply.updated_at = self.now;
        *current = supply.clone();
        Ok(())
    }
}
