use std::collections::HashSet;

use crate::config::AllowListConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowListScope {
    Liquidation,
}

/// Scoped allow lists. A scope without a configured list admits everyone.
#[derive(Debug, Clone, Default)]
pub struct AllowListService {
    liquidation: Option<HashSet<String>>,
}

impl AllowListService {
    pub fn new(cfg: &AllowListConfig) -> Self {
        Self {
            liquidation: cfg
                .liquidation
                .as_ref()
                .map(|users| users.iter().cloned().collect()),
        }
    }

    pub fn is_scope_enabled(&self, scope: AllowListScope) -> bool {
        match scope {
            AllowListScope::Liquidation => self.liquidation.is_some(),
        }
    }

    pub fn is_allowed(&self, scope: AllowListScope, user_id: &str) -> bool {
        match scope {
            AllowListScope::Liquidation => self
                .liquidation
                .as_ref()
                .map(|list| list.contains(user_id))
                .unwrap_or(true),
        }
    }
}
