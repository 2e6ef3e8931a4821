use crate::core::Proposal;
use crate::store::{DbState, StoreError, StoreTx};

impl DbState {
    pub fn find_proposal(&self, trace_id: &str) -> Option<Proposal> {
        self.proposals.get(trace_id).cloned()
    }
}

impl StoreTx<'_> {
    pub fn create_proposal(&mut self, mut proposal: Proposal) {
        proposal.created_at = self.now;
        proposal.updated_at = self.now;
        self.state
            .proposals
            .insert(proposal.trace_id.clone(), proposal);
    }

    pub fn update_proposal(&mut self, proposal: &mut Proposal) -> Result<(), StoreError> {
        let current = self
            .state
            .proposals
            .get_mut(&proposal.trace_id)
            .ok_or(StoreError::NotFound)?;
        if current.version != proposal.version {
            return Err(StoreError::Conflict);
        }
        proposal.version += 1;
        proposal.updated_at = self.now;
        *current = proposal.clone();
        Ok(())
    }
}
