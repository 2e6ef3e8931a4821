use crate::core::{Output, OutputArchive, Transfer};
use crate::store::{Db, DbState, StoreError, StoreTx};

impl DbState {
    /// Outputs with `id > after`, ascending, at most `limit`.
    pub fn list_outputs(&self, after: i64, limit: usize) -> Vec<Output> {
        self.outputs
            .range(after + 1..)
            .take(limit)
            .map(|(_, o)| o.clone())
            .collect()
    }

    pub fn find_archive(&self, trace_id: &str) -> Option<OutputArchive> {
        self.archives.get(trace_id).cloned()
    }

    pub fn list_transfers(&self) -> Vec<Transfer> {
        self.transfers.values().cloned().collect()
    }

    pub fn find_transfer(&self, trace_id: &str) -> Option<Transfer> {
        self.transfers.get(trace_id).cloned()
    }
}

impl Db {
    /// Append an output from the wallet sync, assigning the next sequence id.
    pub fn push_output(&self, mut output: Output) -> Result<i64, StoreError> {
        self.transaction(|tx| {
            let next = tx
                .state
                .outputs
                .keys()
                .next_back()
                .copied()
                .unwrap_or(0)
                + 1;
            output.id = next;
            tx.state.outputs.insert(next, output.clone());
            Ok(next)
        })
    }
}

impl StoreTx<'_> {
    pub fn save_archive(&mut self, output: &Output) {
        self.state.archives.insert(
            output.trace_id.clone(),
            OutputArchive {
                id: output.id,
                trace_id: output.trace_id.clone(),
                created_at: self.now,
            },
        );
    }

    /// Queue an outbound transfer. Inserts are keyed by trace id, so a
    /// replayed handler never produces a second payment for the same trace.
    pub fn create_transfer(&mut self, transfer: Transfer) {
        self.state
            .transfers
            .entry(transfer.trace_id.clone())
            .or_insert(transfer);
    }
}
