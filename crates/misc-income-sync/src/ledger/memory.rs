use std::collections::HashSet;

use super::{LedgerReader, LedgerWriter, SubmitError, validate};
use crate::{Record, Result};

/// Ledger kept in memory, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Vec<Record>,
    rejected_keys: HashSet<String>,
    next_id: u64,
}

impl MemoryLedger {
    pub fn new(records: Vec<Record>) -> Self {
        MemoryLedger {
            records,
            ..Default::default()
        }
    }

    /// Reject every submission of a deposit with this key.
    pub fn rejecting(mut self, key: impl Into<String>) -> Self {
        self.rejected_keys.insert(key.into());
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl LedgerReader for MemoryLedger {
    fn list_all(&mut self) -> Result<Vec<Record>> {
        Ok(self.records.clone())
    }
}

impl LedgerWriter for MemoryLedger {
    fn submit(&mut self, record: &Record) -> Result<String, SubmitError> {
        if self.rejected_keys.contains(record.key()) {
            return Err(SubmitError::Rejected(format!(
                "deposit '{}' is not accepted",
                record.key()
            )));
        }
        validate(record)?;

        self.next_id += 1;
        let txn_id = format!("MEM-{}", self.next_id);
        let mut stored = record.clone();
        stored.txn_id = Some(txn_id.clone());
        self.records.push(stored);
        Ok(txn_id)
    }
}
