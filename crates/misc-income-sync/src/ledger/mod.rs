//! Access to the accounting back-end that holds the authoritative deposits.

mod file;
mod memory;

pub use file::FileLedger;
pub use memory::MemoryLedger;

use crate::{Record, Result, within_tolerance};

/// Reads every deposit currently stored in the ledger.
pub trait LedgerReader {
    fn list_all(&mut self) -> Result<Vec<Record>>;
}

/// Stores new deposits, returning the transaction id the ledger assigned.
pub trait LedgerWriter {
    fn submit(&mut self, record: &Record) -> Result<String, SubmitError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("rejected by ledger: {0}")]
    Rejected(String),
    #[error("failed to write ledger: {0}")]
    Storage(#[from] std::io::Error),
    #[error("failed to encode ledger: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Checks a ledger applies before accepting a deposit.
pub(crate) fn validate(record: &Record) -> Result<(), SubmitError> {
    if record.deposit_to_account.trim().is_empty() {
        return Err(SubmitError::Rejected("deposit account is empty".to_owned()));
    }
    if record.lines.is_empty() {
        return Err(SubmitError::Rejected("deposit has no lines".to_owned()));
    }
    if let Some(position) = record
        .lines
        .iter()
        .position(|line| line.account.trim().is_empty())
    {
        return Err(SubmitError::Rejected(format!(
            "line {} has no account",
            position + 1
        )));
    }
    let Some(lines_total) = record.lines_total() else {
        return Err(SubmitError::Rejected("sum of lines overflows".to_owned()));
    };
    if !within_tolerance(record.total_amount, lines_total) {
        return Err(SubmitError::Rejected(format!(
            "total {:.2} does not match sum of lines {lines_total:.2}",
            record.total_amount
        )));
    }
    if record.txn_id.is_some() {
        return Err(SubmitError::Rejected(
            "deposit already has a transaction id".to_owned(),
        ));
    }
    Ok(())
}
