//! Reconciling deposits from a source file against the deposits already in the ledger.

mod matching;

pub use matching::{FieldDelta, differences, records_match};

use std::collections::HashMap;
use std::fmt;

use crate::Record;
use crate::ledger::LedgerWriter;

/// Outcome of comparing one deposit against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Key not present in the ledger.
    New,
    Unchanged,
    /// Key present in the ledger but the contents disagree.
    Different,
    /// Key present in the ledger but absent from the source.
    Missing,
    /// Was [`Status::New`], but the ledger rejected it.
    FailedToAdd,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::New => "New",
            Status::Unchanged => "Unchanged",
            Status::Different => "Different",
            Status::Missing => "Missing",
            Status::FailedToAdd => "FailedToAdd",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileItem {
    pub status: Status,
    /// The incoming deposit, or the ledger deposit for [`Status::Missing`].
    pub record: Record,
    /// The ledger deposit it was matched with, if any.
    pub existing: Option<Record>,
}

impl ReconcileItem {
    pub fn key(&self) -> &str {
        self.record.key()
    }

    /// What differs between the ledger copy and the incoming copy.
    pub fn differences(&self) -> Vec<FieldDelta> {
        match &self.existing {
            Some(existing) => differences(existing, &self.record),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileResult {
    pub items: Vec<ReconcileItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitSummary {
    pub added: usize,
    pub failed: usize,
}

impl ReconcileResult {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, status: Status) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    pub fn new_count(&self) -> usize {
        self.count(Status::New)
    }

    pub fn unchanged_count(&self) -> usize {
        self.count(Status::Unchanged)
    }

    pub fn different_count(&self) -> usize {
        self.count(Status::Different)
    }

    pub fn missing_count(&self) -> usize {
        self.count(Status::Missing)
    }

    pub fn failed_count(&self) -> usize {
        self.count(Status::FailedToAdd)
    }

    /// Status of the deposit with the given key.
    pub fn status_of(&self, key: &str) -> Option<Status> {
        self.items
            .iter()
            .find(|item| item.key() == key)
            .map(|item| item.status)
    }

    /// The deposits that still have to be added to the ledger.
    pub fn new_records(&self) -> impl Iterator<Item = &Record> {
        self.items
            .iter()
            .filter(|item| item.status == Status::New)
            .map(|item| &item.record)
    }

    /// Submit every new deposit to the ledger.
    ///
    /// Accepted deposits keep their status and get the id the ledger assigned.
    /// Rejected ones become [`Status::FailedToAdd`]; the remaining deposits are
    /// still submitted.
    pub fn submit_new(&mut self, writer: &mut impl LedgerWriter) -> SubmitSummary {
        let mut summary = SubmitSummary::default();

        for item in &mut self.items {
            if item.status != Status::New {
                continue;
            }
            match writer.submit(&item.record) {
                Ok(txn_id) => {
                    tracing::info!("added deposit '{}' as {txn_id}", item.record.memo);
                    item.record.txn_id = Some(txn_id);
                    summary.added += 1;
                }
                Err(error) => {
                    tracing::error!("failed to add deposit '{}': {error}", item.record.memo);
                    item.record.txn_id = None;
                    item.status = Status::FailedToAdd;
                    tracing::info!("deposit '{}' is {}", item.record.memo, item.status);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

/// Index of the last record for every key.
fn index_by_key(records: &[Record]) -> HashMap<String, usize> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.key().to_owned(), index))
        .collect()
}

/// Classify every incoming deposit against the ledger, and every ledger deposit
/// the source no longer contains.
///
/// Deposits are matched on their memo. When a key occurs more than once on the
/// same side the last occurrence wins. Incoming deposits come first in their
/// original order, followed by the missing ledger deposits in ledger order.
pub fn reconcile(incoming: Vec<Record>, existing: Vec<Record>) -> ReconcileResult {
    tracing::info!(
        "reconciling {} incoming against {} ledger deposits",
        incoming.len(),
        existing.len()
    );

    let existing_index = index_by_key(&existing);
    let incoming_index = index_by_key(&incoming);

    let mut matched: Vec<Option<Record>> = Vec::with_capacity(existing.len());
    let mut missing = Vec::new();
    for (index, record) in existing.into_iter().enumerate() {
        if existing_index.get(record.key()) != Some(&index) {
            tracing::warn!(
                "ledger deposit '{}' occurs more than once, keeping the last",
                record.memo
            );
            matched.push(None);
        } else if incoming_index.contains_key(record.key()) {
            matched.push(Some(record));
        } else {
            matched.push(None);
            missing.push(record);
        }
    }

    let mut items = Vec::with_capacity(incoming_index.len() + missing.len());
    for (index, record) in incoming.into_iter().enumerate() {
        if incoming_index.get(record.key()) != Some(&index) {
            tracing::warn!("deposit '{}' occurs more than once, keeping the last", record.memo);
            continue;
        }

        let existing = existing_index
            .get(record.key())
            .and_then(|&at| matched[at].take());
        let status = match &existing {
            None => Status::New,
            Some(existing) if records_match(existing, &record) => Status::Unchanged,
            Some(_) => Status::Different,
        };
        tracing::info!("deposit '{}' is {status}", record.memo);
        items.push(ReconcileItem {
            status,
            record,
            existing,
        });
    }

    for record in missing {
        tracing::info!("deposit '{}' is {}", record.memo, Status::Missing);
        items.push(ReconcileItem {
            status: Status::Missing,
            record,
            existing: None,
        });
    }

    let result = ReconcileResult { items };
    tracing::info!(
        "reconciled: {} new, {} unchanged, {} different, {} missing",
        result.new_count(),
        result.unchanged_count(),
        result.different_count(),
        result.missing_count()
    );
    result
}
