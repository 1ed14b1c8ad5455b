use crate::Record;

/// Order records by deposit date, then by memo.
///
/// Only meant for listings; reconciliation keeps the caller's order.
pub fn sort_for_display(records: &mut [Record]) {
    records.sort_by(|a, b| display_order(a).cmp(&display_order(b)));
}

fn display_order(record: &Record) -> (chrono::NaiveDate, u64, &str) {
    (record.date, numeric_memo(&record.memo), &record.memo)
}

// Child IDs are usually numeric; "9" should sort before "10"
fn numeric_memo(memo: &str) -> u64 {
    memo.trim().parse().unwrap_or(u64::MAX)
}
