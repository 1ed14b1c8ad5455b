//! Turning a deposit spreadsheet export into [`Record`]s.
//!
//! Every row is one line of a deposit; rows sharing a Child ID form one deposit.

mod delimited;
mod spreadsheet;

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, bail};
use chrono::NaiveDate;

use crate::{Decimal, Line, Record, Result};

pub const CHILD_ID: &str = "Child ID";
pub const CHECK_AMOUNT: &str = "Check Amount";
pub const TIER_1_TYPE: &str = "Tier 1 - Type";
pub const TIER_2_ACCOUNT: &str = "Tier 2 - Chart of Account";
pub const BANK_DATE: &str = "Bank Date";
pub const CUSTOMER: &str = "Customer";
pub const DESCRIPTION: &str = "Description";
pub const MEMO: &str = "Memo";

const REQUIRED_HEADERS: [&str; 2] = [CHILD_ID, CHECK_AMOUNT];

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Account every deposit is made to.
    pub deposit_to_account: String,
    /// Counterparty for rows without a customer.
    pub received_from: String,
    /// Deposit date for rows without a bank date.
    pub run_date: NaiveDate,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            deposit_to_account: "Checking".to_owned(),
            received_from: "Misc Income".to_owned(),
            run_date: chrono::Local::now().date_naive(),
        }
    }
}

/// Read all deposits from a `.csv` or spreadsheet file.
pub fn read_records(file: impl AsRef<Path>, options: &ImportOptions) -> Result<Vec<Record>> {
    let file = file.as_ref();
    let extension = file
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "csv" | "txt" => delimited::read_rows_from_path(file),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => spreadsheet::read_rows(file),
        _ => bail!("Unsupported source file type: {}", file.display()),
    }
    .with_context(|| format!("Failed to read source file: {}", file.display()))?;

    let records = group_rows(rows, options);
    tracing::info!(
        "read {} deposits with {} lines from {}",
        records.len(),
        records.iter().map(|record| record.lines.len()).sum::<usize>(),
        file.display()
    );
    Ok(records)
}

/// Read and concatenate the deposits of several files.
pub fn read_all<P: AsRef<Path>>(
    files: impl IntoIterator<Item = P>,
    options: &ImportOptions,
) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for file in files {
        records.extend(read_records(file, options)?);
    }
    Ok(records)
}

/// One data row, keyed by header.
#[derive(Debug, Default)]
pub(crate) struct SourceRow {
    /// 1-based row number in the file, header included.
    pub number: usize,
    pub values: HashMap<String, String>,
}

impl SourceRow {
    pub fn new<'a>(
        number: usize,
        headers: &[String],
        cells: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let values = headers
            .iter()
            .cloned()
            .zip(cells.into_iter().map(|cell| cell.trim().to_owned()))
            .collect();
        SourceRow { number, values }
    }

    /// The trimmed cell under `header`, unless blank.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values
            .get(header)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

pub(crate) fn check_headers(headers: &[String]) -> Result<()> {
    let missing: Vec<_> = REQUIRED_HEADERS
        .iter()
        .filter(|required| !headers.iter().any(|header| header == *required))
        .collect();
    if !missing.is_empty() {
        bail!("Required columns not found in header: {missing:?}");
    }
    Ok(())
}

fn group_rows(rows: impl IntoIterator<Item = SourceRow>, options: &ImportOptions) -> Vec<Record> {
    let mut records: Vec<Record> = Vec::new();
    let mut by_child_id: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(child_id) = row.get(CHILD_ID) else {
            tracing::warn!("row {}: missing {CHILD_ID}, skipping", row.number);
            continue;
        };
        let Some(raw_amount) = row.get(CHECK_AMOUNT) else {
            tracing::warn!("row {}: missing {CHECK_AMOUNT}, skipping", row.number);
            continue;
        };
        let Some(amount) = parse_amount(raw_amount) else {
            tracing::warn!("row {}: could not parse amount '{raw_amount}', skipping", row.number);
            continue;
        };
        let date = match row.get(BANK_DATE) {
            None => options.run_date,
            Some(raw_date) => match parse_date(raw_date) {
                Some(date) => date,
                None => {
                    tracing::warn!(
                        "row {}: could not parse date '{raw_date}', skipping",
                        row.number
                    );
                    continue;
                }
            },
        };

        let account = line_account(row.get(TIER_1_TYPE), row.get(TIER_2_ACCOUNT));
        let received_from = row.get(CUSTOMER).unwrap_or(options.received_from.as_str());
        let memo = row.get(DESCRIPTION).or_else(|| row.get(MEMO)).unwrap_or_default();
        let line = Line::new(received_from, account, amount).with_memo(memo);
        tracing::debug!("row {}: {child_id} {account} {amount}", row.number);

        let index = *by_child_id.entry(child_id.to_owned()).or_insert_with(|| {
            records.push(Record::new(child_id, date, &options.deposit_to_account));
            records.len() - 1
        });
        if let Err(line) = records[index].try_push_line(line) {
            tracing::warn!(
                "row {}: amount {} overflows the total of '{child_id}', skipping",
                row.number,
                line.amount
            );
        }
    }

    records
}

/// The income account a row is booked to, from its tier columns.
pub fn line_account(tier_1_type: Option<&str>, tier_2_account: Option<&str>) -> &'static str {
    match tier_1_type.unwrap_or("Income") {
        "Income" => "Sales",
        "Expense" => "Automobile Expense",
        "Equity" => "Shareholder Distributions",
        "Other Income" if tier_2_account == Some("Rental") => "Rental",
        "Other Income" => "Misc Credits",
        _ => "Sales",
    }
}

/// Parse amounts like `1234.5`, `$1,234.50` or `(12.00)`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '"') && !c.is_whitespace())
        .collect();
    match cleaned
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => Decimal::from_str(inner).ok().map(|amount| -amount),
        None => Decimal::from_str(&cleaned).ok(),
    }
}

/// Parse `MM/DD/YYYY`, ISO dates and spreadsheet serial numbers.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    for format in ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Some(date);
        }
    }
    let serial: f64 = raw.parse().ok()?;
    serial_to_date(serial)
}

// spreadsheet epoch, accounting for the 1900 leap year bug
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_days(chrono::Days::new(serial.trunc() as u64))
}
