use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Decimal;

/// A deposit and its line items.
///
/// The memo carries the business identity key (the spreadsheet's "Child ID"),
/// which is what records are matched on across the source file and the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Assigned by the ledger once the deposit is stored. Never set by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txn_id: Option<String>,
    pub date: NaiveDate,
    pub memo: String,
    pub deposit_to_account: String,
    pub total_amount: Decimal,
    #[serde(default)]
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub received_from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_from_id: Option<String>,
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub memo: String,
}

impl Record {
    pub fn new(
        memo: impl Into<String>,
        date: NaiveDate,
        deposit_to_account: impl Into<String>,
    ) -> Self {
        Record {
            txn_id: None,
            date,
            memo: memo.into(),
            deposit_to_account: deposit_to_account.into(),
            total_amount: Decimal::ZERO,
            lines: Vec::new(),
        }
    }

    /// The identity key used for matching.
    pub fn key(&self) -> &str {
        &self.memo
    }

    /// Append a line and add its amount to the total.
    ///
    /// Panics if the total overflows; see [`Record::try_push_line`].
    pub fn push_line(&mut self, line: Line) {
        self.total_amount += line.amount;
        self.lines.push(line);
    }

    /// Append a line unless its amount would overflow the total, in which case
    /// the line is handed back.
    pub fn try_push_line(&mut self, line: Line) -> Result<(), Line> {
        match self.total_amount.checked_add(line.amount) {
            Some(total) => {
                self.total_amount = total;
                self.lines.push(line);
                Ok(())
            }
            None => Err(line),
        }
    }

    /// Sum of the line amounts, `None` on overflow.
    pub fn lines_total(&self) -> Option<Decimal> {
        self.lines
            .iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.amount))
    }
}

impl Line {
    pub fn new(
        received_from: impl Into<String>,
        account: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Line {
            received_from: received_from.into(),
            received_from_id: None,
            account: account.into(),
            account_id: None,
            amount,
            memo: String::new(),
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }
}
