use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{Decimal, Line, Record, within_tolerance};

/// One field that differs between the ledger copy of a deposit and the incoming one.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDelta {
    DepositAccount {
        existing: String,
        incoming: String,
    },
    TotalAmount {
        existing: Decimal,
        incoming: Decimal,
    },
    LineCount {
        existing: usize,
        incoming: usize,
    },
    /// Summed line amounts for one account. A side without lines for the account counts as zero.
    LineAccount {
        account: String,
        existing: Decimal,
        incoming: Decimal,
    },
}

impl fmt::Display for FieldDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDelta::DepositAccount { existing, incoming } => {
                write!(f, "Deposit Account: existing '{existing}' vs incoming '{incoming}'")
            }
            FieldDelta::TotalAmount { existing, incoming } => {
                write!(f, "Total Amount: existing {existing:.2} vs incoming {incoming:.2}")
            }
            FieldDelta::LineCount { existing, incoming } => {
                write!(f, "Line Count: existing {existing} vs incoming {incoming}")
            }
            FieldDelta::LineAccount {
                account,
                existing,
                incoming,
            } => write!(f, "{account}: existing {existing:.2} vs incoming {incoming:.2}"),
        }
    }
}

fn sums_by_account(lines: &[Line]) -> BTreeMap<&str, Decimal> {
    let mut sums = BTreeMap::new();
    for line in lines {
        let sum = sums.entry(line.account.as_str()).or_insert(Decimal::ZERO);
        *sum = sum.saturating_add(line.amount);
    }
    sums
}

/// Per-account sums that disagree, over the union of accounts used by either side.
fn account_deltas(existing: &Record, incoming: &Record) -> Vec<FieldDelta> {
    let existing_sums = sums_by_account(&existing.lines);
    let incoming_sums = sums_by_account(&incoming.lines);
    let accounts: BTreeSet<&str> = existing_sums
        .keys()
        .chain(incoming_sums.keys())
        .copied()
        .collect();

    accounts
        .into_iter()
        .filter_map(|account| {
            let existing = existing_sums.get(account).copied().unwrap_or_default();
            let incoming = incoming_sums.get(account).copied().unwrap_or_default();
            (!within_tolerance(existing, incoming)).then(|| FieldDelta::LineAccount {
                account: account.to_owned(),
                existing,
                incoming,
            })
        })
        .collect()
}

/// Whether the ledger copy and the incoming copy describe the same deposit.
///
/// Checks, in order: deposit account, line count, total amount, and line amounts
/// summed per account. Line order is irrelevant.
pub fn records_match(existing: &Record, incoming: &Record) -> bool {
    // date, txn id and line memos can be anything

    if existing.deposit_to_account != incoming.deposit_to_account {
        return false;
    }
    if existing.lines.len() != incoming.lines.len() {
        return false;
    }
    if !within_tolerance(existing.total_amount, incoming.total_amount) {
        return false;
    }

    account_deltas(existing, incoming).is_empty()
}

/// Every reason [`records_match`] would reject the pair, for human review.
pub fn differences(existing: &Record, incoming: &Record) -> Vec<FieldDelta> {
    let mut deltas = Vec::new();

    if existing.deposit_to_account != incoming.deposit_to_account {
        deltas.push(FieldDelta::DepositAccount {
            existing: existing.deposit_to_account.clone(),
            incoming: incoming.deposit_to_account.clone(),
        });
    }
    if !within_tolerance(existing.total_amount, incoming.total_amount) {
        deltas.push(FieldDelta::TotalAmount {
            existing: existing.total_amount,
            incoming: incoming.total_amount,
        });
    }
    if existing.lines.len() != incoming.lines.len() {
        deltas.push(FieldDelta::LineCount {
            existing: existing.lines.len(),
            incoming: incoming.lines.len(),
        });
    }
    deltas.extend(account_deltas(existing, incoming));

    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn deposit(memo: &str, lines: &[(&str, Decimal)]) -> Record {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let mut record = Record::new(memo, date, "Checking");
        for (account, amount) in lines {
            record.push_line(Line::new("Misc Income", *account, *amount));
        }
        record
    }

    fn format_deltas(deltas: &[FieldDelta]) -> String {
        deltas
            .iter()
            .map(|delta| format!("{delta}\n"))
            .collect()
    }

    #[test]
    fn match_simple() {
        let existing = deposit("100", &[("Sales", dec!(50.00))]);
        let incoming = deposit("100", &[("Sales", dec!(50.00))]);

        assert!(records_match(&existing, &incoming));
        assert!(differences(&existing, &incoming).is_empty());
    }

    #[test]
    fn match_ignores_line_order() {
        let existing = deposit("100", &[("Sales", dec!(30)), ("Shipping", dec!(20))]);
        let incoming = deposit("100", &[("Shipping", dec!(20)), ("Sales", dec!(30))]);

        assert!(records_match(&existing, &incoming));
        assert!(records_match(&incoming, &existing));
    }

    #[test]
    fn match_ignores_date_memo_and_txn_id() {
        let existing = deposit("100", &[("Sales", dec!(50.00))]);
        let mut incoming = existing.clone();
        incoming.txn_id = Some("80-1700000000".to_owned());
        incoming.date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        incoming.lines[0].memo = "changed".to_owned();
        incoming.lines[0].received_from = "Someone Else".to_owned();

        assert!(records_match(&existing, &incoming));
    }

    #[test]
    fn match_within_one_cent() {
        let existing = deposit("100", &[("Sales", dec!(50.00))]);
        let incoming = deposit("100", &[("Sales", dec!(50.01))]);

        assert!(records_match(&existing, &incoming));
        assert!(records_match(&incoming, &existing));
    }

    #[test]
    fn dont_match_beyond_one_cent() {
        let existing = deposit("100", &[("Sales", dec!(50.00))]);
        let incoming = deposit("100", &[("Sales", dec!(50.011))]);

        assert!(!records_match(&existing, &incoming));
    }

    #[test]
    fn dont_match_total_outside_tolerance_alone() {
        let existing = deposit("100", &[("Sales", dec!(50.00))]);
        let mut incoming = existing.clone();
        incoming.total_amount = dec!(50.02);

        assert!(!records_match(&existing, &incoming));
        insta::assert_snapshot!(format_deltas(&differences(&existing, &incoming)), @"Total Amount: existing 50.00 vs incoming 50.02");
    }

    #[test]
    fn dont_match_different_deposit_account() {
        let existing = deposit("100", &[("Sales", dec!(50.00))]);
        let mut incoming = existing.clone();
        incoming.deposit_to_account = "Savings".to_owned();

        assert!(!records_match(&existing, &incoming));
        insta::assert_snapshot!(format_deltas(&differences(&existing, &incoming)), @"Deposit Account: existing 'Checking' vs incoming 'Savings'");
    }

    #[test]
    fn dont_match_different_line_count() {
        let existing = deposit("100", &[("Sales", dec!(50.00))]);
        let incoming = deposit("100", &[("Sales", dec!(25.00)), ("Sales", dec!(25.00))]);

        assert!(!records_match(&existing, &incoming));
        insta::assert_snapshot!(format_deltas(&differences(&existing, &incoming)), @"Line Count: existing 1 vs incoming 2");
    }

    #[test]
    fn dont_match_amount_moved_between_accounts() {
        let existing = deposit("100", &[("Sales", dec!(30)), ("Shipping", dec!(20))]);
        let incoming = deposit("100", &[("Sales", dec!(20)), ("Shipping", dec!(30))]);

        assert!(!records_match(&existing, &incoming));
        insta::assert_snapshot!(format_deltas(&differences(&existing, &incoming)), @r"
        Sales: existing 30.00 vs incoming 20.00
        Shipping: existing 20.00 vs incoming 30.00
        ");
    }

    #[test]
    fn match_uses_grouped_sums_per_account() {
        // individual lines differ but the per-account sums agree
        let existing = deposit("100", &[("Sales", dec!(10)), ("Sales", dec!(40))]);
        let incoming = deposit("100", &[("Sales", dec!(25)), ("Sales", dec!(25))]);

        assert!(records_match(&existing, &incoming));
        assert!(differences(&existing, &incoming).is_empty());
    }

    #[test]
    fn account_only_on_one_side_is_a_full_delta() {
        let existing = deposit("100", &[("Sales", dec!(50.00))]);
        let incoming = deposit("100", &[("Rental", dec!(50.00))]);

        assert!(!records_match(&existing, &incoming));
        insta::assert_snapshot!(format_deltas(&differences(&existing, &incoming)), @r"
        Rental: existing 0.00 vs incoming 50.00
        Sales: existing 50.00 vs incoming 0.00
        ");
    }

    #[test]
    fn differences_report_total_and_account() {
        let existing = deposit("100", &[("Sales", dec!(50.00))]);
        let incoming = deposit("100", &[("Sales", dec!(65.00))]);

        assert!(!records_match(&existing, &incoming));
        insta::assert_snapshot!(format_deltas(&differences(&existing, &incoming)), @r"
        Total Amount: existing 50.00 vs incoming 65.00
        Sales: existing 50.00 vs incoming 65.00
        ");
    }

    #[test]
    fn extreme_amounts_compare_without_overflow() {
        let mut existing = deposit("100", &[]);
        existing.lines = vec![
            Line::new("Misc Income", "Sales", Decimal::MAX),
            Line::new("Misc Income", "Sales", Decimal::MAX),
        ];
        existing.total_amount = Decimal::MAX;
        let mut incoming = existing.clone();
        incoming.total_amount = Decimal::MIN;

        assert!(!records_match(&existing, &incoming));
        let deltas = differences(&existing, &incoming);
        assert_eq!(deltas.len(), 1);
        assert!(matches!(deltas[0], FieldDelta::TotalAmount { .. }));
    }

    #[test]
    fn negative_and_zero_lines_are_compared_as_is() {
        let existing = deposit("100", &[("Sales", dec!(-5.00)), ("Misc Credits", dec!(0))]);
        let incoming = deposit("100", &[("Misc Credits", dec!(0)), ("Sales", dec!(-5.00))]);

        assert!(records_match(&existing, &incoming));
    }
}
