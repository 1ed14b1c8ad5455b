use std::fmt::Write as _;

use anstyle::{AnsiColor, Color, Style};
use misc_income_sync::reconcile::{ReconcileResult, Status, SubmitSummary};
use misc_income_sync::{Decimal, Record};

pub struct Palette {
    new: Style,
    different: Style,
    missing: Style,
    failed: Style,
    bold: Style,
}

impl Palette {
    pub fn colored() -> Self {
        let fg = |color| Style::new().fg_color(Some(Color::Ansi(color)));
        Palette {
            new: fg(AnsiColor::Green),
            different: fg(AnsiColor::Yellow),
            missing: fg(AnsiColor::Magenta),
            failed: fg(AnsiColor::Red),
            bold: Style::new().bold(),
        }
    }

    pub fn plain() -> Self {
        Palette {
            new: Style::new(),
            different: Style::new(),
            missing: Style::new(),
            failed: Style::new(),
            bold: Style::new(),
        }
    }

    fn for_status(&self, status: Status) -> Style {
        match status {
            Status::New => self.new,
            Status::Different => self.different,
            Status::Missing => self.missing,
            Status::FailedToAdd => self.failed,
            Status::Unchanged => Style::new(),
        }
    }
}

fn heading(status: Status) -> &'static str {
    match status {
        Status::New => "New (not in ledger)",
        Status::Unchanged => "Unchanged",
        Status::Different => "Different (needs updating in ledger)",
        Status::Missing => "Missing (in ledger, not in source)",
        Status::FailedToAdd => "Failed to add",
    }
}

fn write_record(output: &mut String, record: &Record) {
    let _ = writeln!(
        output,
        "{} deposit '{}' to {}: {:.2}",
        record.date, record.memo, record.deposit_to_account, record.total_amount
    );
    for line in &record.lines {
        let _ = write!(
            output,
            "    {:<30} {:>12}  {}",
            line.account,
            format!("{:.2}", line.amount),
            line.received_from
        );
        if !line.memo.is_empty() {
            let _ = write!(output, "  ; {}", line.memo);
        }
        output.push('\n');
    }
}

/// Every deposit that needs attention, followed by a summary.
pub fn render_diff(result: &ReconcileResult, palette: &Palette) -> String {
    let mut output = String::new();

    for item in &result.items {
        if item.status == Status::Unchanged {
            continue;
        }
        let style = palette.for_status(item.status);
        let _ = writeln!(output, "{style}━━━ {} ━━━{style:#}", heading(item.status));
        write_record(&mut output, &item.record);
        for delta in item.differences() {
            let _ = writeln!(output, "  - {delta}");
        }
        output.push('\n');
    }

    let bold = palette.bold;
    if result.len() == result.unchanged_count() {
        let _ = writeln!(output, "✓ All deposits match!");
        return output;
    }
    let _ = writeln!(output, "{bold}━━━ Summary ━━━{bold:#}");
    let counts = [
        (Status::Unchanged, result.unchanged_count(), "unchanged"),
        (Status::Different, result.different_count(), "different (need update)"),
        (Status::New, result.new_count(), "new (not in ledger)"),
        (Status::Missing, result.missing_count(), "missing (not in source)"),
        (Status::FailedToAdd, result.failed_count(), "failed to add"),
    ];
    for (status, count, label) in counts {
        if count > 0 {
            let style = palette.for_status(status);
            let _ = writeln!(output, "  {style}{count}{style:#} deposit(s) {label}");
        }
    }
    output
}

/// Outcome of submitting the new deposits.
pub fn render_submitted(
    result: &ReconcileResult,
    summary: SubmitSummary,
    palette: &Palette,
) -> String {
    let mut output = String::new();

    for item in &result.items {
        match (item.status, &item.record.txn_id) {
            (Status::New, Some(txn_id)) => {
                let style = palette.new;
                let _ = writeln!(output, "{style}added{style:#} '{}' as {txn_id}", item.key());
            }
            (Status::FailedToAdd, _) => {
                let style = palette.failed;
                let _ = writeln!(output, "{style}failed{style:#} '{}'", item.key());
            }
            _ => {}
        }
    }
    let bold = palette.bold;
    let _ = writeln!(
        output,
        "{bold}{} added, {} failed{bold:#}",
        summary.added, summary.failed
    );
    output
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn write_row(output: &mut String, cells: [&str; 6]) {
    let _ = writeln!(
        output,
        "{:<12}  {:<12}  {:<15}  {:<17}  {:<17}  {:>12}",
        truncate(cells[0], 12),
        truncate(cells[1], 12),
        truncate(cells[2], 15),
        truncate(cells[3], 17),
        truncate(cells[4], 17),
        cells[5],
    );
}

/// The ledger as a flat table, one row per line.
pub fn render_ledger(records: &[Record]) -> String {
    let mut output = String::new();
    if records.is_empty() {
        output.push_str("No deposits found in the ledger.\n");
        return output;
    }

    let rule = "-".repeat(95);
    let header = [
        "Date",
        "Memo",
        "Deposit Account",
        "Account",
        "Received From",
        "Amount",
    ];
    write_row(&mut output, header);
    let _ = writeln!(output, "{rule}");

    let mut grand_total = Decimal::ZERO;
    let mut line_count = 0;
    for record in records {
        grand_total = grand_total.saturating_add(record.total_amount);
        line_count += record.lines.len();

        let date = record.date.format("%m/%d/%Y").to_string();
        if record.lines.is_empty() {
            let amount = format!("{:.2}", Decimal::ZERO);
            write_row(
                &mut output,
                [&date, &record.memo, &record.deposit_to_account, "", "", &amount],
            );
        }
        for line in &record.lines {
            let amount = format!("{:.2}", line.amount);
            write_row(
                &mut output,
                [
                    &date,
                    &record.memo,
                    &record.deposit_to_account,
                    &line.account,
                    &line.received_from,
                    &amount,
                ],
            );
        }
    }

    let _ = writeln!(output, "{rule}");
    let _ = writeln!(
        output,
        "SUMMARY: {} deposits, {line_count} lines     Total: {grand_total:.2}",
        records.len()
    );
    output
}
