use std::io;
use std::path::Path;

use super::{SourceRow, check_headers};
use crate::Result;

pub(super) fn read_rows_from_path(path: &Path) -> Result<Vec<SourceRow>> {
    let file = std::fs::File::open(path)?;
    read_rows(file)
}

/// Read comma separated rows, the first of which is the header.
pub(super) fn read_rows(mut reader: impl io::Read) -> Result<Vec<SourceRow>> {
    let mut contents = Vec::new();
    reader.read_to_end(&mut contents)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_slice());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    check_headers(&headers)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!("record {}: {error}, skipping", index + 1);
                continue;
            }
        };
        let number = record
            .position()
            .map_or(index + 2, |position| line_number(&contents, position.byte()));
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(SourceRow::new(number, &headers, record.iter()));
    }

    Ok(rows)
}

/// 1-based number of the first non-blank line at or after `offset`.
fn line_number(contents: &[u8], offset: u64) -> usize {
    let offset = usize::try_from(offset)
        .map_or(contents.len(), |offset| offset.min(contents.len()));
    let (before, rest) = contents.split_at(offset);
    let leading_breaks = rest
        .iter()
        .take_while(|byte| **byte == b'\r' || **byte == b'\n')
        .filter(|byte| **byte == b'\n')
        .count();
    before.iter().filter(|byte| **byte == b'\n').count() + leading_breaks + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{CHECK_AMOUNT, CHILD_ID, DESCRIPTION, TIER_1_TYPE};

    #[test]
    fn reads_rows_by_header() {
        let source = "\
Parent ID,Child ID,Bank Date,Customer,Check Amount,Tier 1 - Type,Description
1,9100,01/15/2025,,\"$1,250.00\",Income,first
1,9101,01/16/2025,Acme,12.5,Expense,\"second, with comma\"

2,9102
";
        let rows = read_rows(source.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].number, 2);
        assert_eq!(rows[0].get(CHILD_ID), Some("9100"));
        assert_eq!(rows[0].get(CHECK_AMOUNT), Some("$1,250.00"));
        assert_eq!(rows[0].get("Customer"), None);
        assert_eq!(rows[1].get(TIER_1_TYPE), Some("Expense"));
        assert_eq!(rows[1].get(DESCRIPTION), Some("second, with comma"));
        assert_eq!(rows[2].number, 5);
        assert_eq!(rows[2].get(CHECK_AMOUNT), None);
    }

    #[test]
    fn row_numbers_count_blank_lines() {
        let source = "Child ID,Check Amount\r\n\r\n\r\n9100,5\r\n,\r\n9101,6\r\n";
        let rows = read_rows(source.as_bytes()).unwrap();

        let numbers: Vec<_> = rows.iter().map(|row| row.number).collect();
        assert_eq!(numbers, [4, 6]);
    }

    #[test]
    fn line_number_skips_leading_breaks() {
        let contents = b"a\n\nb\n";
        assert_eq!(line_number(contents, 0), 1);
        assert_eq!(line_number(contents, 2), 3);
        assert_eq!(line_number(contents, 3), 3);
        assert_eq!(line_number(contents, 99), 4);
    }

    #[test]
    fn rejects_missing_headers() {
        let source = "Child ID,Amount\n9100,5\n";
        assert!(read_rows(source.as_bytes()).is_err());
    }
}
