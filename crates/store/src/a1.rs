//! Spreadsheet-style column letters and range expressions.
//!
//! Everything here is 1-based, matching how ranges are addressed on the
//! wire: column 1 = "A", column 27 = "AA", cell (1, 1) = "A1".

use tallysheet_core::{TallyError, TallyResult};

/// Convert a 1-based column number to its letter label.
/// 1 = "A", 26 = "Z", 27 = "AA", 28 = "AB", ...
#[must_use]
pub fn column_letter(mut col: u32) -> String {
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.insert(0, ((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result
}

/// Convert a column letter label back to its 1-based number.
pub fn column_number(letters: &str) -> TallyResult<u32> {
    if letters.is_empty() {
        return Err(TallyError::validation("empty column label"));
    }
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(TallyError::Validation(format!(
                "invalid column label: {letters}"
            )));
        }
        col = col * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1;
    }
    Ok(col)
}

/// A parsed range expression. Rows and columns are 1-based; spans are
/// unbounded in the other dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeExpr {
    /// A single cell, e.g. "C1".
    Cell { col: u32, row: u32 },
    /// A bounded rectangle, e.g. "C6:C20".
    Rect {
        start_col: u32,
        start_row: u32,
        end_col: u32,
        end_row: u32,
    },
    /// Whole columns, e.g. "A:A".
    Cols { start: u32, end: u32 },
    /// Whole rows, e.g. "1:1".
    Rows { start: u32, end: u32 },
}

/// Parse a range expression ("A:A", "1:1", "C1", "C6:C20").
pub fn parse_range(expr: &str) -> TallyResult<RangeExpr> {
    let invalid = || TallyError::Validation(format!("invalid range: {expr}"));

    match expr.split_once(':') {
        None => {
            let (col, row) = split_cell(expr).ok_or_else(invalid)?;
            Ok(RangeExpr::Cell { col, row })
        }
        Some((left, right)) => {
            if left.is_empty() || right.is_empty() {
                return Err(invalid());
            }
            let left_digits = left.bytes().all(|b| b.is_ascii_digit());
            let right_digits = right.bytes().all(|b| b.is_ascii_digit());
            let left_alpha = left.bytes().all(|b| b.is_ascii_alphabetic());
            let right_alpha = right.bytes().all(|b| b.is_ascii_alphabetic());

            if left_digits && right_digits {
                let start: u32 = left.parse().map_err(|_| invalid())?;
                let end: u32 = right.parse().map_err(|_| invalid())?;
                if start == 0 || end == 0 {
                    return Err(invalid());
                }
                return Ok(RangeExpr::Rows { start, end });
            }
            if left_alpha && right_alpha {
                return Ok(RangeExpr::Cols {
                    start: column_number(left)?,
                    end: column_number(right)?,
                });
            }

            let (start_col, start_row) = split_cell(left).ok_or_else(invalid)?;
            let (end_col, end_row) = split_cell(right).ok_or_else(invalid)?;
            Ok(RangeExpr::Rect {
                start_col,
                start_row,
                end_col,
                end_row,
            })
        }
    }
}

/// Split "C12" into (3, 12). Returns `None` on anything malformed.
fn split_cell(cell: &str) -> Option<(u32, u32)> {
    let split = cell.bytes().position(|b| b.is_ascii_digit())?;
    if split == 0 {
        return None;
    }
    let col = column_number(&cell[..split]).ok()?;
    let row: u32 = cell[split..].parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_from_numbers() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(53), "BA");
        assert_eq!(column_letter(702), "ZZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn numbers_from_letters() {
        assert_eq!(column_number("A").unwrap(), 1);
        assert_eq!(column_number("Z").unwrap(), 26);
        assert_eq!(column_number("AA").unwrap(), 27);
        assert_eq!(column_number("AAA").unwrap(), 703);
        assert_eq!(column_number("aa").unwrap(), 27);
        assert!(column_number("").is_err());
        assert!(column_number("A1").is_err());
    }

    #[test]
    fn range_parsing() {
        assert_eq!(parse_range("C1").unwrap(), RangeExpr::Cell { col: 3, row: 1 });
        assert_eq!(
            parse_range("C6:C20").unwrap(),
            RangeExpr::Rect {
                start_col: 3,
                start_row: 6,
                end_col: 3,
                end_row: 20
            }
        );
        assert_eq!(parse_range("A:A").unwrap(), RangeExpr::Cols { start: 1, end: 1 });
        assert_eq!(parse_range("1:1").unwrap(), RangeExpr::Rows { start: 1, end: 1 });
        assert!(parse_range("").is_err());
        assert!(parse_range("C0").is_err());
        assert!(parse_range(":A").is_err());
        // Rows are 1-based; a zero row must not parse.
        assert!(parse_range("0:0").is_err());
        assert!(parse_range("0:3").is_err());
    }
}
