//! Column letters and cell addresses
//!
//! Columns are 1-indexed letter codes (A=1 … Z=26, AA=27, …, XFD=16384).
//! Addresses use the standard `<letters><1-based row>` form, e.g. `L11`.

use crate::error::{SheetcalcError, SheetcalcResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Widest column a worksheet can hold (XFD).
pub const MAX_COLUMN: u32 = 16_384;

/// Last row a worksheet can hold.
pub const MAX_ROW: u32 = 1_048_576;

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]{1,3})([1-9][0-9]*)$").expect("valid address regex"));

/// Convert a 1-based column number to its letter code (1→A, 27→AA, 703→AAA).
///
/// Zero has no letter code and renders as an empty string.
pub fn number_to_column(n: u32) -> String {
    let mut letters = Vec::new();
    let mut num = n;

    while num > 0 {
        let remainder = (num - 1) % 26;
        letters.push((b'A' + remainder as u8) as char);
        num = (num - 1) / 26;
    }

    letters.iter().rev().collect()
}

/// Convert a letter code to its 1-based column number (case-insensitive).
pub fn column_to_number(column: &str) -> SheetcalcResult<u32> {
    let trimmed = column.trim();
    if trimmed.is_empty() {
        return Err(SheetcalcError::InvalidColumn(column.to_string()));
    }

    let mut result: u32 = 0;
    for c in trimmed.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(SheetcalcError::InvalidColumn(column.to_string()));
        }
        let val = (c.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        result = result
            .checked_mul(26)
            .and_then(|r| r.checked_add(val))
            .filter(|r| *r <= MAX_COLUMN)
            .ok_or_else(|| SheetcalcError::InvalidColumn(column.to_string()))?;
    }

    Ok(result)
}

/// Validate a column identifier and return it upper-cased.
pub fn normalize_column(column: &str) -> SheetcalcResult<String> {
    column_to_number(column).map(number_to_column)
}

/// Letter codes A..=bound for a 1-based column bound.
pub fn column_span(bound: u32) -> Vec<String> {
    (1..=bound).map(number_to_column).collect()
}

/// A single cell location: column letters plus 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub column: String,
    pub row: u32,
}

impl CellAddress {
    /// Build an address, validating both parts against worksheet limits.
    pub fn new(column: &str, row: u32) -> SheetcalcResult<Self> {
        let column = normalize_column(column)?;
        if row == 0 || row > MAX_ROW {
            return Err(SheetcalcError::InvalidRange(format!(
                "row {} is outside 1..={} for column {}",
                row, MAX_ROW, column
            )));
        }
        Ok(Self { column, row })
    }

    /// Zero-based (row, column) pair as the codec addresses cells.
    pub fn to_zero_based(&self) -> SheetcalcResult<(u32, u32)> {
        let col = column_to_number(&self.column)?;
        Ok((self.row - 1, col - 1))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl FromStr for CellAddress {
    type Err = SheetcalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = ADDRESS_RE
            .captures(s.trim())
            .ok_or_else(|| SheetcalcError::InvalidRequest(format!("invalid cell address '{}'", s)))?;
        let row: u32 = caps[2]
            .parse()
            .map_err(|_| SheetcalcError::InvalidRange(format!("row out of range in '{}'", s)))?;
        CellAddress::new(&caps[1], row)
    }
}
