//! Raw text cell → typed value

use crate::types::CellValue;

/// Parse a raw grid cell.
///
/// Blank input is `Empty`. Otherwise commas are treated as thousands
/// separators and stripped before a numeric parse; anything that still fails
/// to parse (or parses to a non-finite value) is kept as the original text.
pub fn parse_cell(raw: &str) -> CellValue {
    if raw.trim().is_empty() {
        return CellValue::Empty;
    }

    match parse_number(raw) {
        Some(n) => CellValue::Number(n),
        None => CellValue::Text(raw.to_string()),
    }
}

/// Numeric parse tolerant of `1,234.5`-style grouping.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}
