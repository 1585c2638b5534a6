//! Fresh single-sheet workbook export

use crate::error::SheetcalcResult;
use crate::excel::grid::{GridAccessor, WorkbookGrid};
use crate::types::CellValue;
use std::path::Path;

/// Sheet name used for exported tables.
pub const EXPORT_SHEET: &str = "Export";

/// Write a header row followed by data rows into a new workbook at `path`.
pub fn export_table(
    headers: &[String],
    rows: &[Vec<CellValue>],
    path: &Path,
) -> SheetcalcResult<()> {
    let mut grid_rows: Vec<Vec<CellValue>> = Vec::with_capacity(rows.len() + 1);
    grid_rows.push(headers.iter().map(|h| CellValue::Text(h.clone())).collect());
    grid_rows.extend(rows.iter().cloned());

    WorkbookGrid::from_sheets(vec![(EXPORT_SHEET, grid_rows)]).save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_table_writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.xlsx");

        let headers = vec!["A".to_string(), "B".to_string()];
        let rows = vec![
            vec![CellValue::from("N"), CellValue::Number(30.0)],
            vec![CellValue::from("S"), CellValue::Number(5.0)],
        ];
        export_table(&headers, &rows, &path).unwrap();

        let grid = WorkbookGrid::open(&path).unwrap();
        assert_eq!(grid.sheet_names(), vec![EXPORT_SHEET]);
        let read = grid.read_rows(EXPORT_SHEET).unwrap();
        assert_eq!(read[0], vec!["A", "B"]);
        assert_eq!(read[1], vec!["N", "30"]);
        assert_eq!(read[2], vec!["S", "5"]);
    }
}
