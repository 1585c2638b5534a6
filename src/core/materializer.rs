//! Sheet materialization: raw text grid → typed, column-padded rows

use crate::core::cell_parser::parse_cell;
use crate::error::{SheetcalcError, SheetcalcResult};
use crate::excel::{column_to_number, columns::column_span, GridAccessor};
use crate::types::{CellValue, MaterializedRow, MaterializedSheet, SheetInfo};
use tracing::debug;

/// Columns used when a sheet's used-column bound is unknown or zero (A..AZ).
pub const DEFAULT_COLUMN_SPAN: u32 = 52;

/// Column set for a sheet with the given used-column bound.
pub fn column_set(bound: Option<&str>) -> Vec<String> {
    let span = bound
        .and_then(|b| column_to_number(b).ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_COLUMN_SPAN);
    column_span(span)
}

/// Materialize every physical row of `sheet`; no header row is skipped.
pub fn materialize<G>(grid: &G, sheet: &str) -> SheetcalcResult<MaterializedSheet>
where
    G: GridAccessor + ?Sized,
{
    if !grid.has_sheet(sheet) {
        return Err(SheetcalcError::NotFound(format!("sheet '{}'", sheet)));
    }

    let raw_rows = grid
        .read_rows(sheet)
        .map_err(|e| SheetcalcError::ReadFailure {
            sheet: sheet.to_string(),
            message: e.to_string(),
        })?;
    let bound = grid.used_column_bound(sheet).ok().flatten();
    let columns = column_set(bound.as_deref());

    let rows = raw_rows
        .iter()
        .map(|raw| {
            columns
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    let value = raw.get(idx).map_or(CellValue::Empty, |cell| parse_cell(cell));
                    (col.clone(), value)
                })
                .collect::<MaterializedRow>()
        })
        .collect::<Vec<_>>();

    debug!(
        sheet,
        rows = rows.len(),
        columns = columns.len(),
        "sheet materialized"
    );

    Ok(MaterializedSheet {
        name: sheet.to_string(),
        columns,
        rows,
    })
}

/// Name, column set, and physical row count of every sheet.
///
/// Sheets that cannot be read are left out of the listing.
pub fn describe_sheets<G>(grid: &G) -> Vec<SheetInfo>
where
    G: GridAccessor + ?Sized,
{
    grid.sheet_names()
        .into_iter()
        .filter_map(|name| {
            let rows = grid.read_rows(&name).ok()?;
            let bound = grid.used_column_bound(&name).ok().flatten();
            Some(SheetInfo {
                columns: column_set(bound.as_deref()),
                row_count: rows.len(),
                name,
            })
        })
        .collect()
}
