//! Spreadsheet codec boundary
//!
//! - Column letters and `L11`-style cell addresses
//! - `GridAccessor`: read rows, column bound, cell writes, save
//! - `WorkbookGrid`: calamine-backed reader, rust_xlsxwriter-backed writer
//! - Single-sheet table export

pub mod columns;
mod export;
mod grid;

pub use columns::{column_to_number, normalize_column, number_to_column, CellAddress};
pub use export::{export_table, EXPORT_SHEET};
pub use grid::{
    ensure_distinct_output, excel_serial_to_iso, GridAccessor, GridSheet, GridValue,
    WorkbookGrid,
};
