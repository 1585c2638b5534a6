//! Sheetcalc - spreadsheet calculation and template merge
//!
//! Reads a worksheet into typed, column-lettered rows and runs three kinds of
//! calculation over it, then writes results back into a template workbook.
//!
//! # Features
//!
//! - Group aggregation (sum, average, count) keyed by one column
//! - Whole-column statistics (sum, average, count, max, min)
//! - Row-wise formulas across source columns (add, subtract, multiply, divide, copy)
//! - Template merge by implicit or explicit cell addressing
//! - HTTP API over registered workbooks, plus a CLI and YAML job files
//!
//! # Example
//!
//! ```no_run
//! use sheetcalc::core::{compute_row_wise, materialize};
//! use sheetcalc::excel::WorkbookGrid;
//! use sheetcalc::types::{RowFormulaSpec, RowOperation};
//!
//! let grid = WorkbookGrid::open("data.xlsx")?;
//! let data = materialize(&grid, "Data")?;
//!
//! let spec = RowFormulaSpec {
//!     source_columns: vec!["I".into(), "K".into()],
//!     target_column: "L".into(),
//!     operation: RowOperation::Add,
//!     start_row: 10,
//!     end_row: None,
//! };
//! let result = compute_row_wise(&data, &spec)?;
//! println!("{} = {} over {} rows", result.target_column, result.formula, result.total_rows);
//! # Ok::<(), sheetcalc::error::SheetcalcError>(())
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod error;
pub mod excel;
pub mod job;
pub mod reference;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{SheetcalcError, SheetcalcResult};
pub use types::{
    AggregationResult, AggregationSpec, CellValue, MaterializedSheet, MergeTarget,
    RowFormulaResult, RowFormulaSpec,
};
