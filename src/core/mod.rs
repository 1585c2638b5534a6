//! Tabular calculation and template-merge engine

pub mod aggregator;
pub mod cell_parser;
pub mod materializer;
pub mod merger;
pub mod row_calculator;

pub use aggregator::{aggregate_by_group, aggregate_column};
pub use cell_parser::{parse_cell, parse_number};
pub use materializer::{describe_sheets, materialize, DEFAULT_COLUMN_SPAN};
pub use merger::TemplateMerger;
pub use row_calculator::{compute_row_wise, compute_row_wise_many, render_formula};
