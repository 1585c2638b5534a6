//! CLI command handlers

pub mod commands;

pub use commands::{
    aggregate, aggregation_spec, column, merge, row_formula_spec, rowwise, run, sheets,
    TemplateOutput,
};
