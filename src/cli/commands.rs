use crate::core::{
    aggregate_by_group, aggregate_column, compute_row_wise, describe_sheets, materialize,
    parse_cell, TemplateMerger,
};
use crate::error::{SheetcalcError, SheetcalcResult};
use crate::excel::{ensure_distinct_output, export_table, GridAccessor, WorkbookGrid};
use crate::job::Job;
use crate::types::{
    AggregationSpec, CellValue, ColumnOperation, GroupOperation, MergeTarget, RowFormulaSpec,
    RowOperation,
};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    // Round to 6 decimal places for display
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn format_cell(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(s) => format!("\"{}\"", s),
        CellValue::Empty => "(empty)".to_string(),
    }
}

/// Comma-separated values, each parsed like a grid cell. Every comma splits,
/// so thousands separators are not accepted here.
fn parse_values(raw: &str) -> Vec<CellValue> {
    raw.split(',').map(parse_cell).collect()
}

/// Resolve a template sheet, defaulting to the first sheet.
fn template_sheet(grid: &WorkbookGrid, sheet: Option<String>) -> SheetcalcResult<String> {
    match sheet {
        Some(name) => Ok(name),
        None => grid.sheet_names().into_iter().next().ok_or_else(|| {
            SheetcalcError::TargetNotFound("template has no sheets".to_string())
        }),
    }
}

/// Execute the sheets command - list sheets with their column span and row count
pub fn sheets(file: PathBuf) -> SheetcalcResult<()> {
    println!("{}", "📊 Sheetcalc - Sheets".bold().green());
    println!("   File: {}\n", file.display());

    let grid = WorkbookGrid::open(&file)?;
    let infos = describe_sheets(&grid);

    if infos.is_empty() {
        println!("{}", "⚠️  No readable sheets found".yellow());
        return Ok(());
    }

    for info in &infos {
        let span = match (info.columns.first(), info.columns.last()) {
            (Some(first), Some(last)) => format!("{}..{}", first, last),
            _ => "-".to_string(),
        };
        println!(
            "   {} {} rows, columns {}",
            info.name.bright_blue().bold(),
            info.row_count,
            span.cyan()
        );
    }
    println!();

    Ok(())
}

/// Execute the aggregate command - group rows and aggregate target columns
pub fn aggregate(
    file: PathBuf,
    sheet: String,
    spec: AggregationSpec,
    output: Option<PathBuf>,
) -> SheetcalcResult<()> {
    println!("{}", "📊 Sheetcalc - Group Aggregation".bold().green());
    println!("   File:  {}", file.display());
    println!("   Sheet: {}", sheet.bright_blue());
    println!(
        "   {} of {} grouped by {}\n",
        spec.operation.as_str().bright_yellow(),
        spec.target_columns.join(", "),
        spec.group_by_column
    );

    let grid = WorkbookGrid::open(&file)?;
    let data = materialize(&grid, &sheet)?;
    let result = aggregate_by_group(&data, &spec)?;

    println!("{}", "✅ Groups:".bold().green());
    for group in &result.groups {
        let key = if group.key.is_empty() {
            "(blank)".to_string()
        } else {
            group.key.clone()
        };
        let values: Vec<String> = group
            .values
            .iter()
            .map(|(col, v)| format!("{}={}", col, format_number(*v)))
            .collect();
        println!("   {} {}", key.bright_blue().bold(), values.join("  "));
    }

    let totals: Vec<String> = result
        .totals
        .iter()
        .map(|(col, v)| format!("{}={}", col, format_number(*v)))
        .collect();
    println!("\n   {} {}", "Totals (sum):".cyan(), totals.join("  ").bold());
    println!();

    if let Some(output) = output {
        let (headers, rows) = result.to_table();
        export_table(&headers, &rows, &output)?;
        println!("{}", "✅ Export Complete!".bold().green());
        println!("   Excel file: {}\n", output.display());
    }

    Ok(())
}

/// Execute the column command - whole-column statistic
pub fn column(
    file: PathBuf,
    sheet: String,
    column: String,
    operation: ColumnOperation,
    start_row: Option<i64>,
) -> SheetcalcResult<()> {
    println!("{}", "📊 Sheetcalc - Column Statistic".bold().green());
    println!("   File:  {}", file.display());
    println!("   Sheet: {}\n", sheet.bright_blue());

    let grid = WorkbookGrid::open(&file)?;
    let data = materialize(&grid, &sheet)?;
    let stat = aggregate_column(&data, &column, operation, start_row)?;

    println!(
        "   {}({}) = {}",
        stat.operation.as_str().bright_yellow(),
        stat.column.bright_blue().bold(),
        format_number(stat.result).bold().green()
    );
    println!(
        "   {} numeric values in {} rows from row {} ({} rows in sheet)\n",
        stat.count, stat.processed_rows, stat.start_row, stat.data_length
    );

    Ok(())
}

/// Where row-wise results should be merged, if anywhere.
pub struct TemplateOutput {
    pub template: PathBuf,
    pub sheet: Option<String>,
    pub output: PathBuf,
}

/// Execute the rowwise command - apply one formula per row
pub fn rowwise(
    file: PathBuf,
    sheet: String,
    spec: RowFormulaSpec,
    template: Option<TemplateOutput>,
    verbose: bool,
) -> SheetcalcResult<()> {
    println!("{}", "📊 Sheetcalc - Row-wise Formula".bold().green());
    println!("   File:  {}", file.display());
    println!("   Sheet: {}\n", sheet.bright_blue());

    let grid = WorkbookGrid::open(&file)?;
    let data = materialize(&grid, &sheet)?;
    let result = compute_row_wise(&data, &spec)?;

    println!(
        "   {} = {}  (rows {}..{} of {})\n",
        result.target_column.bright_blue().bold(),
        result.formula.bright_yellow(),
        result.start_row,
        result.end_row,
        result.sheet_rows
    );

    for row in &result.results {
        let marker = if row.division_skipped { " ⚠️" } else { "" };
        if verbose {
            let inputs: Vec<String> = row
                .inputs
                .iter()
                .map(|(col, v)| format!("{}={}", col, format_cell(v)))
                .collect();
            println!(
                "   {:>6}  {}  [{}]{}",
                row.row_number,
                format_cell(&row.computed_value).bold(),
                inputs.join(", "),
                marker
            );
        } else {
            println!(
                "   {:>6}  {}{}",
                row.row_number,
                format_cell(&row.computed_value).bold(),
                marker
            );
        }
    }

    if let Some(summary) = &result.summary {
        println!(
            "\n   {} total={} average={} min={} max={} ({} values)",
            "Summary:".cyan(),
            format_number(summary.total),
            format_number(summary.average),
            format_number(summary.min),
            format_number(summary.max),
            summary.count
        );
    }
    if result.skipped_divisions > 0 {
        println!(
            "{}",
            format!(
                "   ⚠️  {} row(s) skipped a divide-by-zero step",
                result.skipped_divisions
            )
            .yellow()
        );
    }
    println!();

    if let Some(target) = template {
        ensure_distinct_output(&target.template, &target.output)?;
        let grid = WorkbookGrid::open(&target.template)?;
        let sheet_name = template_sheet(&grid, target.sheet)?;

        let mut merger = TemplateMerger::new(grid);
        let report =
            merger.merge_multi(&sheet_name, &[MergeTarget::from_row_result(&result)])?;
        merger.save(&target.output)?;

        println!("{}", "✅ Template Merge Complete!".bold().green());
        println!(
            "   {} cells written to {}",
            report.cells_written,
            sheet_name.bright_blue()
        );
        println!("   Excel file: {}\n", target.output.display());
    }

    Ok(())
}

/// Execute the merge command - write a value list into consecutive rows of a template
pub fn merge(
    template: PathBuf,
    sheet: Option<String>,
    column: String,
    start_row: u32,
    values: String,
    output: PathBuf,
) -> SheetcalcResult<()> {
    println!("{}", "📊 Sheetcalc - Template Merge".bold().green());
    println!("   Template: {}", template.display());
    println!("   Output:   {}\n", output.display());

    ensure_distinct_output(&template, &output)?;
    let values = parse_values(&values);
    let grid = WorkbookGrid::open(&template)?;
    let sheet_name = template_sheet(&grid, sheet)?;

    let mut merger = TemplateMerger::new(grid);
    let report = merger.merge_single(&sheet_name, &column, start_row, &values)?;
    merger.save(&output)?;

    println!("{}", "✅ Merge Complete!".bold().green());
    println!(
        "   {} cells written to {}!{}{}..",
        report.cells_written,
        sheet_name.bright_blue(),
        column.to_uppercase(),
        start_row
    );
    println!("   Excel file: {}\n", output.display());

    Ok(())
}

/// Execute the run command - row-wise job from a YAML file
pub fn run(job_file: PathBuf) -> SheetcalcResult<()> {
    println!("{}", "📊 Sheetcalc - Job".bold().green());
    println!("   Job: {}\n", job_file.display());

    let job = Job::from_file(Path::new(&job_file))?;
    println!("   Source:   {} [{}]", job.source.display(), job.sheet.bright_blue());
    println!("   Template: {}", job.template.display());
    println!("   {} calculation(s)\n", job.calculations.len());

    let report = job.run()?;

    for result in &report.results {
        println!(
            "   {} = {}  ({} rows)",
            result.target_column.bright_blue().bold(),
            result.formula.bright_yellow(),
            result.total_rows
        );
    }
    println!();
    println!("{}", "✅ Job Complete!".bold().green());
    println!(
        "   {} cells written to {}",
        report.merge.cells_written,
        report.merge.sheet.bright_blue()
    );
    println!("   Excel file: {}\n", report.output.display());

    Ok(())
}

/// Build an aggregation spec from CLI arguments.
pub fn aggregation_spec(
    group_by: String,
    targets: Vec<String>,
    operation: GroupOperation,
    start_row: Option<i64>,
) -> AggregationSpec {
    AggregationSpec {
        group_by_column: group_by,
        target_columns: targets,
        operation,
        start_row,
    }
}

/// Build a row formula spec from CLI arguments.
pub fn row_formula_spec(
    sources: Vec<String>,
    target: String,
    operation: RowOperation,
    start_row: i64,
    end_row: Option<i64>,
) -> RowFormulaSpec {
    RowFormulaSpec {
        source_columns: sources,
        target_column: target,
        operation,
        start_row,
        end_row,
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
