//! Engine integration tests
//!
//! Every scenario goes through real .xlsx files on disk: written with
//! rust_xlsxwriter, read back with calamine.

use calamine::{open_workbook_auto, Reader};
use pretty_assertions::assert_eq;
use rust_xlsxwriter::{Formula, Workbook};
use sheetcalc::core::{
    aggregate_by_group, aggregate_column, compute_row_wise, materialize, parse_cell,
    TemplateMerger,
};
use sheetcalc::excel::{
    column_to_number, number_to_column, CellAddress, GridAccessor, GridValue, WorkbookGrid,
};
use sheetcalc::types::{
    AggregationSpec, CellValue, ColumnOperation, GroupOperation, MergeEntry, MergeTarget,
    RowFormulaSpec, RowOperation,
};
use sheetcalc::SheetcalcError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_workbook(dir: &TempDir, name: &str, sheet: &str, rows: Vec<Vec<CellValue>>) -> PathBuf {
    let path = dir.path().join(name);
    WorkbookGrid::from_sheets(vec![(sheet, rows)])
        .save(&path)
        .unwrap();
    path
}

fn cell(path: &Path, sheet: &str, address: &str) -> Option<GridValue> {
    let grid = WorkbookGrid::open(path).unwrap();
    let address: CellAddress = address.parse().unwrap();
    grid.cell(sheet, &address).cloned()
}

fn num(n: f64) -> CellValue {
    CellValue::Number(n)
}

fn text(s: &str) -> CellValue {
    CellValue::from(s)
}

/// Template with a header in A1..M1 so the used-column bound reaches M.
fn form_template(dir: &TempDir) -> PathBuf {
    let header: Vec<CellValue> = (1..=13)
        .map(|n| text(&format!("H{}", number_to_column(n))))
        .collect();
    let mut rows = vec![header];
    for r in 2..=14 {
        rows.push(vec![text(&format!("row{}", r))]);
    }
    // Neighbours of the L11..L13 block
    rows[9].resize(13, CellValue::Empty);
    rows[9][11] = text("above");
    rows[10].resize(13, CellValue::Empty);
    rows[10][10] = text("left");
    rows[10][12] = text("right");
    rows[13].resize(13, CellValue::Empty);
    rows[13][11] = text("below");
    write_workbook(dir, "form.xlsx", "Form", rows)
}

// ═══════════════════════════════════════════════════════════════════════════
// COLUMN LETTERS AND CELL PARSING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_column_letters_round_trip_to_zz() {
    for n in 1..=702 {
        let letters = number_to_column(n);
        assert_eq!(column_to_number(&letters).unwrap(), n, "column {}", letters);
    }
    assert_eq!(number_to_column(702), "ZZ");
    assert_eq!(number_to_column(703), "AAA");
}

#[test]
fn test_cell_parsing_strips_thousands_separators() {
    assert_eq!(parse_cell("1,234.5"), num(1234.5));
    assert_eq!(parse_cell(""), CellValue::Empty);
    assert_eq!(parse_cell("abc"), text("abc"));
}

// ═══════════════════════════════════════════════════════════════════════════
// MATERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_materialized_rows_padded_to_used_bound() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(
        &dir,
        "wide.xlsx",
        "Data",
        vec![
            vec![text("a"), text("b"), text("c"), text("d"), text("e")],
            vec![num(1.0), num(2.0), num(3.0), num(4.0), num(5.0)],
            vec![num(7.0), text("1,000")],
        ],
    );

    let grid = WorkbookGrid::open(&path).unwrap();
    let sheet = materialize(&grid, "Data").unwrap();

    assert_eq!(sheet.columns, vec!["A", "B", "C", "D", "E"]);
    assert_eq!(sheet.len(), 3);
    let row = &sheet.rows[2];
    assert_eq!(row.len(), 5);
    assert_eq!(row["A"], num(7.0));
    assert_eq!(row["B"], num(1000.0));
    for col in ["C", "D", "E"] {
        assert_eq!(row[col], CellValue::Empty, "column {}", col);
    }
}

#[test]
fn test_materialize_unknown_sheet() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(&dir, "one.xlsx", "Data", vec![vec![num(1.0)]]);
    let grid = WorkbookGrid::open(&path).unwrap();

    let result = materialize(&grid, "Missing");
    assert!(matches!(result, Err(SheetcalcError::NotFound(_))));
}

// ═══════════════════════════════════════════════════════════════════════════
// AGGREGATION
// ═══════════════════════════════════════════════════════════════════════════

fn sales(dir: &TempDir) -> PathBuf {
    write_workbook(
        dir,
        "sales.xlsx",
        "Data",
        vec![
            vec![text("Region"), text("Sales")],
            vec![text("N"), num(10.0)],
            vec![text("N"), num(20.0)],
            vec![text("S"), num(5.0)],
        ],
    )
}

#[test]
fn test_group_sum_scenario() {
    let dir = TempDir::new().unwrap();
    let grid = WorkbookGrid::open(sales(&dir)).unwrap();
    let sheet = materialize(&grid, "Data").unwrap();

    let spec = AggregationSpec {
        group_by_column: "A".into(),
        target_columns: vec!["B".into()],
        operation: GroupOperation::Sum,
        start_row: Some(1),
    };
    let result = aggregate_by_group(&sheet, &spec).unwrap();

    let keys: Vec<&str> = result.groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["N", "S"]);
    assert_eq!(result.group("N").unwrap().values["B"], 30.0);
    assert_eq!(result.group("S").unwrap().values["B"], 5.0);
    assert_eq!(result.totals["B"], 35.0);
}

#[test]
fn test_header_row_forms_its_own_group_without_start_row() {
    let dir = TempDir::new().unwrap();
    let grid = WorkbookGrid::open(sales(&dir)).unwrap();
    let sheet = materialize(&grid, "Data").unwrap();

    let spec = AggregationSpec {
        group_by_column: "A".into(),
        target_columns: vec!["B".into()],
        operation: GroupOperation::Count,
        start_row: None,
    };
    let result = aggregate_by_group(&sheet, &spec).unwrap();

    // "Sales" is text, so the header group counts nothing.
    assert_eq!(result.group("Region").unwrap().values["B"], 0.0);
    assert_eq!(result.group("N").unwrap().values["B"], 2.0);
}

#[test]
fn test_aggregation_is_deterministic_and_average_matches() {
    let dir = TempDir::new().unwrap();
    let grid = WorkbookGrid::open(sales(&dir)).unwrap();
    let sheet = materialize(&grid, "Data").unwrap();

    let sum_spec = AggregationSpec {
        group_by_column: "A".into(),
        target_columns: vec!["B".into()],
        operation: GroupOperation::Sum,
        start_row: Some(1),
    };
    let first = aggregate_by_group(&sheet, &sum_spec).unwrap();
    let second = aggregate_by_group(&sheet, &sum_spec).unwrap();
    assert_eq!(first, second);

    let avg = aggregate_by_group(
        &sheet,
        &AggregationSpec {
            operation: GroupOperation::Average,
            ..sum_spec.clone()
        },
    )
    .unwrap();
    let count = aggregate_by_group(
        &sheet,
        &AggregationSpec {
            operation: GroupOperation::Count,
            ..sum_spec
        },
    )
    .unwrap();

    for group in &first.groups {
        let n = count.group(&group.key).unwrap().values["B"];
        let mean = avg.group(&group.key).unwrap().values["B"];
        assert_eq!(mean, group.values["B"] / n);
    }
}

#[test]
fn test_column_statistics() {
    let dir = TempDir::new().unwrap();
    let grid = WorkbookGrid::open(sales(&dir)).unwrap();
    let sheet = materialize(&grid, "Data").unwrap();

    let max = aggregate_column(&sheet, "b", ColumnOperation::Max, None).unwrap();
    assert_eq!(max.result, 20.0);
    assert_eq!(max.count, 3);
    assert_eq!(max.data_length, 4);

    let min = aggregate_column(&sheet, "B", ColumnOperation::Min, Some(2)).unwrap();
    assert_eq!(min.result, 5.0);
    assert_eq!(min.processed_rows, 2);

    let none = aggregate_column(&sheet, "A", ColumnOperation::Sum, None);
    assert!(matches!(none, Err(SheetcalcError::NoData(_))));
}

// ═══════════════════════════════════════════════════════════════════════════
// ROW-WISE FORMULAS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_divide_by_zero_keeps_first_operand() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(
        &dir,
        "ratio.xlsx",
        "Data",
        vec![vec![num(10.0), num(0.0)], vec![num(9.0), num(3.0)]],
    );
    let grid = WorkbookGrid::open(&path).unwrap();
    let sheet = materialize(&grid, "Data").unwrap();

    let spec = RowFormulaSpec {
        source_columns: vec!["A".into(), "B".into()],
        target_column: "C".into(),
        operation: RowOperation::Divide,
        start_row: 0,
        end_row: None,
    };
    let result = compute_row_wise(&sheet, &spec).unwrap();

    assert_eq!(result.results[0].computed_value, num(10.0));
    assert!(result.results[0].division_skipped);
    assert_eq!(result.results[1].computed_value, num(3.0));
    assert_eq!(result.skipped_divisions, 1);
}

fn ledger(dir: &TempDir) -> PathBuf {
    // Rows 0..=9 are filler; rows 10..=12 carry I and K.
    let mut rows: Vec<Vec<CellValue>> = (0..10).map(|r| vec![text(&format!("r{}", r))]).collect();
    for (i, k) in [(1.0, 4.0), (2.0, 5.0), (3.0, 6.0)] {
        let mut row = vec![CellValue::Empty; 11];
        row[0] = text("item");
        row[8] = num(i);
        row[10] = num(k);
        rows.push(row);
    }
    write_workbook(dir, "ledger.xlsx", "Data", rows)
}

#[test]
fn test_rowwise_add_scenario() {
    let dir = TempDir::new().unwrap();
    let grid = WorkbookGrid::open(ledger(&dir)).unwrap();
    let sheet = materialize(&grid, "Data").unwrap();

    let spec = RowFormulaSpec {
        source_columns: vec!["I".into(), "K".into()],
        target_column: "L".into(),
        operation: RowOperation::Add,
        start_row: 10,
        end_row: None,
    };
    let result = compute_row_wise(&sheet, &spec).unwrap();

    assert_eq!(result.formula, "I + K");
    let rows: Vec<(usize, CellValue)> = result
        .results
        .iter()
        .map(|r| (r.row_number, r.computed_value.clone()))
        .collect();
    assert_eq!(
        rows,
        vec![(11, num(7.0)), (12, num(9.0)), (13, num(11.0))]
    );
    assert_eq!(result.total_rows, 3);
}

#[test]
fn test_rowwise_start_row_past_end() {
    let dir = TempDir::new().unwrap();
    let grid = WorkbookGrid::open(ledger(&dir)).unwrap();
    let sheet = materialize(&grid, "Data").unwrap();

    let spec = RowFormulaSpec {
        source_columns: vec!["I".into()],
        target_column: "L".into(),
        operation: RowOperation::Copy,
        start_row: 13,
        end_row: None,
    };
    let result = compute_row_wise(&sheet, &spec);
    assert!(matches!(result, Err(SheetcalcError::InvalidRange(_))));
}

// ═══════════════════════════════════════════════════════════════════════════
// TEMPLATE MERGE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_merge_single_writes_block_only() {
    let dir = TempDir::new().unwrap();
    let template = form_template(&dir);
    let output = dir.path().join("filled.xlsx");

    let mut merger = TemplateMerger::new(WorkbookGrid::open(&template).unwrap());
    let values = vec![num(7.0), num(9.0), num(11.0)];
    let report = merger.merge_single("Form", "L", 11, &values).unwrap();
    merger.save(&output).unwrap();

    assert_eq!(report.cells_written, 3);
    assert_eq!(cell(&output, "Form", "L11"), Some(GridValue::Number(7.0)));
    assert_eq!(cell(&output, "Form", "L12"), Some(GridValue::Number(9.0)));
    assert_eq!(cell(&output, "Form", "L13"), Some(GridValue::Number(11.0)));

    assert_eq!(cell(&output, "Form", "L10"), Some(GridValue::Text("above".into())));
    assert_eq!(cell(&output, "Form", "K11"), Some(GridValue::Text("left".into())));
    assert_eq!(cell(&output, "Form", "M11"), Some(GridValue::Text("right".into())));
    assert_eq!(cell(&output, "Form", "L14"), Some(GridValue::Text("below".into())));
    assert_eq!(cell(&output, "Form", "L1"), Some(GridValue::Text("HL".into())));
    assert_eq!(cell(&output, "Form", "A12"), Some(GridValue::Text("row12".into())));
}

#[test]
fn test_explicit_merge_missing_row_leaves_template_alone() {
    let dir = TempDir::new().unwrap();
    let template = form_template(&dir);
    let before = fs::read(&template).unwrap();

    let mut merger = TemplateMerger::new(WorkbookGrid::open(&template).unwrap());
    let targets = vec![MergeTarget::Explicit {
        target_column: "L".into(),
        entries: vec![
            MergeEntry {
                value: num(1.0),
                target_row: Some(11),
            },
            MergeEntry {
                value: num(2.0),
                target_row: None,
            },
        ],
    }];

    let result = merger.merge_multi("Form", &targets);
    assert!(matches!(
        result,
        Err(SheetcalcError::MissingAddress { index: 1, .. })
    ));
    assert_eq!(merger.cells_written(), 0);
    assert_eq!(fs::read(&template).unwrap(), before);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_rowwise_results_merge_back_on_their_rows() {
    let dir = TempDir::new().unwrap();
    let grid = WorkbookGrid::open(ledger(&dir)).unwrap();
    let sheet = materialize(&grid, "Data").unwrap();
    let result = compute_row_wise(
        &sheet,
        &RowFormulaSpec {
            source_columns: vec!["I".into(), "K".into()],
            target_column: "L".into(),
            operation: RowOperation::Multiply,
            start_row: 10,
            end_row: Some(11),
        },
    )
    .unwrap();

    let template = form_template(&dir);
    let output = dir.path().join("products.xlsx");
    let mut merger = TemplateMerger::new(WorkbookGrid::open(&template).unwrap());
    merger
        .merge_multi("Form", &[MergeTarget::from_row_result(&result)])
        .unwrap();
    merger.save(&output).unwrap();

    assert_eq!(cell(&output, "Form", "L11"), Some(GridValue::Number(4.0)));
    assert_eq!(cell(&output, "Form", "L12"), Some(GridValue::Number(10.0)));
    assert_eq!(cell(&output, "Form", "L13"), None);
}

#[test]
fn test_merge_into_columns_past_used_area() {
    let dir = TempDir::new().unwrap();
    let template = write_workbook(&dir, "title.xlsx", "Form", vec![vec![text("Title")]]);
    let output = dir.path().join("filled.xlsx");

    let mut merger = TemplateMerger::new(WorkbookGrid::open(&template).unwrap());
    merger.merge_single("Form", "B", 2, &[num(1.0)]).unwrap();
    merger.merge_single("Form", "Z", 3, &[num(2.0)]).unwrap();
    merger.save(&output).unwrap();

    assert_eq!(cell(&output, "Form", "A1"), Some(GridValue::Text("Title".into())));
    assert_eq!(cell(&output, "Form", "B2"), Some(GridValue::Number(1.0)));
    assert_eq!(cell(&output, "Form", "Z3"), Some(GridValue::Number(2.0)));

    let mut merger = TemplateMerger::new(WorkbookGrid::open(&template).unwrap());
    let result = merger.merge_single("Nope", "A", 2, &[num(1.0)]);
    assert!(matches!(result, Err(SheetcalcError::TargetNotFound(_))));
}

#[test]
fn test_merge_keeps_template_formulas() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("totals.xlsx");
    let output = dir.path().join("filled.xlsx");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Form").unwrap();
    worksheet.write_string(9, 11, "Amount").unwrap();
    worksheet.write_string(13, 10, "Total").unwrap();
    worksheet
        .write_formula(13, 11, Formula::new("=SUM(L11:L13)").set_result("0"))
        .unwrap();
    workbook.save(&template).unwrap();

    let mut merger = TemplateMerger::new(WorkbookGrid::open(&template).unwrap());
    merger
        .merge_single("Form", "L", 11, &[num(7.0), num(9.0), num(11.0)])
        .unwrap();
    merger.save(&output).unwrap();

    assert_eq!(cell(&output, "Form", "L11"), Some(GridValue::Number(7.0)));
    assert_eq!(cell(&output, "Form", "L13"), Some(GridValue::Number(11.0)));
    assert_eq!(cell(&output, "Form", "K14"), Some(GridValue::Text("Total".into())));

    let mut saved = open_workbook_auto(&output).unwrap();
    let formulas = saved.worksheet_formula("Form").unwrap();
    let (start_row, start_col) = formulas.start().unwrap();
    let total = formulas.get(((13 - start_row) as usize, (11 - start_col) as usize));
    assert_eq!(total.map(String::as_str), Some("SUM(L11:L13)"));
}
