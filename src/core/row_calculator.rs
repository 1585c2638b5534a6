//! Row-wise formulas across source columns

use crate::error::{SheetcalcError, SheetcalcResult};
use crate::excel::normalize_column;
use crate::types::{
    CalculationSummary, CellValue, MaterializedSheet, RowFormulaResult, RowFormulaSpec,
    RowOperation, RowResult,
};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Human-readable formula, e.g. `I + K + M` or `Copy from I`.
pub fn render_formula(columns: &[String], operation: RowOperation) -> String {
    match operation.symbol() {
        Some(symbol) => columns.join(symbol),
        None => format!(
            "Copy from {}",
            columns.first().map(String::as_str).unwrap_or_default()
        ),
    }
}

/// Resolve 0-based inclusive bounds. An omitted, inverted, or out-of-range end
/// row falls back to the last physical row.
fn resolve_rows(spec: &RowFormulaSpec, row_count: usize) -> SheetcalcResult<(usize, usize)> {
    let start = spec.start_row;
    if start < 0 || start as u64 >= row_count as u64 {
        return Err(SheetcalcError::InvalidRange(format!(
            "start row {} is outside 0..{} (sheet has {} rows)",
            start, row_count, row_count
        )));
    }
    let start = start as usize;
    let last = row_count - 1;

    let end = match spec.end_row {
        Some(end) if end >= start as i64 && (end as u64) <= last as u64 => end as usize,
        _ => last,
    };

    Ok((start, end))
}

/// Left fold of `operands` under an arithmetic operator.
///
/// Returns the value and whether any divide step was skipped for a zero
/// right operand.
fn fold_operands(operands: &[f64], operation: RowOperation) -> (f64, bool) {
    let Some((&first, rest)) = operands.split_first() else {
        return (0.0, false);
    };

    let mut skipped = false;
    let value = rest.iter().fold(first, |acc, &n| match operation {
        RowOperation::Add => acc + n,
        RowOperation::Subtract => acc - n,
        RowOperation::Multiply => acc * n,
        RowOperation::Divide if n == 0.0 => {
            skipped = true;
            acc
        }
        RowOperation::Divide => acc / n,
        RowOperation::Copy => acc,
    });

    (value, skipped)
}

fn summarize(results: &[RowResult]) -> Option<CalculationSummary> {
    let numbers: Vec<f64> = results
        .iter()
        .filter_map(|r| r.computed_value.as_number())
        .collect();
    let first = *numbers.first()?;

    let total: f64 = numbers.iter().sum();
    Some(CalculationSummary {
        total,
        average: total / numbers.len() as f64,
        min: numbers.iter().copied().fold(first, f64::min),
        max: numbers.iter().copied().fold(first, f64::max),
        count: numbers.len(),
    })
}

/// Apply one formula to every row in the resolved range.
pub fn compute_row_wise(
    sheet: &MaterializedSheet,
    spec: &RowFormulaSpec,
) -> SheetcalcResult<RowFormulaResult> {
    if spec.source_columns.is_empty() {
        return Err(SheetcalcError::InvalidRequest(
            "at least one source column is required".to_string(),
        ));
    }
    let sources = spec
        .source_columns
        .iter()
        .map(|c| normalize_column(c))
        .collect::<SheetcalcResult<Vec<_>>>()?;
    let target = normalize_column(&spec.target_column)?;
    let (start, end) = resolve_rows(spec, sheet.len())?;

    let mut results = Vec::with_capacity(end - start + 1);
    let mut skipped_divisions = 0;

    for (index, row) in sheet.rows[start..=end].iter().enumerate() {
        let row_number = start + index + 1;
        let mut inputs = IndexMap::new();

        let (computed_value, division_skipped) = match spec.operation {
            RowOperation::Copy => {
                let column = &sources[0];
                let value = row.get(column).cloned().unwrap_or_default();
                inputs.insert(column.clone(), value.clone());
                (value, false)
            }
            operation => {
                let operands: Vec<f64> = sources
                    .iter()
                    .map(|column| {
                        let n = row.get(column).and_then(CellValue::as_number).unwrap_or(0.0);
                        inputs.insert(column.clone(), CellValue::Number(n));
                        n
                    })
                    .collect();
                let (value, skipped) = fold_operands(&operands, operation);
                if !value.is_finite() {
                    return Err(SheetcalcError::InvalidRange(format!(
                        "row {}: {} does not give a finite number",
                        row_number,
                        render_formula(&sources, operation)
                    )));
                }
                (CellValue::Number(value), skipped)
            }
        };

        if division_skipped {
            skipped_divisions += 1;
            warn!(row = row_number, column = %target, "divide by zero skipped");
        }

        results.push(RowResult {
            row_number,
            computed_value,
            inputs,
            division_skipped,
        });
    }

    let formula = render_formula(&sources, spec.operation);
    debug!(%formula, rows = results.len(), skipped_divisions, "row-wise formula computed");

    Ok(RowFormulaResult {
        formula,
        source_columns: sources,
        target_column: target,
        operation: spec.operation,
        start_row: start + 1,
        end_row: end + 1,
        total_rows: results.len(),
        sheet_rows: sheet.len(),
        skipped_divisions,
        summary: summarize(&results),
        results,
    })
}

/// Evaluate several formulas over one materialization. Fails on the first
/// invalid spec.
pub fn compute_row_wise_many(
    sheet: &MaterializedSheet,
    specs: &[RowFormulaSpec],
) -> SheetcalcResult<Vec<RowFormulaResult>> {
    if specs.is_empty() {
        return Err(SheetcalcError::InvalidRequest(
            "at least one calculation is required".to_string(),
        ));
    }
    specs.iter().map(|spec| compute_row_wise(sheet, spec)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::columns::column_span;
    use crate::types::MaterializedRow;

    /// Sheet over columns A..M where `cells[r]` fills row `r`.
    fn sheet(cells: Vec<Vec<(&str, CellValue)>>) -> MaterializedSheet {
        let columns = column_span(13);
        let rows = cells
            .into_iter()
            .map(|cells| {
                let mut row: MaterializedRow =
                    columns.iter().map(|c| (c.clone(), CellValue::Empty)).collect();
                for (col, value) in cells {
                    row.insert(col.to_string(), value);
                }
                row
            })
            .collect();
        MaterializedSheet {
            name: "Data".to_string(),
            columns,
            rows,
        }
    }

    fn spec(sources: &[&str], operation: RowOperation, start: i64, end: Option<i64>) -> RowFormulaSpec {
        RowFormulaSpec {
            source_columns: sources.iter().map(|s| s.to_string()).collect(),
            target_column: "L".to_string(),
            operation,
            start_row: start,
            end_row: end,
        }
    }

    fn invoice() -> MaterializedSheet {
        let mut rows: Vec<Vec<(&str, CellValue)>> = (0..10).map(|_| Vec::new()).collect();
        rows[0] = vec![("I", "Qty".into()), ("K", "Price".into())];
        rows.push(vec![("I", 1.0.into()), ("K", 4.0.into())]);
        rows.push(vec![("I", 2.0.into()), ("K", 5.0.into())]);
        rows.push(vec![("I", 3.0.into()), ("K", 6.0.into())]);
        sheet(rows)
    }

    #[test]
    fn test_add_scenario() {
        let result = compute_row_wise(&invoice(), &spec(&["I", "K"], RowOperation::Add, 10, None))
            .unwrap();

        assert_eq!(result.formula, "I + K");
        assert_eq!(result.start_row, 11);
        assert_eq!(result.end_row, 13);
        assert_eq!(result.total_rows, 3);
        assert_eq!(result.sheet_rows, 13);

        let computed: Vec<(usize, CellValue)> = result
            .results
            .iter()
            .map(|r| (r.row_number, r.computed_value.clone()))
            .collect();
        assert_eq!(
            computed,
            vec![(11, 7.0.into()), (12, 9.0.into()), (13, 11.0.into())]
        );
        assert_eq!(result.results[0].inputs["I"], CellValue::Number(1.0));
        assert_eq!(result.results[0].inputs["K"], CellValue::Number(4.0));

        let summary = result.summary.unwrap();
        assert_eq!(summary.total, 27.0);
        assert_eq!(summary.average, 9.0);
        assert_eq!(summary.min, 7.0);
        assert_eq!(summary.max, 11.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_divide_by_zero_is_skipped() {
        let data = sheet(vec![
            vec![("A", 10.0.into()), ("B", 0.0.into())],
            vec![("A", 10.0.into()), ("B", 4.0.into())],
        ]);
        let result = compute_row_wise(&data, &spec(&["A", "B"], RowOperation::Divide, 0, None))
            .unwrap();

        assert_eq!(result.results[0].computed_value, CellValue::Number(10.0));
        assert!(result.results[0].division_skipped);
        assert_eq!(result.results[1].computed_value, CellValue::Number(2.5));
        assert!(!result.results[1].division_skipped);
        assert_eq!(result.skipped_divisions, 1);
        assert_eq!(result.formula, "A ÷ B");
    }

    #[test]
    fn test_overflow_names_the_row() {
        let data = sheet(vec![
            vec![("A", 2.0.into()), ("B", 3.0.into())],
            vec![("A", 1e200.into()), ("B", 1e200.into())],
        ]);
        let err = compute_row_wise(&data, &spec(&["A", "B"], RowOperation::Multiply, 0, None))
            .unwrap_err();
        match err {
            SheetcalcError::InvalidRange(message) => {
                assert!(message.contains("row 2"), "{}", message);
                assert!(message.contains("A × B"), "{}", message);
            }
            other => panic!("expected InvalidRange, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_and_text_operands_default_to_zero() {
        let data = sheet(vec![vec![("A", 5.0.into()), ("B", "n/a".into())]]);
        let sub = compute_row_wise(&data, &spec(&["A", "B", "C"], RowOperation::Subtract, 0, None))
            .unwrap();
        assert_eq!(sub.results[0].computed_value, CellValue::Number(5.0));
        assert_eq!(sub.results[0].inputs["B"], CellValue::Number(0.0));
        assert_eq!(sub.results[0].inputs["C"], CellValue::Number(0.0));

        let mul = compute_row_wise(&data, &spec(&["A", "B"], RowOperation::Multiply, 0, None))
            .unwrap();
        assert_eq!(mul.results[0].computed_value, CellValue::Number(0.0));
        assert_eq!(mul.formula, "A × B");
    }

    #[test]
    fn test_copy_preserves_type_and_uses_first_source() {
        let data = sheet(vec![
            vec![("A", "hello".into()), ("B", 1.0.into())],
            vec![("A", 3.5.into())],
            vec![],
        ]);
        let result = compute_row_wise(&data, &spec(&["A", "B"], RowOperation::Copy, 0, None))
            .unwrap();

        assert_eq!(result.formula, "Copy from A");
        assert_eq!(result.results[0].computed_value, CellValue::Text("hello".into()));
        assert_eq!(result.results[1].computed_value, CellValue::Number(3.5));
        assert_eq!(result.results[2].computed_value, CellValue::Empty);
        assert_eq!(result.results[0].inputs.len(), 1);
        assert_eq!(result.summary.unwrap().count, 1);
    }

    #[test]
    fn test_end_row_resolution() {
        let data = invoice();
        let explicit = compute_row_wise(&data, &spec(&["I"], RowOperation::Add, 10, Some(11)))
            .unwrap();
        assert_eq!(explicit.end_row, 12);
        assert_eq!(explicit.total_rows, 2);

        for end in [Some(5), Some(99), None] {
            let result = compute_row_wise(&data, &spec(&["I"], RowOperation::Add, 10, end)).unwrap();
            assert_eq!(result.end_row, 13);
        }
    }

    #[test]
    fn test_start_row_out_of_range() {
        let data = invoice();
        for start in [-1, 13, 50] {
            let result = compute_row_wise(&data, &spec(&["I"], RowOperation::Add, start, None));
            assert!(matches!(result, Err(SheetcalcError::InvalidRange(_))));
        }
    }

    #[test]
    fn test_empty_sources_rejected() {
        let result = compute_row_wise(&invoice(), &spec(&[], RowOperation::Add, 0, None));
        assert!(matches!(result, Err(SheetcalcError::InvalidRequest(_))));
    }

    #[test]
    fn test_summary_absent_without_numbers() {
        let data = sheet(vec![vec![("A", "x".into())]]);
        let result = compute_row_wise(&data, &spec(&["A"], RowOperation::Copy, 0, None)).unwrap();
        assert!(result.summary.is_none());
    }

    #[test]
    fn test_many_specs() {
        let data = invoice();
        let specs = vec![
            spec(&["I", "K"], RowOperation::Add, 10, None),
            spec(&["K", "I"], RowOperation::Subtract, 10, None),
        ];
        let results = compute_row_wise_many(&data, &specs).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].results[0].computed_value, CellValue::Number(3.0));
        assert_eq!(results[1].formula, "K - I");

        assert!(compute_row_wise_many(&data, &[]).is_err());
    }

    #[test]
    fn test_render_formula() {
        let cols: Vec<String> = vec!["I".into(), "K".into(), "M".into()];
        assert_eq!(render_formula(&cols, RowOperation::Add), "I + K + M");
        assert_eq!(render_formula(&cols, RowOperation::Copy), "Copy from I");
    }
}
