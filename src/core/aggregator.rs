//! Group aggregates and single-column statistics

use crate::error::{SheetcalcError, SheetcalcResult};
use crate::excel::normalize_column;
use crate::types::{
    AggregationResult, AggregationSpec, ColumnOperation, ColumnStatistic, GroupOperation,
    GroupResult, MaterializedRow, MaterializedSheet,
};
use indexmap::IndexMap;

/// Validate an optional 0-based start row against the sheet length.
pub(crate) fn resolve_start_row(start_row: Option<i64>, row_count: usize) -> SheetcalcResult<usize> {
    let start = start_row.unwrap_or(0);
    if start < 0 || start as u64 >= row_count as u64 {
        return Err(SheetcalcError::InvalidRange(format!(
            "invalid start row: {} (sheet has {} rows)",
            start, row_count
        )));
    }
    Ok(start as usize)
}

/// Partition rows by the rendered group-by value and aggregate each target column.
///
/// Non-numeric and empty target cells are skipped, never zero-filled. Totals
/// accumulate raw sums regardless of the requested operation.
pub fn aggregate_by_group(
    sheet: &MaterializedSheet,
    spec: &AggregationSpec,
) -> SheetcalcResult<AggregationResult> {
    let group_by = normalize_column(&spec.group_by_column)?;
    if spec.target_columns.is_empty() {
        return Err(SheetcalcError::InvalidRequest(
            "at least one target column is required".to_string(),
        ));
    }
    let targets = spec
        .target_columns
        .iter()
        .map(|c| normalize_column(c))
        .collect::<SheetcalcResult<Vec<_>>>()?;

    let start = match spec.start_row {
        Some(_) => resolve_start_row(spec.start_row, sheet.len())?,
        None => 0,
    };

    let mut groups: IndexMap<String, Vec<&MaterializedRow>> = IndexMap::new();
    for row in sheet.rows.iter().skip(start) {
        if let Some(value) = row.get(&group_by) {
            groups.entry(value.render()).or_default().push(row);
        }
    }

    let mut totals: IndexMap<String, f64> = targets.iter().map(|c| (c.clone(), 0.0)).collect();
    let mut results = Vec::with_capacity(groups.len());

    for (key, rows) in groups {
        let mut values = IndexMap::with_capacity(targets.len());

        for target in &targets {
            let numbers = rows
                .iter()
                .filter_map(|row| row.get(target).and_then(|v| v.as_number()));
            let (sum, count) = numbers.fold((0.0, 0usize), |(s, c), n| (s + n, c + 1));

            let value = match spec.operation {
                GroupOperation::Sum => sum,
                GroupOperation::Average if count > 0 => sum / count as f64,
                GroupOperation::Average => 0.0,
                GroupOperation::Count => count as f64,
            };
            values.insert(target.clone(), value);

            if let Some(total) = totals.get_mut(target) {
                *total += sum;
            }
        }

        results.push(GroupResult { key, values });
    }

    Ok(AggregationResult {
        group_by_column: group_by,
        operation: spec.operation,
        groups: results,
        totals,
        start_row: start,
        row_count: sheet.len(),
    })
}

/// Statistic over the numeric cells of one column, from `start_row` onwards.
pub fn aggregate_column(
    sheet: &MaterializedSheet,
    column: &str,
    operation: ColumnOperation,
    start_row: Option<i64>,
) -> SheetcalcResult<ColumnStatistic> {
    let column = normalize_column(column)?;
    if sheet.is_empty() {
        return Err(SheetcalcError::NoData(format!(
            "sheet '{}' has no rows",
            sheet.name
        )));
    }
    let start = resolve_start_row(start_row, sheet.len())?;

    let processed = &sheet.rows[start..];
    let values: Vec<f64> = processed
        .iter()
        .filter_map(|row| row.get(&column).and_then(|v| v.as_number()))
        .collect();

    let Some(&first) = values.first() else {
        return Err(SheetcalcError::NoData(format!(
            "no numeric values found in column {} starting from row {}",
            column, start
        )));
    };

    let result = match operation {
        ColumnOperation::Sum => values.iter().sum(),
        ColumnOperation::Average => values.iter().sum::<f64>() / values.len() as f64,
        ColumnOperation::Count => values.len() as f64,
        ColumnOperation::Max => values.iter().copied().fold(first, f64::max),
        ColumnOperation::Min => values.iter().copied().fold(first, f64::min),
    };

    Ok(ColumnStatistic {
        column,
        operation,
        result,
        count: values.len(),
        processed_rows: processed.len(),
        start_row: start,
        data_length: sheet.len(),
    })
}
