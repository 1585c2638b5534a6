use crate::error::SheetcalcError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

//==============================================================================
// Cell Values
//==============================================================================

/// A typed cell value.
///
/// `Empty` is distinct from `Text("")` and from `Number(0.0)`. Serializes as
/// a JSON number, string, or `null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text rendering used for group keys and text writes.
    pub fn render(&self) -> String {
        match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<serde_json::Value> for CellValue {
    /// Numbers stay numbers, `null` is empty, everything else is its literal text.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => CellValue::Number(f),
                None => CellValue::Text(n.to_string()),
            },
            serde_json::Value::String(s) => CellValue::Text(s),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Empty => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(CellValue::from)
    }
}

//==============================================================================
// Materialized Sheets
//==============================================================================

/// One typed row, keyed by column letter in column order.
pub type MaterializedRow = IndexMap<String, CellValue>;

/// All rows of one sheet; index 0 is the first physical row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializedSheet {
    pub name: String,
    /// Shared column set of every row, derived once from the used-column bound.
    pub columns: Vec<String>,
    pub rows: Vec<MaterializedRow>,
}

impl MaterializedSheet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

/// Sheet listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub row_count: usize,
}

//==============================================================================
// Operations
//==============================================================================

macro_rules! operation_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase", try_from = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = SheetcalcError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(SheetcalcError::UnsupportedOperation(s.to_string())),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = SheetcalcError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}

operation_enum!(
    /// Per-group aggregate.
    GroupOperation {
        Sum => "sum",
        Average => "average",
        Count => "count",
    }
);

operation_enum!(
    /// Whole-column statistic.
    ColumnOperation {
        Sum => "sum",
        Average => "average",
        Count => "count",
        Max => "max",
        Min => "min",
    }
);

operation_enum!(
    /// Row-wise operator. `Copy` passes the first source value through untouched.
    RowOperation {
        Add => "add",
        Subtract => "subtract",
        Multiply => "multiply",
        Divide => "divide",
        Copy => "copy",
    }
);

impl RowOperation {
    /// Display symbol joining source columns in the rendered formula.
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            RowOperation::Add => Some(" + "),
            RowOperation::Subtract => Some(" - "),
            RowOperation::Multiply => Some(" × "),
            RowOperation::Divide => Some(" ÷ "),
            RowOperation::Copy => None,
        }
    }
}

//==============================================================================
// Aggregation
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub group_by_column: String,
    pub target_columns: Vec<String>,
    pub operation: GroupOperation,
    /// 0-based first row to include; all rows when absent.
    #[serde(default)]
    pub start_row: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub key: String,
    /// One computed number per target column.
    pub values: IndexMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub group_by_column: String,
    pub operation: GroupOperation,
    /// Groups in first-seen order.
    pub groups: Vec<GroupResult>,
    /// Raw sums per target column across all groups, whatever the operation.
    pub totals: IndexMap<String, f64>,
    pub start_row: usize,
    pub row_count: usize,
}

impl AggregationResult {
    pub fn group(&self, key: &str) -> Option<&GroupResult> {
        self.groups.iter().find(|g| g.key == key)
    }

    /// Header row plus one row per group, for tabular export.
    pub fn to_table(&self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        let mut headers = vec![self.group_by_column.clone()];
        headers.extend(self.totals.keys().cloned());

        let rows = self
            .groups
            .iter()
            .map(|group| {
                let mut row = vec![CellValue::Text(group.key.clone())];
                row.extend(
                    self.totals
                        .keys()
                        .map(|col| CellValue::Number(group.values.get(col).copied().unwrap_or(0.0))),
                );
                row
            })
            .collect();

        (headers, rows)
    }
}

/// Single-column statistic with the metadata needed to audit it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStatistic {
    pub column: String,
    pub operation: ColumnOperation,
    pub result: f64,
    /// Numeric values that contributed.
    pub count: usize,
    pub processed_rows: usize,
    pub start_row: usize,
    pub data_length: usize,
}

//==============================================================================
// Row-wise Formulas
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFormulaSpec {
    pub source_columns: Vec<String>,
    pub target_column: String,
    pub operation: RowOperation,
    /// 0-based, inclusive.
    pub start_row: i64,
    /// 0-based, inclusive; the last physical row when absent.
    #[serde(default)]
    pub end_row: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowResult {
    /// 1-based row number, which is also the destination row in a template.
    pub row_number: usize,
    pub computed_value: CellValue,
    /// Resolved inputs keyed by source column.
    pub inputs: IndexMap<String, CellValue>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub division_skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationSummary {
    pub total: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFormulaResult {
    pub source_columns: Vec<String>,
    pub target_column: String,
    pub operation: RowOperation,
    /// 1-based.
    pub start_row: usize,
    /// 1-based.
    pub end_row: usize,
    pub results: Vec<RowResult>,
    pub total_rows: usize,
    pub sheet_rows: usize,
    pub formula: String,
    /// Rows where at least one divide-by-zero step was skipped.
    pub skipped_divisions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CalculationSummary>,
}

//==============================================================================
// Template Merge
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeEntry {
    pub value: CellValue,
    #[serde(default)]
    pub target_row: Option<u32>,
}

/// One column's worth of values to place in a template sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "addressing", rename_all = "snake_case")]
pub enum MergeTarget {
    /// Value `i` lands on row `start_row + i`.
    Implicit {
        target_column: String,
        start_row: u32,
        values: Vec<CellValue>,
    },
    /// Every entry names its own 1-based destination row.
    Explicit {
        target_column: String,
        entries: Vec<MergeEntry>,
    },
}

impl MergeTarget {
    pub fn target_column(&self) -> &str {
        match self {
            MergeTarget::Implicit { target_column, .. } => target_column,
            MergeTarget::Explicit { target_column, .. } => target_column,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MergeTarget::Implicit { values, .. } => values.len(),
            MergeTarget::Explicit { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicit target placing each computed value back on its own row.
    pub fn from_row_result(result: &RowFormulaResult) -> Self {
        MergeTarget::Explicit {
            target_column: result.target_column.clone(),
            entries: result
                .results
                .iter()
                .map(|r| MergeEntry {
                    value: r.computed_value.clone(),
                    target_row: u32::try_from(r.row_number).ok(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub sheet: String,
    pub targets: usize,
    pub cells_written: usize,
}
