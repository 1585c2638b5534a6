//! Workbook grid: calamine read path, rust_xlsxwriter write path
//!
//! A workbook is loaded fully into memory in absolute (A1-anchored)
//! coordinates. Cell writes mutate the in-memory grid; `save` renders the
//! whole grid into a new file. Formula cells are carried through as formula
//! text plus their cached value, so a save never freezes them.

use crate::error::{SheetcalcError, SheetcalcResult};
use crate::excel::columns::{number_to_column, CellAddress};
use crate::types::CellValue;
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rust_xlsxwriter::{Format, Formula, Workbook, XlsxError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Narrow capability boundary over a spreadsheet codec.
pub trait GridAccessor {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Raw text rows of a sheet. Rows are ragged: trailing blank cells are dropped.
    fn read_rows(&self, sheet: &str) -> SheetcalcResult<Vec<Vec<String>>>;

    /// Rightmost used column as a letter code, `None` for a blank sheet.
    fn used_column_bound(&self, sheet: &str) -> SheetcalcResult<Option<String>>;

    fn set_cell(
        &mut self,
        sheet: &str,
        address: &CellAddress,
        value: &CellValue,
    ) -> SheetcalcResult<()>;

    fn save(&self, path: &Path) -> SheetcalcResult<()>;

    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_names().iter().any(|name| name == sheet)
    }
}

/// Stored cell. Richer than `CellValue` so that booleans and dates survive a
/// load/save cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GridValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Excel serial date.
    Date(f64),
    /// Formula text without the leading `=`, plus the value last computed for it.
    Formula {
        formula: String,
        cached: Box<GridValue>,
    },
}

impl GridValue {
    /// Text the way a reader sees it in the grid.
    pub fn render(&self) -> String {
        match self {
            GridValue::Empty => String::new(),
            GridValue::Number(n) => n.to_string(),
            GridValue::Text(s) => s.clone(),
            GridValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            GridValue::Date(serial) => excel_serial_to_iso(*serial),
            GridValue::Formula { cached, .. } => cached.render(),
        }
    }

    pub fn formula(formula: &str, cached: GridValue) -> Self {
        GridValue::Formula {
            formula: formula.trim_start_matches('=').to_string(),
            cached: Box::new(cached),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            GridValue::Empty => true,
            GridValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&CellValue> for GridValue {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Number(n) => GridValue::Number(*n),
            CellValue::Text(s) => GridValue::Text(s.clone()),
            CellValue::Empty => GridValue::Empty,
        }
    }
}

impl From<&Data> for GridValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => GridValue::Empty,
            Data::Int(i) => GridValue::Number(*i as f64),
            Data::Float(f) => GridValue::Number(*f),
            Data::String(s) => GridValue::Text(s.clone()),
            Data::Bool(b) => GridValue::Bool(*b),
            Data::DateTime(dt) => GridValue::Date(dt.as_f64()),
            other => GridValue::Text(other.to_string()),
        }
    }
}

/// Convert an Excel serial date to `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`.
pub fn excel_serial_to_iso(serial: f64) -> String {
    // Day 0 is 1899-12-30 once the 1900 leap-year bug is accounted for.
    let base = NaiveDate::from_ymd_opt(1899, 12, 30);
    let whole_days = serial.trunc();
    let date = match base {
        Some(base) if whole_days >= 0.0 => base.checked_add_days(Days::new(whole_days as u64)),
        _ => None,
    };
    let Some(date) = date else {
        return serial.to_string();
    };

    let seconds = (serial.fract() * 86_400.0).round() as u32;
    if seconds == 0 {
        return date.format("%Y-%m-%d").to_string();
    }

    match NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0) {
        Some(time) => NaiveDateTime::new(date, time)
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
        None => date.format("%Y-%m-%d").to_string(),
    }
}

/// Refuse an output path that resolves to the template itself.
pub fn ensure_distinct_output(template: &Path, output: &Path) -> SheetcalcResult<()> {
    if resolve_path(template) == resolve_path(output) {
        return Err(SheetcalcError::InvalidRequest(format!(
            "output {} is the template itself; templates are never written in place",
            output.display()
        )));
    }
    Ok(())
}

/// Canonical form of a path whose file may not exist yet.
fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    fs::canonicalize(parent)
        .map(|p| p.join(name))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// One sheet in row-major absolute coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridSheet {
    pub name: String,
    pub cells: Vec<Vec<GridValue>>,
}

impl GridSheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: Vec::new(),
        }
    }

    fn from_range(name: &str, range: &Range<Data>) -> Self {
        let mut sheet = GridSheet::new(name);
        let Some((start_row, start_col)) = range.start() else {
            return sheet;
        };

        for (row, col, data) in range.used_cells() {
            let value = GridValue::from(data);
            if value.is_blank() {
                continue;
            }
            sheet.set(start_row as usize + row, start_col as usize + col, value);
        }

        sheet
    }

    /// Overlay formula text onto the cached values already loaded.
    fn overlay_formulas(&mut self, formulas: &Range<String>) {
        let Some((start_row, start_col)) = formulas.start() else {
            return;
        };

        for (row, col, text) in formulas.used_cells() {
            if text.trim().is_empty() {
                continue;
            }
            let (row, col) = (start_row as usize + row, start_col as usize + col);
            let cached = self.get(row, col).cloned().unwrap_or_default();
            self.set(row, col, GridValue::formula(text, cached));
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&GridValue> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    pub fn set(&mut self, row: usize, col: usize, value: GridValue) {
        if row >= self.cells.len() {
            if value.is_blank() {
                return;
            }
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if col >= cells.len() {
            if value.is_blank() {
                return;
            }
            cells.resize_with(col + 1, GridValue::default);
        }
        cells[col] = value;
    }

    /// 1-based index of the rightmost non-blank column, 0 for a blank sheet.
    pub fn max_column(&self) -> usize {
        self.cells
            .iter()
            .filter_map(|row| row.iter().rposition(|v| !v.is_blank()))
            .map(|idx| idx + 1)
            .max()
            .unwrap_or(0)
    }

    /// Rendered rows up to the last row holding any data.
    pub fn rendered_rows(&self) -> Vec<Vec<String>> {
        let last = self
            .cells
            .iter()
            .rposition(|row| row.iter().any(|v| !v.is_blank()));
        let Some(last) = last else {
            return Vec::new();
        };

        self.cells[..=last]
            .iter()
            .map(|row| {
                let used = row.iter().rposition(|v| !v.is_blank()).map_or(0, |i| i + 1);
                row[..used].iter().map(GridValue::render).collect()
            })
            .collect()
    }
}

/// Workbook loaded into memory.
#[derive(Debug, Clone, Default)]
pub struct WorkbookGrid {
    path: Option<PathBuf>,
    sheets: Vec<GridSheet>,
}

impl WorkbookGrid {
    /// Open and fully load a workbook (.xlsx, .xlsm, .xls, .ods).
    pub fn open<P: AsRef<Path>>(path: P) -> SheetcalcResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SheetcalcError::NotFound(format!(
                "workbook {}",
                path.display()
            )));
        }

        let mut workbook = open_workbook_auto(path).map_err(|e| SheetcalcError::OpenFailure {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range =
                workbook
                    .worksheet_range(&name)
                    .map_err(|e| SheetcalcError::ReadFailure {
                        sheet: name.clone(),
                        message: e.to_string(),
                    })?;
            let mut sheet = GridSheet::from_range(&name, &range);
            // Not every format exposes formulas; those load as plain values.
            if let Ok(formulas) = workbook.worksheet_formula(&name) {
                sheet.overlay_formulas(&formulas);
            }
            sheets.push(sheet);
        }

        debug!(path = %path.display(), sheets = sheets.len(), "workbook loaded");

        Ok(Self {
            path: Some(path.to_path_buf()),
            sheets,
        })
    }

    /// Build a workbook from typed rows, sheet by sheet.
    pub fn from_sheets<I, S>(sheets: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Vec<CellValue>>)>,
        S: AsRef<str>,
    {
        let sheets = sheets
            .into_iter()
            .map(|(name, rows)| {
                let mut sheet = GridSheet::new(name.as_ref());
                for (r, row) in rows.iter().enumerate() {
                    for (c, value) in row.iter().enumerate() {
                        sheet.set(r, c, GridValue::from(value));
                    }
                }
                sheet
            })
            .collect();

        Self { path: None, sheets }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn sheet(&self, name: &str) -> Option<&GridSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Stored value at an address, `None` for a missing sheet or blank cell.
    pub fn cell(&self, sheet: &str, address: &CellAddress) -> Option<&GridValue> {
        let (row, col) = address.to_zero_based().ok()?;
        self.sheet(sheet)?
            .get(row as usize, col as usize)
            .filter(|v| !v.is_blank())
    }

    fn sheet_or_not_found(&self, name: &str) -> SheetcalcResult<&GridSheet> {
        self.sheet(name)
            .ok_or_else(|| SheetcalcError::NotFound(format!("sheet '{}'", name)))
    }

    fn render_workbook(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            for (r, row) in sheet.cells.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    let (row_idx, col_idx) = (r as u32, c as u16);
                    match value {
                        GridValue::Empty => {}
                        GridValue::Number(n) => {
                            worksheet.write_number(row_idx, col_idx, *n)?;
                        }
                        GridValue::Text(s) => {
                            worksheet.write_string(row_idx, col_idx, s)?;
                        }
                        GridValue::Bool(b) => {
                            worksheet.write_boolean(row_idx, col_idx, *b)?;
                        }
                        GridValue::Date(serial) => {
                            worksheet.write_number_with_format(
                                row_idx,
                                col_idx,
                                *serial,
                                &date_format,
                            )?;
                        }
                        GridValue::Formula { formula, cached } => {
                            let mut formula = Formula::new(format!("={}", formula));
                            match cached.as_ref() {
                                GridValue::Empty => {}
                                GridValue::Date(serial) => {
                                    formula = formula.set_result(serial.to_string());
                                }
                                other => formula = formula.set_result(other.render()),
                            }
                            worksheet.write_formula(row_idx, col_idx, formula)?;
                        }
                    }
                }
            }
        }

        workbook.save_to_buffer()
    }
}

impl GridAccessor for WorkbookGrid {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn read_rows(&self, sheet: &str) -> SheetcalcResult<Vec<Vec<String>>> {
        Ok(self.sheet_or_not_found(sheet)?.rendered_rows())
    }

    fn used_column_bound(&self, sheet: &str) -> SheetcalcResult<Option<String>> {
        let max = self.sheet_or_not_found(sheet)?.max_column();
        Ok((max > 0).then(|| number_to_column(max as u32)))
    }

    fn set_cell(
        &mut self,
        sheet: &str,
        address: &CellAddress,
        value: &CellValue,
    ) -> SheetcalcResult<()> {
        let (row, col) = address.to_zero_based()?;
        let target = self
            .sheets
            .iter_mut()
            .find(|s| s.name == sheet)
            .ok_or_else(|| SheetcalcError::NotFound(format!("sheet '{}'", sheet)))?;
        target.set(row as usize, col as usize, GridValue::from(value));
        Ok(())
    }

    fn save(&self, path: &Path) -> SheetcalcResult<()> {
        let buffer = self.render_workbook().map_err(|e| {
            SheetcalcError::WriteFailure(format!("{}: {}", path.display(), e))
        })?;

        // Write beside the destination, then rename over it.
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "workbook.xlsx".to_string());
        let staging = path.with_file_name(format!(".{}.partial", file_name));

        let written = fs::write(&staging, &buffer).and_then(|_| fs::rename(&staging, path));
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(SheetcalcError::WriteFailure(format!(
                "{}: {}",
                path.display(),
                e
            )));
        }

        info!(path = %path.display(), bytes = buffer.len(), "workbook saved");
        Ok(())
    }
}
