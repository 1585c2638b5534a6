//! Template merge: place computed values into cells of an open workbook

use crate::error::{SheetcalcError, SheetcalcResult};
use crate::excel::{normalize_column, CellAddress, GridAccessor};
use crate::types::{CellValue, MergeReport, MergeTarget};
use std::path::Path;
use tracing::{debug, info};

/// Writes values into an already-open template workbook.
///
/// Every merge call is validated in full before its first cell write. A
/// failure during the writes poisons the merger so the partially written grid
/// can never be saved.
pub struct TemplateMerger<G: GridAccessor> {
    grid: G,
    poisoned: bool,
    cells_written: usize,
}

impl<G: GridAccessor> TemplateMerger<G> {
    pub fn new(grid: G) -> Self {
        Self {
            grid,
            poisoned: false,
            cells_written: 0,
        }
    }

    /// Cells written over the lifetime of this merger.
    pub fn cells_written(&self) -> usize {
        self.cells_written
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn into_inner(self) -> G {
        self.grid
    }

    /// Value `i` goes to `(target_column, start_row + i)`.
    pub fn merge_single(
        &mut self,
        sheet: &str,
        target_column: &str,
        start_row: u32,
        values: &[CellValue],
    ) -> SheetcalcResult<MergeReport> {
        let target = MergeTarget::Implicit {
            target_column: target_column.to_string(),
            start_row,
            values: values.to_vec(),
        };
        self.merge_multi(sheet, std::slice::from_ref(&target))
    }

    /// Apply several independently addressed targets in one pass.
    pub fn merge_multi(
        &mut self,
        sheet: &str,
        targets: &[MergeTarget],
    ) -> SheetcalcResult<MergeReport> {
        if targets.is_empty() {
            return Err(SheetcalcError::InvalidRequest(
                "at least one merge target is required".to_string(),
            ));
        }
        let writes = self.plan(sheet, targets)?;
        self.apply(sheet, &writes)?;

        info!(
            sheet,
            targets = targets.len(),
            cells = writes.len(),
            "template merged"
        );

        Ok(MergeReport {
            sheet: sheet.to_string(),
            targets: targets.len(),
            cells_written: writes.len(),
        })
    }

    /// Save the merged workbook to a new path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SheetcalcResult<()> {
        let path = path.as_ref();
        if self.poisoned {
            return Err(SheetcalcError::WriteFailure(format!(
                "refusing to save {}: an earlier merge failed part-way",
                path.display()
            )));
        }
        self.grid.save(path)
    }

    /// Resolve every target to concrete cell writes without touching the grid.
    fn plan(
        &self,
        sheet: &str,
        targets: &[MergeTarget],
    ) -> SheetcalcResult<Vec<(CellAddress, CellValue)>> {
        if !self.grid.has_sheet(sheet) {
            return Err(SheetcalcError::TargetNotFound(format!(
                "sheet '{}' does not exist in the template",
                sheet
            )));
        }

        // Every column up to the worksheet limit exists, used or not.
        let mut writes = Vec::new();
        for target in targets {
            let column = normalize_column(target.target_column())?;
            match target {
                MergeTarget::Implicit {
                    start_row, values, ..
                } => {
                    for (index, value) in values.iter().enumerate() {
                        let row = u32::try_from(index)
                            .ok()
                            .and_then(|i| start_row.checked_add(i))
                            .ok_or_else(|| {
                                SheetcalcError::InvalidRange(format!(
                                    "row for entry {} of column {} overflows",
                                    index, column
                                ))
                            })?;
                        writes.push((CellAddress::new(&column, row)?, value.clone()));
                    }
                }
                MergeTarget::Explicit { entries, .. } => {
                    for (index, entry) in entries.iter().enumerate() {
                        let row = entry.target_row.ok_or_else(|| SheetcalcError::MissingAddress {
                            column: column.clone(),
                            index,
                        })?;
                        writes.push((CellAddress::new(&column, row)?, entry.value.clone()));
                    }
                }
            }
        }

        debug!(sheet, cells = writes.len(), "merge planned");
        Ok(writes)
    }

    fn apply(&mut self, sheet: &str, writes: &[(CellAddress, CellValue)]) -> SheetcalcResult<()> {
        for (address, value) in writes {
            if let Err(e) = self.grid.set_cell(sheet, address, value) {
                self.poisoned = true;
                return Err(SheetcalcError::WriteFailure(format!(
                    "cell {} on sheet '{}': {}",
                    address, sheet, e
                )));
            }
            self.cells_written += 1;
        }
        Ok(())
    }
}
