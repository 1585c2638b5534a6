//! Batch jobs: row-wise formulas over a source sheet, merged into a template

use crate::core::{compute_row_wise_many, materialize, TemplateMerger};
use crate::error::{SheetcalcError, SheetcalcResult};
use crate::excel::{ensure_distinct_output, GridAccessor, WorkbookGrid};
use crate::types::{MergeReport, MergeTarget, RowFormulaResult, RowFormulaSpec};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// YAML job description.
///
/// ```yaml
/// source: data.xlsx
/// sheet: Data
/// template: form.xlsx
/// output: filled.xlsx
/// calculations:
///   - source_columns: [I, K]
///     target_column: L
///     operation: add
///     start_row: 10
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub source: PathBuf,
    pub sheet: String,
    pub template: PathBuf,
    /// First sheet of the template when absent.
    #[serde(default)]
    pub template_sheet: Option<String>,
    pub output: PathBuf,
    pub calculations: Vec<RowFormulaSpec>,
}

#[derive(Debug)]
pub struct JobReport {
    pub results: Vec<RowFormulaResult>,
    pub merge: MergeReport,
    pub output: PathBuf,
}

impl Job {
    /// Load a job file. Relative paths resolve against the job file's directory.
    pub fn from_file(path: &Path) -> SheetcalcResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut job: Job = serde_yaml::from_str(&content)?;
        if let Some(base) = path.parent() {
            for p in [&mut job.source, &mut job.template, &mut job.output] {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
        Ok(job)
    }

    /// Compute every calculation, place each result back on its own row of the
    /// template, and save the output.
    pub fn run(&self) -> SheetcalcResult<JobReport> {
        ensure_distinct_output(&self.template, &self.output)?;

        let source = WorkbookGrid::open(&self.source)?;
        let sheet = materialize(&source, &self.sheet)?;
        let results = compute_row_wise_many(&sheet, &self.calculations)?;

        let template = WorkbookGrid::open(&self.template)?;
        let template_sheet = match &self.template_sheet {
            Some(name) => name.clone(),
            None => template.sheet_names().into_iter().next().ok_or_else(|| {
                SheetcalcError::TargetNotFound(format!(
                    "template {} has no sheets",
                    self.template.display()
                ))
            })?,
        };

        let targets: Vec<MergeTarget> = results.iter().map(MergeTarget::from_row_result).collect();
        let mut merger = TemplateMerger::new(template);
        let merge = merger.merge_multi(&template_sheet, &targets)?;
        merger.save(&self.output)?;

        info!(output = %self.output.display(), cells = merge.cells_written, "job complete");

        Ok(JobReport {
            results,
            merge,
            output: self.output.clone(),
        })
    }
}
