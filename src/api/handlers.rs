//! API request handlers
//!
//! Every body is wrapped in `ApiResponse`; errors map to a status code by kind.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::{
    aggregate_by_group, aggregate_column, compute_row_wise, compute_row_wise_many,
    describe_sheets, materialize, TemplateMerger,
};
use crate::error::{SheetcalcError, SheetcalcResult};
use crate::excel::{ensure_distinct_output, export_table, GridAccessor, WorkbookGrid};
use crate::reference::{self, Province, Unit};
use crate::store::{FileKind, FileRecord};
use crate::types::{
    AggregationResult, AggregationSpec, CellValue, ColumnOperation, ColumnStatistic,
    GroupOperation, MaterializedSheet, MergeTarget, RowFormulaResult, RowFormulaSpec,
    RowOperation, SheetInfo,
};

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

//==============================================================================
// Errors
//==============================================================================

/// Engine error rendered as an enveloped HTTP response.
#[derive(Debug)]
pub struct ApiError(pub SheetcalcError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SheetcalcError::NotFound(_) | SheetcalcError::TargetNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            SheetcalcError::InvalidRange(_)
            | SheetcalcError::NoData(_)
            | SheetcalcError::UnsupportedOperation(_)
            | SheetcalcError::MissingAddress { .. }
            | SheetcalcError::InvalidColumn(_)
            | SheetcalcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SheetcalcError> for ApiError {
    fn from(err: SheetcalcError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(SheetcalcError::InvalidRequest(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(SheetcalcError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(kind = self.0.kind(), status = status.as_u16(), "{}", self.0);
        (status, Json(ApiResponse::<()>::err(self.0.to_string()))).into_response()
    }
}

//==============================================================================
// Shared helpers
//==============================================================================

fn open_file(state: &AppState, id: u64) -> SheetcalcResult<(FileRecord, WorkbookGrid)> {
    let record = state.store.get_file_by_id(id)?;
    let grid = WorkbookGrid::open(&record.file_path)?;
    Ok((record, grid))
}

fn load_sheet(state: &AppState, id: u64, sheet: &str) -> SheetcalcResult<MaterializedSheet> {
    let (_, grid) = open_file(state, id)?;
    materialize(&grid, sheet)
}

/// Open a template and pick its target sheet; the first sheet when unnamed.
fn open_template(
    state: &AppState,
    template_id: u64,
    sheet: Option<&str>,
) -> SheetcalcResult<(TemplateMerger<WorkbookGrid>, String)> {
    let (record, grid) = open_file(state, template_id)?;
    let sheet = match sheet {
        Some(name) => name.to_string(),
        None => grid.sheet_names().into_iter().next().ok_or_else(|| {
            SheetcalcError::TargetNotFound(format!("template {} has no sheets", record.file_name))
        })?,
    };
    Ok((TemplateMerger::new(grid), sheet))
}

/// Save a merged template, never over the template it was loaded from.
fn save_merged(merger: &TemplateMerger<WorkbookGrid>, path: &std::path::Path) -> SheetcalcResult<()> {
    if let Some(template) = merger.grid().path() {
        ensure_distinct_output(template, path)?;
    }
    merger.save(path)
}

/// Output path inside the exports directory.
///
/// Generated names follow `<prefix>_<unix>.xlsx`; a caller-supplied name must
/// be a bare file name.
fn output_path(state: &AppState, prefix: &str, name: Option<&str>) -> SheetcalcResult<PathBuf> {
    std::fs::create_dir_all(&state.exports_dir)?;

    let file_name = match name {
        Some(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty()
                || trimmed.contains(['/', '\\'])
                || trimmed.starts_with('.')
            {
                return Err(SheetcalcError::InvalidRequest(format!(
                    "output name must be a plain file name: '{}'",
                    name
                )));
            }
            if trimmed.to_lowercase().ends_with(".xlsx") {
                trimmed.to_string()
            } else {
                format!("{}.xlsx", trimmed)
            }
        }
        None => {
            let stamp = Utc::now().timestamp();
            let mut candidate = format!("{}_{}.xlsx", prefix, stamp);
            let mut n = 1;
            while state.exports_dir.join(&candidate).exists() {
                candidate = format!("{}_{}_{}.xlsx", prefix, stamp, n);
                n += 1;
            }
            candidate
        }
    };

    Ok(state.exports_dir.join(file_name))
}

//==============================================================================
// Info endpoints
//==============================================================================

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(method: &str, path: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Sheetcalc API Server".to_string(),
        version: state.version.clone(),
        description: "Spreadsheet aggregation, row-wise formulas and template merge".to_string(),
        endpoints: vec![
            endpoint("GET", "/health", "Health check endpoint"),
            endpoint("GET", "/version", "Get server version"),
            endpoint("GET", "/api/v1/files", "List registered files"),
            endpoint("POST", "/api/v1/files", "Register a workbook on the server"),
            endpoint("GET", "/api/v1/files/:id/sheets", "List sheets of a file"),
            endpoint("GET", "/api/v1/files/:id/sheets/:sheet", "Materialized sheet rows"),
            endpoint("POST", "/api/v1/calculate", "Group aggregation"),
            endpoint("POST", "/api/v1/calculate-column", "Single-column statistic"),
            endpoint("POST", "/api/v1/calculate-rowwise", "Row-wise formula"),
            endpoint("POST", "/api/v1/calculate-multi", "Several row-wise formulas"),
            endpoint("POST", "/api/v1/export", "Export a group aggregation to a workbook"),
            endpoint("POST", "/api/v1/export-template", "Row-wise results into a template"),
            endpoint("POST", "/api/v1/merge", "Merge values into a template"),
            endpoint("GET", "/api/v1/provinces", "Province reference table"),
            endpoint("GET", "/api/v1/provinces/:id/units", "Units of a province"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: ["aggregate", "column", "rowwise", "multi", "export", "merge"]
            .iter()
            .map(|f| f.to_string())
            .collect(),
    }))
}

//==============================================================================
// Files
//==============================================================================

/// Register request: the workbook must already be on the server's disk.
#[derive(Debug, Deserialize)]
pub struct RegisterFileRequest {
    pub path: String,
    #[serde(default)]
    pub kind: FileKind,
}

/// POST /api/v1/files - Register a workbook
pub async fn register_file(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterFileRequest>, JsonRejection>,
) -> ApiResult<FileRecord> {
    let Json(req) = payload?;
    let record = state
        .store
        .register(std::path::Path::new(&req.path), req.kind)?;
    Ok(Json(ApiResponse::ok(record)))
}

/// GET /api/v1/files - Registered files
pub async fn list_files(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.store.list()))
}

#[derive(Debug, Serialize)]
pub struct SheetsResponse {
    pub file_id: u64,
    pub file_name: String,
    pub sheets: Vec<SheetInfo>,
}

/// GET /api/v1/files/:id/sheets - Sheet listing
pub async fn list_sheets(
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<SheetsResponse> {
    let Path(id) = path?;
    let (record, grid) = open_file(&state, id)?;
    Ok(Json(ApiResponse::ok(SheetsResponse {
        file_id: record.id,
        file_name: record.file_name,
        sheets: describe_sheets(&grid),
    })))
}

/// GET /api/v1/files/:id/sheets/:sheet - Materialized rows
pub async fn sheet_data(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(u64, String)>, PathRejection>,
) -> ApiResult<MaterializedSheet> {
    let Path((id, sheet)) = path?;
    Ok(Json(ApiResponse::ok(load_sheet(&state, id, &sheet)?)))
}

//==============================================================================
// Calculations
//==============================================================================

/// Group aggregation request
#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub file_id: u64,
    pub sheet_name: String,
    pub group_by_column: String,
    pub target_columns: Vec<String>,
    pub operation: GroupOperation,
    #[serde(default)]
    pub start_row: Option<i64>,
}

impl CalculateRequest {
    fn spec(&self) -> AggregationSpec {
        AggregationSpec {
            group_by_column: self.group_by_column.clone(),
            target_columns: self.target_columns.clone(),
            operation: self.operation,
            start_row: self.start_row,
        }
    }
}

/// POST /api/v1/calculate - Group aggregation
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> ApiResult<AggregationResult> {
    let Json(req) = payload?;
    let sheet = load_sheet(&state, req.file_id, &req.sheet_name)?;
    Ok(Json(ApiResponse::ok(aggregate_by_group(&sheet, &req.spec())?)))
}

/// Single-column statistic request
#[derive(Debug, Deserialize)]
pub struct ColumnRequest {
    pub file_id: u64,
    pub sheet_name: String,
    pub column: String,
    pub operation: ColumnOperation,
    #[serde(default)]
    pub start_row: Option<i64>,
}

/// POST /api/v1/calculate-column - Single-column statistic
pub async fn calculate_column(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ColumnRequest>, JsonRejection>,
) -> ApiResult<ColumnStatistic> {
    let Json(req) = payload?;
    let sheet = load_sheet(&state, req.file_id, &req.sheet_name)?;
    let stat = aggregate_column(&sheet, &req.column, req.operation, req.start_row)?;
    Ok(Json(ApiResponse::ok(stat)))
}

/// Row-wise formula request
#[derive(Debug, Deserialize)]
pub struct RowWiseRequest {
    pub file_id: u64,
    pub sheet_name: String,
    pub source_columns: Vec<String>,
    pub target_column: String,
    pub operation: RowOperation,
    pub start_row: i64,
    #[serde(default)]
    pub end_row: Option<i64>,
}

impl RowWiseRequest {
    fn spec(&self) -> RowFormulaSpec {
        RowFormulaSpec {
            source_columns: self.source_columns.clone(),
            target_column: self.target_column.clone(),
            operation: self.operation,
            start_row: self.start_row,
            end_row: self.end_row,
        }
    }
}

/// POST /api/v1/calculate-rowwise - Row-wise formula
pub async fn calculate_rowwise(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RowWiseRequest>, JsonRejection>,
) -> ApiResult<RowFormulaResult> {
    let Json(req) = payload?;
    let sheet = load_sheet(&state, req.file_id, &req.sheet_name)?;
    Ok(Json(ApiResponse::ok(compute_row_wise(&sheet, &req.spec())?)))
}

/// Several row-wise formulas over one sheet
#[derive(Debug, Deserialize)]
pub struct MultiCalculateRequest {
    pub file_id: u64,
    pub sheet_name: String,
    pub calculations: Vec<RowFormulaSpec>,
}

#[derive(Debug, Serialize)]
pub struct MultiCalculateResponse {
    pub sheet_name: String,
    pub results: Vec<RowFormulaResult>,
}

/// POST /api/v1/calculate-multi - Multi-column row-wise calculation
pub async fn calculate_multi(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MultiCalculateRequest>, JsonRejection>,
) -> ApiResult<MultiCalculateResponse> {
    let Json(req) = payload?;
    let sheet = load_sheet(&state, req.file_id, &req.sheet_name)?;
    let results = compute_row_wise_many(&sheet, &req.calculations)?;
    Ok(Json(ApiResponse::ok(MultiCalculateResponse {
        sheet_name: req.sheet_name,
        results,
    })))
}

//==============================================================================
// Output files
//==============================================================================

/// Where a generated workbook was written.
#[derive(Debug, Serialize)]
pub struct OutputResponse {
    pub output_path: String,
    pub sheet: String,
    pub cells_written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<usize>,
}

/// Aggregation export request
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub calculation: CalculateRequest,
    #[serde(default)]
    pub output_name: Option<String>,
}

/// POST /api/v1/export - Group aggregation as a fresh workbook
pub async fn export(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> ApiResult<OutputResponse> {
    let Json(req) = payload?;
    let calc = &req.calculation;
    let sheet = load_sheet(&state, calc.file_id, &calc.sheet_name)?;
    let result = aggregate_by_group(&sheet, &calc.spec())?;

    let (headers, rows) = result.to_table();
    let path = output_path(&state, "export", req.output_name.as_deref())?;
    export_table(&headers, &rows, &path)?;

    info!(path = %path.display(), groups = rows.len(), "aggregation exported");
    Ok(Json(ApiResponse::ok(OutputResponse {
        output_path: path.display().to_string(),
        sheet: crate::excel::EXPORT_SHEET.to_string(),
        cells_written: (rows.len() + 1) * headers.len(),
        targets: None,
    })))
}

/// Row-wise results written back into a template
#[derive(Debug, Deserialize)]
pub struct ExportTemplateRequest {
    pub file_id: u64,
    pub sheet_name: String,
    pub calculations: Vec<RowFormulaSpec>,
    pub template_id: u64,
    #[serde(default)]
    pub template_sheet: Option<String>,
    #[serde(default)]
    pub output_name: Option<String>,
}

/// POST /api/v1/export-template - Compute and place results on their own rows
pub async fn export_template(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExportTemplateRequest>, JsonRejection>,
) -> ApiResult<OutputResponse> {
    let Json(req) = payload?;
    let sheet = load_sheet(&state, req.file_id, &req.sheet_name)?;
    let results = compute_row_wise_many(&sheet, &req.calculations)?;
    let targets: Vec<MergeTarget> = results.iter().map(MergeTarget::from_row_result).collect();

    let (mut merger, template_sheet) =
        open_template(&state, req.template_id, req.template_sheet.as_deref())?;
    let report = merger.merge_multi(&template_sheet, &targets)?;

    let path = output_path(&state, "calculated_template", req.output_name.as_deref())?;
    save_merged(&merger, &path)?;

    Ok(Json(ApiResponse::ok(OutputResponse {
        output_path: path.display().to_string(),
        sheet: report.sheet,
        cells_written: report.cells_written,
        targets: Some(report.targets),
    })))
}

/// Merge request, one variant per addressing mode.
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MergeRequest {
    /// Values land on consecutive rows from `start_row`.
    Single {
        template_id: u64,
        #[serde(default)]
        template_sheet: Option<String>,
        target_column: String,
        start_row: u32,
        values: Vec<CellValue>,
        #[serde(default)]
        output_name: Option<String>,
    },
    /// Several targets, each implicitly or explicitly addressed.
    Multi {
        template_id: u64,
        #[serde(default)]
        template_sheet: Option<String>,
        targets: Vec<MergeTarget>,
        #[serde(default)]
        output_name: Option<String>,
    },
}

/// POST /api/v1/merge - Merge values into a template
pub async fn merge(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> ApiResult<OutputResponse> {
    let Json(req) = payload?;

    let (path, report) = match req {
        MergeRequest::Single {
            template_id,
            template_sheet,
            target_column,
            start_row,
            values,
            output_name,
        } => {
            let (mut merger, sheet) = open_template(&state, template_id, template_sheet.as_deref())?;
            let report = merger.merge_single(&sheet, &target_column, start_row, &values)?;
            let path = output_path(&state, "merged", output_name.as_deref())?;
            save_merged(&merger, &path)?;
            (path, report)
        }
        MergeRequest::Multi {
            template_id,
            template_sheet,
            targets,
            output_name,
        } => {
            let (mut merger, sheet) = open_template(&state, template_id, template_sheet.as_deref())?;
            let report = merger.merge_multi(&sheet, &targets)?;
            let path = output_path(&state, "merged_multi", output_name.as_deref())?;
            save_merged(&merger, &path)?;
            (path, report)
        }
    };

    Ok(Json(ApiResponse::ok(OutputResponse {
        output_path: path.display().to_string(),
        sheet: report.sheet,
        cells_written: report.cells_written,
        targets: Some(report.targets),
    })))
}

//==============================================================================
// Reference data
//==============================================================================

#[derive(Debug, Serialize)]
pub struct ProvincesResponse {
    pub provinces: &'static [Province],
}

/// GET /api/v1/provinces
pub async fn provinces() -> impl IntoResponse {
    Json(ApiResponse::ok(ProvincesResponse {
        provinces: reference::provinces(),
    }))
}

#[derive(Debug, Serialize)]
pub struct UnitsResponse {
    pub province_id: u32,
    pub units: &'static [Unit],
}

/// GET /api/v1/provinces/:id/units
pub async fn units(path: Result<Path<u32>, PathRejection>) -> ApiResult<UnitsResponse> {
    let Path(province_id) = path?;
    Ok(Json(ApiResponse::ok(UnitsResponse {
        province_id,
        units: reference::units_by_province(province_id),
    })))
}
