//! Sheetcalc API Server binary
//!
//! HTTP REST API for group aggregation, row-wise formulas and template merge.

use std::path::PathBuf;

use clap::Parser;
use sheetcalc::api::{run_api_server, ApiConfig};

#[derive(Parser, Debug)]
#[command(name = "sheetcalc-server")]
#[command(version)]
#[command(about = "Sheetcalc API Server - HTTP REST API for spreadsheet calculations and template merge")]
#[command(long_about = r#"
Sheetcalc API Server - HTTP REST API

Provides RESTful endpoints over registered workbooks:
  - POST /api/v1/files             - Register a workbook by server path
  - GET  /api/v1/files/:id/sheets  - List sheets
  - POST /api/v1/calculate         - Group aggregation (sum/average/count)
  - POST /api/v1/calculate-column  - Single-column statistic
  - POST /api/v1/calculate-rowwise - Row-wise formula
  - POST /api/v1/calculate-multi   - Several row-wise formulas
  - POST /api/v1/export            - Aggregation to a new workbook
  - POST /api/v1/export-template   - Row-wise results into a template
  - POST /api/v1/merge             - Merge values into a template

Additional endpoints:
  - GET  /health                   - Health check
  - GET  /version                  - Server version info
  - GET  /                         - API documentation

Example usage:
  sheetcalc-server                                 # Start on localhost:8080
  sheetcalc-server --port 3000 --manifest files.yaml

  curl -X POST http://localhost:8080/api/v1/calculate-rowwise \
    -H "Content-Type: application/json" \
    -d '{"file_id": 1, "sheet_name": "Data", "source_columns": ["I", "K"],
         "target_column": "L", "operation": "add", "start_row": 10}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SHEETCALC_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "SHEETCALC_PORT")]
    port: u16,

    /// Directory for generated workbooks
    #[arg(short, long, default_value = "exports", env = "SHEETCALC_EXPORTS_DIR")]
    exports_dir: PathBuf,

    /// YAML manifest of files to preload (files: [{id, path, kind}])
    #[arg(short, long, env = "SHEETCALC_MANIFEST")]
    manifest: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        exports_dir: args.exports_dir,
        manifest: args.manifest,
    };

    run_api_server(config).await
}
