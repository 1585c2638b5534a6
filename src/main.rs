use clap::{Parser, Subcommand};
use sheetcalc::cli;
use sheetcalc::error::SheetcalcResult;
use sheetcalc::types::{ColumnOperation, GroupOperation, RowOperation};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetcalc")]
#[command(about = "Spreadsheet group aggregates, row-wise formulas and template merge.")]
#[command(long_about = "Sheetcalc - spreadsheet calculation and template merge

Reads a sheet into typed rows (A, B, ... keyed; no header skipping), computes
group aggregates or per-row formulas, and writes results into a template
workbook at the cells you address.

COMMANDS:
  sheets     - List sheets with row counts and column spans
  aggregate  - Group rows by a column and sum/average/count targets
  column     - Sum/average/count/max/min of one column
  rowwise    - Apply add/subtract/multiply/divide/copy across columns per row
  merge      - Write a value list into consecutive cells of a template
  run        - Run a YAML job (row-wise formulas merged into a template)

ROWS:
  Row options are 0-based indexes into the sheet (row 0 = spreadsheet row 1),
  except `merge --start-row`, which is a 1-based spreadsheet row.

EXAMPLES:
  sheetcalc sheets data.xlsx
  sheetcalc aggregate data.xlsx -s Data -g A -t B,C -o sum --start-row 1
  sheetcalc rowwise data.xlsx -s Data --sources I,K --target L -o add --start-row 10 \\
      --template form.xlsx --output filled.xlsx
  sheetcalc merge form.xlsx --column L --start-row 11 --values 7,9,11 --output out.xlsx")]
#[command(version)]
struct Cli {
    /// Emit engine logs (RUST_LOG overrides the level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sheets with row counts and column spans
    Sheets {
        /// Path to workbook (.xlsx, .xls)
        file: PathBuf,
    },

    #[command(long_about = "Group rows by the text of one column and aggregate target columns.

Only numeric cells count; text and empty cells are skipped. Average of a
group with no numeric cells is 0. Totals are always raw sums.

EXAMPLE:
  sheetcalc aggregate sales.xlsx -s Data -g A -t B -o sum --start-row 1
  sheetcalc aggregate sales.xlsx -s Data -g A -t B,C -o average --export totals.xlsx")]
    /// Group rows and aggregate target columns
    Aggregate {
        /// Path to workbook
        file: PathBuf,

        /// Sheet name
        #[arg(short, long)]
        sheet: String,

        /// Column whose value forms the group key
        #[arg(short, long)]
        group_by: String,

        /// Comma-separated target columns
        #[arg(short, long, value_delimiter = ',', required = true)]
        targets: Vec<String>,

        /// sum | average | count
        #[arg(short, long, default_value = "sum")]
        operation: GroupOperation,

        /// First 0-based row to include (e.g. 1 to skip a header)
        #[arg(long)]
        start_row: Option<i64>,

        /// Also write the groups to a new workbook
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Statistic over the numeric cells of one column
    Column {
        /// Path to workbook
        file: PathBuf,

        /// Sheet name
        #[arg(short, long)]
        sheet: String,

        /// Column letter
        #[arg(short, long)]
        column: String,

        /// sum | average | count | max | min
        #[arg(short, long, default_value = "sum")]
        operation: ColumnOperation,

        /// First 0-based row to include
        #[arg(long)]
        start_row: Option<i64>,
    },

    #[command(long_about = "Apply one operator across source columns for every row in a range.

Missing or non-numeric operands count as 0. A divide step by 0 is skipped
(the running value is kept). Copy passes the first source value through.

With --template and --output, each result is written into the target column
of the template on its own 1-based row.

EXAMPLE:
  sheetcalc rowwise data.xlsx -s Data --sources I,K,M --target L -o add --start-row 10")]
    /// Row-wise formula across source columns
    Rowwise {
        /// Path to workbook
        file: PathBuf,

        /// Sheet name
        #[arg(short, long)]
        sheet: String,

        /// Comma-separated source columns, in fold order
        #[arg(long, value_delimiter = ',', required = true)]
        sources: Vec<String>,

        /// Column receiving the results
        #[arg(long)]
        target: String,

        /// add | subtract | multiply | divide | copy
        #[arg(short, long)]
        operation: RowOperation,

        /// First 0-based row
        #[arg(long, default_value = "0")]
        start_row: i64,

        /// Last 0-based row (inclusive); defaults to the last row
        #[arg(long)]
        end_row: Option<i64>,

        /// Template workbook to merge results into
        #[arg(long, requires = "output")]
        template: Option<PathBuf>,

        /// Template sheet (defaults to the first sheet)
        #[arg(long)]
        template_sheet: Option<String>,

        /// Output workbook for the merged template
        #[arg(long, requires = "template")]
        output: Option<PathBuf>,
    },

    /// Write values into consecutive rows of a template column
    Merge {
        /// Template workbook
        template: PathBuf,

        /// Template sheet (defaults to the first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Target column letter
        #[arg(short, long)]
        column: String,

        /// 1-based row receiving the first value
        #[arg(long)]
        start_row: u32,

        /// Comma-separated values
        #[arg(long)]
        values: String,

        /// Output workbook path (the template is never modified)
        #[arg(long)]
        output: PathBuf,
    },

    #[command(long_about = "Run a YAML job: row-wise formulas over a source sheet,
each result merged into the template on its own row.

JOB FILE:
  source: data.xlsx
  sheet: Data
  template: form.xlsx
  template_sheet: Sheet1     # optional, first sheet by default
  output: filled.xlsx
  calculations:
    - source_columns: [I, K]
      target_column: L
      operation: add
      start_row: 10

Relative paths resolve against the job file's directory.")]
    /// Run a YAML job file
    Run {
        /// Path to job YAML
        job: PathBuf,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetcalc=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> SheetcalcResult<()> {
    let cli = Cli::parse();

    if cli.verbose {
        init_logging();
    }

    match cli.command {
        Commands::Sheets { file } => cli::sheets(file),

        Commands::Aggregate {
            file,
            sheet,
            group_by,
            targets,
            operation,
            start_row,
            export,
        } => cli::aggregate(
            file,
            sheet,
            cli::aggregation_spec(group_by, targets, operation, start_row),
            export,
        ),

        Commands::Column {
            file,
            sheet,
            column,
            operation,
            start_row,
        } => cli::column(file, sheet, column, operation, start_row),

        Commands::Rowwise {
            file,
            sheet,
            sources,
            target,
            operation,
            start_row,
            end_row,
            template,
            template_sheet,
            output,
        } => {
            let template = match (template, output) {
                (Some(template), Some(output)) => Some(cli::TemplateOutput {
                    template,
                    sheet: template_sheet,
                    output,
                }),
                _ => None,
            };
            cli::rowwise(
                file,
                sheet,
                cli::row_formula_spec(sources, target, operation, start_row, end_row),
                template,
                cli.verbose,
            )
        }

        Commands::Merge {
            template,
            sheet,
            column,
            start_row,
            values,
            output,
        } => cli::merge(template, sheet, column, start_row, values, output),

        Commands::Run { job } => cli::run(job),
    }
}
