// stockmatch CLI - stock reconciliation and inventory editing, headless

mod edit;
mod exit_codes;
mod mapping;
mod reconcile;
mod util;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stockmatch_config::{BackendKind, ConfigError, Settings};
use stockmatch_io::IoError;
use stockmatch_recon::ReconError;
use stockmatch_store::{
    filter_rows, format_values, sort_rows, AuditLevel, Backend, RowEditor, RowId, SqliteStore, StoreError,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exit_codes::{
    config_exit_code, io_exit_code, recon_exit_code, store_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_SUCCESS,
};
use mapping::MappingCommands;

/// Overrides the settings file's `log.filter`.
const LOG_ENV: &str = "STOCKMATCH_LOG";

#[derive(Parser)]
#[command(name = "stockmatch")]
#[command(about = "Reconcile order uploads against the stock table and edit inventory rows")]
#[command(version)]
struct Cli {
    /// Settings file (default: ~/.config/stockmatch/config.toml)
    #[arg(long, global = true, env = "STOCKMATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the mapping and audit tables if absent
    #[command(after_help = "\
Examples:
  stockmatch init
  stockmatch init --write-config")]
    Init {
        /// Also write the current settings to the settings file if it does not exist
        #[arg(long)]
        write_config: bool,
    },

    /// List the stock table's columns and their types
    Columns {
        #[arg(long)]
        json: bool,
    },

    /// Show stock rows
    #[command(after_help = "\
Examples:
  stockmatch rows
  stockmatch rows --search res --sort MİKTAR --desc
  stockmatch rows --json")]
    Rows {
        /// Case-insensitive substring over every field
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Column to sort by
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,

        #[arg(long)]
        json: bool,
    },

    /// Insert a row; one value per column, "" for blank
    #[command(after_help = "\
Examples:
  stockmatch add A100 'Resistor 10k' 20 B3")]
    Add {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Set one cell of a row
    #[command(after_help = "\
Examples:
  stockmatch set 12 MİKTAR 40
  stockmatch set 12 YER ''")]
    Set {
        row_id: i64,
        column: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Delete a row (not undoable)
    Delete { row_id: i64 },

    /// Match an uploaded order file against stock
    #[command(after_help = "\
Exit code 8 with --strict means at least one line matched no stock row.

Examples:
  stockmatch reconcile order.xlsx
  stockmatch reconcile order.csv --multiplier 3
  stockmatch reconcile order.xlsx --sheet Order --output result.xlsx
  stockmatch reconcile order.csv --json | jq .summary")]
    Reconcile {
        /// Upload file (csv, tsv, txt, xlsx, xls, xlsb, ods)
        file: PathBuf,

        /// Scale every file quantity by this factor (non-integers count as 1)
        #[arg(long, short = 'm', allow_hyphen_values = true)]
        multiplier: Option<String>,

        /// Sheet name for spreadsheet uploads (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Write the per-line result to a .xlsx, .csv or .tsv file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Exit non-zero when any line is unmatched
        #[arg(long)]
        strict: bool,
    },

    /// Manage alternative identifier mappings
    #[command(subcommand)]
    Mapping(MappingCommands),

    /// Export the stock table to .xlsx, .csv or .tsv
    #[command(after_help = "\
Examples:
  stockmatch export stock.xlsx
  stockmatch export stock.csv")]
    Export {
        path: PathBuf,

        /// Worksheet name for .xlsx output (default: the table name)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Show recent audit log entries, newest first
    Log {
        #[arg(long, short = 'n', default_value_t = 50)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Interactive editing session on stdin with undo
    #[command(after_help = "\
Commands inside the session:
  add <value>...            insert a row
  set <row> <column> <value> change one cell
  undo                      revert the last add or set
  rows [search]             show rows
  columns                   show columns
  quit                      leave the session")]
    Edit,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = Settings::load_at(cli.config.as_deref())
        .map_err(CliError::config)
        .and_then(|settings| {
            init_tracing(&settings.log.filter);
            debug!(backend = %settings.storage.backend, table = %settings.table.name, "settings loaded");
            run(cli, settings)
        });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn run(cli: Cli, settings: Settings) -> Result<(), CliError> {
    let Some(command) = cli.command else {
        eprintln!("Usage: stockmatch <command> [options]");
        eprintln!("       stockmatch --help for more information");
        return Ok(());
    };

    match command {
        Commands::Init { write_config } => cmd_init(&settings, cli.config.as_deref(), write_config),
        Commands::Columns { json } => cmd_columns(&settings, json),
        Commands::Rows { search, sort, desc, json } => cmd_rows(&settings, search, sort, desc, json),
        Commands::Add { values } => cmd_add(&settings, values),
        Commands::Set { row_id, column, value } => cmd_set(&settings, RowId(row_id), column, value),
        Commands::Delete { row_id } => cmd_delete(&settings, RowId(row_id)),
        Commands::Reconcile { file, multiplier, sheet, output, json, strict } => {
            let backend = open_backend(&settings)?;
            let opts = reconcile::ReconcileOptions { multiplier, sheet, output, json, strict };
            reconcile::cmd_reconcile(backend.as_ref(), &settings, &file, opts)
        }
        Commands::Mapping(cmd) => {
            let backend = open_backend(&settings)?;
            mapping::cmd_mapping(backend.as_ref(), cmd)
        }
        Commands::Export { path, sheet } => cmd_export(&settings, path, sheet),
        Commands::Log { limit, json } => cmd_log(&settings, limit, json),
        Commands::Edit => {
            let backend = open_backend(&settings)?;
            let columns = backend.columns().map_err(CliError::store)?;
            let stdin = io::stdin();
            let stdout = io::stdout();
            edit::run_session(backend.as_ref(), RowEditor::new(columns), stdin.lock(), stdout.lock())
                .map_err(|e| CliError::io(e.to_string()))
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn store(err: StoreError) -> Self {
        let hint = match &err {
            StoreError::MissingTable(_) => Some("check [table] name in the settings file".to_string()),
            StoreError::UnknownColumn(_) => Some("stockmatch columns lists the table's columns".to_string()),
            _ => None,
        };
        Self { code: store_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn recon(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingColumn { source_name, .. } if source_name == "upload" => {
                Some("set [upload] value_column in the settings file".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn file(err: IoError) -> Self {
        Self::new(io_exit_code(&err), err.to_string())
    }

    pub fn config(err: ConfigError) -> Self {
        Self::new(config_exit_code(&err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::store(err)
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::io(err.to_string())
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Open the configured storage engine. The auxiliary tables are created here.
pub(crate) fn open_backend(settings: &Settings) -> Result<Box<dyn Backend>, CliError> {
    let table = settings.table_spec();
    match settings.storage.backend {
        BackendKind::Sqlite => {
            let store = SqliteStore::open(&settings.storage.sqlite_path, table)?;
            Ok(Box::new(store))
        }
        BackendKind::Mysql => open_mysql(settings, table),
    }
}

#[cfg(feature = "mysql")]
fn open_mysql(settings: &Settings, table: stockmatch_store::TableSpec) -> Result<Box<dyn Backend>, CliError> {
    let url = settings
        .storage
        .mysql_url
        .clone()
        .ok_or_else(|| CliError::new(EXIT_CONFIG, "storage.mysql_url is not set"))?;
    Ok(Box::new(stockmatch_store::MySqlStore::open(url, table)?))
}

#[cfg(not(feature = "mysql"))]
fn open_mysql(_settings: &Settings, _table: stockmatch_store::TableSpec) -> Result<Box<dyn Backend>, CliError> {
    Err(CliError::new(EXIT_CONFIG, "this build has no MySQL support")
        .with_hint("rebuild with --features mysql, or set storage.backend = \"sqlite\""))
}

fn storage_target(settings: &Settings) -> String {
    match settings.storage.backend {
        BackendKind::Sqlite => settings.storage.sqlite_path.display().to_string(),
        BackendKind::Mysql => "mysql".to_string(),
    }
}

// ============================================================================
// init
// ============================================================================

fn cmd_init(settings: &Settings, explicit: Option<&Path>, write_config: bool) -> Result<(), CliError> {
    let backend = open_backend(settings)?;
    println!("Mapping and audit tables ready in {}", storage_target(settings));

    match backend.columns() {
        Ok(columns) => println!("Table {}: {} column(s)", settings.table.name, columns.len()),
        Err(StoreError::MissingTable(name)) => {
            eprintln!("note: stock table '{}' does not exist yet", name);
        }
        Err(e) => return Err(CliError::store(e)),
    }

    if write_config {
        let path = explicit.map(Path::to_path_buf).unwrap_or_else(Settings::default_path);
        if path.exists() {
            eprintln!("note: {} already exists, left unchanged", path.display());
        } else {
            settings.save(&path).map_err(CliError::config)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

// ============================================================================
// columns / rows
// ============================================================================

fn cmd_columns(settings: &Settings, json: bool) -> Result<(), CliError> {
    let backend = open_backend(settings)?;
    let columns = backend.columns()?;

    if json {
        return print_json(&columns);
    }

    let headers = vec!["Column".to_string(), "Type".to_string()];
    let rows: Vec<Vec<String>> = columns.iter().map(|c| vec![c.name.clone(), c.ty.to_string()]).collect();
    print!("{}", util::render_table(&headers, &rows));
    Ok(())
}

fn cmd_rows(
    settings: &Settings,
    search: Option<String>,
    sort: Option<String>,
    desc: bool,
    json: bool,
) -> Result<(), CliError> {
    let backend = open_backend(settings)?;
    let columns = backend.columns()?;
    let mut rows = backend.fetch_all(&columns)?;

    if let Some(col) = &sort {
        sort_rows(&mut rows, &columns, col, desc)?;
    }
    let shown = filter_rows(&rows, search.as_deref().unwrap_or(""));

    if json {
        let names = columns.names();
        let out: Vec<serde_json::Value> = shown
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                obj.insert("row_id".into(), serde_json::json!(row.row_id));
                for (name, value) in names.iter().zip(&row.fields) {
                    obj.insert((*name).to_string(), serde_json::json!(value));
                }
                serde_json::Value::Object(obj)
            })
            .collect();
        print_json(&out)?;
        return Ok(());
    }

    let mut headers = vec!["#".to_string()];
    headers.extend(columns.names().into_iter().map(str::to_string));
    let table: Vec<Vec<String>> = shown
        .iter()
        .map(|row| {
            let mut cells = vec![row.row_id.to_string()];
            cells.extend(row.display_values());
            cells
        })
        .collect();
    print!("{}", util::render_table(&headers, &table));
    if search.is_some() {
        eprintln!("{} of {} row(s)", shown.len(), rows.len());
    }
    Ok(())
}

// ============================================================================
// add / set / delete
// ============================================================================

fn cmd_add(settings: &Settings, values: Vec<String>) -> Result<(), CliError> {
    let backend = open_backend(settings)?;
    let mut editor = RowEditor::new(backend.columns()?);
    let row_id = editor.add_row(backend.as_ref(), &values)?;
    println!("Added row {}", row_id);
    Ok(())
}

fn cmd_set(settings: &Settings, row_id: RowId, column: String, value: String) -> Result<(), CliError> {
    let backend = open_backend(settings)?;
    let mut editor = RowEditor::new(backend.columns()?);
    if editor.edit_cell(backend.as_ref(), row_id, &column, &value)? {
        println!("Updated row {}: {} = {}", row_id, column, value);
    } else {
        println!("Row {} unchanged", row_id);
    }
    Ok(())
}

fn cmd_delete(settings: &Settings, row_id: RowId) -> Result<(), CliError> {
    let backend = open_backend(settings)?;
    let columns = backend.columns()?;
    match backend.delete(&columns, row_id)? {
        Some(values) => println!("Deleted row {}: {}", row_id, format_values(&values)),
        None => eprintln!("note: row {} not found, nothing deleted", row_id),
    }
    Ok(())
}

// ============================================================================
// export
// ============================================================================

fn cmd_export(settings: &Settings, path: PathBuf, sheet: Option<String>) -> Result<(), CliError> {
    let backend = open_backend(settings)?;
    let columns = backend.columns()?;
    let rows = backend.fetch_all(&columns)?;

    let headers: Vec<String> = columns.names().into_iter().map(str::to_string).collect();
    let data: Vec<_> = rows.into_iter().map(|r| r.fields).collect();
    let sheet_name = sheet.unwrap_or_else(|| settings.table.name.clone());

    stockmatch_io::export_table(&path, &sheet_name, &headers, &data).map_err(CliError::file)?;
    backend.log_action(AuditLevel::Info, &format!("Exported table to {}", path.display()))?;
    println!("Exported {} row(s) to {}", data.len(), path.display());
    Ok(())
}

// ============================================================================
// log
// ============================================================================

fn cmd_log(settings: &Settings, limit: usize, json: bool) -> Result<(), CliError> {
    let backend = open_backend(settings)?;
    let entries = backend.recent_actions(limit)?;

    if json {
        print_json(&entries)?;
        return Ok(());
    }

    let headers = vec!["Time".to_string(), "Level".to_string(), "Message".to_string()];
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| vec![e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(), e.level.to_string(), e.message.clone()])
        .collect();
    print!("{}", util::render_table(&headers, &rows));
    Ok(())
}

pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", text)?;
    Ok(())
}
