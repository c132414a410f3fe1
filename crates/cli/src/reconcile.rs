//! `stockmatch reconcile`: classify an uploaded order file against stock.

use std::path::{Path, PathBuf};

use stockmatch_config::Settings;
use stockmatch_recon::{apply_multiplier, load_upload_lines, parse_multiplier, reconcile, LineResult, ReconResult};
use stockmatch_store::{Backend, Value};
use tracing::info;

use crate::exit_codes::EXIT_UNMATCHED;
use crate::{print_json, util, CliError};

pub struct ReconcileOptions {
    pub multiplier: Option<String>,
    pub sheet: Option<String>,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub strict: bool,
}

pub fn cmd_reconcile(
    backend: &dyn Backend,
    settings: &Settings,
    file: &Path,
    opts: ReconcileOptions,
) -> Result<(), CliError> {
    let config = settings.recon_config();

    let upload = stockmatch_io::import_table(file, opts.sheet.as_deref()).map_err(CliError::file)?;
    let lines = load_upload_lines(&upload.headers, &upload.rows, &config.upload).map_err(CliError::recon)?;

    let columns = backend.columns()?;
    let rows = backend.fetch_all(&columns)?;
    let mut result = reconcile(&config, &columns, &rows, backend, &lines).map_err(CliError::recon)?;

    if let Some(text) = &opts.multiplier {
        let factor = parse_multiplier(text);
        let (scaled, skipped) = apply_multiplier(&result, factor);
        if !skipped.is_empty() {
            let list: Vec<String> = skipped.iter().map(usize::to_string).collect();
            eprintln!("note: quantity left unchanged on line(s) {}", list.join(", "));
        }
        result = scaled;
    }

    info!(
        file = %file.display(),
        lines = result.summary.total_lines,
        unmatched = result.summary.unmatched,
        "reconciled upload"
    );

    if let Some(path) = &opts.output {
        let (headers, data) = result_table(settings, &result);
        stockmatch_io::export_table(path, "Reconciliation", &headers, &data).map_err(CliError::file)?;
        eprintln!("Wrote {} line(s) to {}", data.len(), path.display());
    }

    if opts.json {
        print_json(&result)?;
    } else {
        print_report(settings, &result);
    }

    if opts.strict && result.summary.unmatched > 0 {
        return Err(CliError::new(
            EXIT_UNMATCHED,
            format!("{} of {} line(s) unmatched", result.summary.unmatched, result.summary.total_lines),
        )
        .with_hint("stockmatch mapping add <identifier> <value> to map them"));
    }
    Ok(())
}

fn result_headers(settings: &Settings) -> Vec<String> {
    vec![
        "Line".to_string(),
        settings.upload.value_column.clone(),
        "Match".to_string(),
        settings.table.identifier_column.clone(),
        settings.table.quantity_column.clone(),
        settings.upload.quantity_column.clone(),
        "box".to_string(),
        "stockCheck".to_string(),
    ]
}

fn text_or_null(s: Option<&str>) -> Value {
    match s.map(str::trim) {
        None | Some("") => Value::Null,
        Some(t) => t.parse::<i64>().map(Value::Integer).unwrap_or_else(|_| Value::from(t)),
    }
}

fn line_values(line: &LineResult) -> Vec<Value> {
    vec![
        Value::Integer(line.line_no as i64),
        Value::from(line.value.as_str()),
        Value::from(line.kind.to_string()),
        text_or_null(line.matched_identifier.as_deref()),
        line.on_hand.clone().unwrap_or(Value::Null),
        text_or_null(line.quantity.as_deref()),
        text_or_null(Some(line.location.as_str())),
        line.stock_check.map(Value::Integer).unwrap_or(Value::Null),
    ]
}

/// Per-line result as typed rows for spreadsheet export.
fn result_table(settings: &Settings, result: &ReconResult) -> (Vec<String>, Vec<Vec<Value>>) {
    (result_headers(settings), result.lines.iter().map(line_values).collect())
}

fn print_report(settings: &Settings, result: &ReconResult) {
    let rows: Vec<Vec<String>> = result
        .lines
        .iter()
        .map(|line| {
            vec![
                line.line_no.to_string(),
                line.value.clone(),
                line.kind.to_string(),
                line.matched_identifier.clone().unwrap_or_default(),
                line.on_hand.as_ref().map(Value::to_string).unwrap_or_default(),
                line.quantity.clone().unwrap_or_default(),
                line.location.clone(),
                line.stock_check_display(),
            ]
        })
        .collect();
    print!("{}", util::render_table(&result_headers(settings), &rows));

    let s = &result.summary;
    println!();
    println!(
        "{} line(s): {} direct, {} mapped, {} unmatched, {} short of stock",
        s.total_lines, s.direct, s.mapped, s.unmatched, s.insufficient
    );
    if result.meta.multiplier != 1 {
        println!("quantities multiplied by {}", result.meta.multiplier);
    }

    let unmatched = result.unmatched_values();
    if !unmatched.is_empty() {
        println!("unmatched: {}", unmatched.join(", "));
    }
}
