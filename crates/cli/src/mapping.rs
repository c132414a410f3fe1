//! `stockmatch mapping`: alternative identifier mappings.

use clap::Subcommand;
use stockmatch_store::{filter_candidates, Backend};

use crate::exit_codes::{EXIT_DUPLICATE_MAPPING, EXIT_ERROR};
use crate::{print_json, util, CliError};

#[derive(Subcommand)]
pub enum MappingCommands {
    /// Map an alternative value onto a stock identifier
    #[command(after_help = "\
Examples:
  stockmatch mapping add A100 ALT-1")]
    Add {
        /// Stock identifier the alternative stands for
        original: String,
        /// Value as it appears in uploaded files
        alternative: String,
    },

    /// List mappings, most recent first
    List {
        #[arg(long)]
        json: bool,
    },

    /// Print the stock identifier an alternative value maps to
    Resolve { alternative: String },

    /// Delete a mapping by id
    Delete { id: i64 },

    /// Stock identifiers to choose from when creating a mapping
    #[command(after_help = "\
Examples:
  stockmatch mapping candidates
  stockmatch mapping candidates resist")]
    Candidates {
        /// Case-insensitive substring of identifier or package
        query: Option<String>,
    },
}

pub fn cmd_mapping(backend: &dyn Backend, cmd: MappingCommands) -> Result<(), CliError> {
    match cmd {
        MappingCommands::Add { original, alternative } => cmd_add(backend, &original, &alternative),
        MappingCommands::List { json } => cmd_list(backend, json),
        MappingCommands::Resolve { alternative } => cmd_resolve(backend, &alternative),
        MappingCommands::Delete { id } => {
            backend.delete_mapping(id)?;
            println!("Deleted mapping {}", id);
            Ok(())
        }
        MappingCommands::Candidates { query } => cmd_candidates(backend, query.as_deref().unwrap_or("")),
    }
}

fn cmd_add(backend: &dyn Backend, original: &str, alternative: &str) -> Result<(), CliError> {
    let known = backend.distinct_identifiers()?;
    if !known.iter().any(|k| k.trim() == original.trim()) {
        eprintln!("warning: '{}' is not a stock identifier; the mapping will not match until it is", original.trim());
    }

    if backend.create_mapping(original, alternative)? {
        println!("Mapped '{}' -> '{}'", alternative.trim(), original.trim());
        Ok(())
    } else {
        Err(CliError::new(
            EXIT_DUPLICATE_MAPPING,
            format!("mapping '{}' -> '{}' already exists", alternative.trim(), original.trim()),
        ))
    }
}

fn cmd_list(backend: &dyn Backend, json: bool) -> Result<(), CliError> {
    let mappings = backend.list_mappings()?;
    if json {
        return print_json(&mappings);
    }

    let headers = vec!["Id".to_string(), "Original".to_string(), "Alternative".to_string(), "Created".to_string()];
    let rows: Vec<Vec<String>> = mappings
        .iter()
        .map(|m| {
            vec![
                m.id.to_string(),
                m.original.clone(),
                m.alternative.clone(),
                m.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
        })
        .collect();
    print!("{}", util::render_table(&headers, &rows));
    Ok(())
}

fn cmd_resolve(backend: &dyn Backend, alternative: &str) -> Result<(), CliError> {
    match backend.resolve(alternative.trim())? {
        Some(original) => {
            println!("{}", original);
            Ok(())
        }
        None => Err(CliError::new(EXIT_ERROR, format!("no mapping for '{}'", alternative.trim()))),
    }
}

fn cmd_candidates(backend: &dyn Backend, query: &str) -> Result<(), CliError> {
    let pairs = backend.distinct_identifier_packages()?;
    let hits = filter_candidates(&pairs, query);

    let headers = vec!["Identifier".to_string(), "Package".to_string()];
    let rows: Vec<Vec<String>> = hits
        .iter()
        .map(|(kod, paket)| vec![kod.clone(), paket.clone().unwrap_or_default()])
        .collect();
    print!("{}", util::render_table(&headers, &rows));
    Ok(())
}
