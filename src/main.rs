mod config;
mod csv_source;
mod db;
mod error;
mod importer;
mod ipc;
mod record;
mod summary;

use anyhow::Context;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::importer::Importer;
use crate::summary::Section;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bulk inventory importer for WORKMANAGER", long_about = None)]
struct Args {
    /// JSON document to import (a CSV file when --csv is given)
    file: Option<PathBuf>,

    /// Treat FILE as CSV rows for one section, e.g. equipos_individuales
    #[arg(long, value_name = "SECTION")]
    csv: Option<String>,

    /// SQLite database path, overrides the config file and environment
    #[arg(long)]
    db: Option<PathBuf>,

    /// Config file (toml, json or yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Answer newline-delimited JSON requests on stdin instead of importing once
    #[arg(long, conflicts_with_all = ["file", "csv"])]
    sidecar: bool,
}

fn main() -> ExitCode {
    // stdout carries the summary (or sidecar responses); logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "import failed");
            println!("Import failed: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = ImportConfig::load(args.config.as_deref(), args.db.as_deref())
        .map_err(ImportError::from)?;

    if args.sidecar {
        return run_sidecar(config);
    }

    let Some(file) = args.file else {
        anyhow::bail!("Usage: workmanager-import [--csv <SECTION>] <json_file>");
    };

    let outcome = match args.csv.as_deref() {
        Some(kind) => {
            let section = Section::from_key(kind)
                .filter(|s| *s != Section::InventarioGeneral)
                .ok_or_else(|| ImportError::UnknownSection(kind.to_string()))?;
            let records = csv_source::read_csv_records(&file)?;
            let conn = open_store(&config)?;
            Importer::new(&conn, &config).import_section(&file, section, &records)?
        }
        None => {
            let doc = importer::read_document(&file)?;
            let conn = open_store(&config)?;
            Importer::new(&conn, &config).import_parsed(&file, &doc)?
        }
    };

    println!("Import completed successfully!");
    println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    Ok(())
}

fn open_store(config: &ImportConfig) -> anyhow::Result<rusqlite::Connection> {
    db::open_db(&config.database_path).with_context(|| {
        format!(
            "failed to open database {}",
            config.database_path.to_string_lossy()
        )
    })
}

fn run_sidecar(config: ImportConfig) -> anyhow::Result<()> {
    let conn = open_store(&config)?;
    info!(db = %config.database_path.display(), "sidecar ready");
    let mut state = ipc::AppState::new(config, conn);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
