use clap::Parser;
use common::model::summary::ImportSummary;
use env_logger::Env;
use importer::config::ConfigArgs;
use importer::report::{render_error_table, render_summary};
use importer::{ImportError, ImportReport, ImportResult, Importer, SqliteProductStore};
use log::error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Imports products from a CSV file into the product database.
#[derive(Debug, Parser)]
#[command(name = "product-import", version)]
struct Cli {
    /// Path of the CSV file to import.
    csv_path: PathBuf,

    /// Test mode. Performs everything the normal import does, but does not
    /// write to the database.
    #[arg(long)]
    test: bool,

    /// Print up to 100 rejected rows after the summary.
    #[arg(long)]
    view_error: bool,

    /// Print the summary as JSON instead of text.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> ExitCode {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    println!("Product Import\n============");
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            println!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ImportResult<ExitCode> {
    check_source(&cli.csv_path)?;

    let database = cli.config.database.clone();
    let config = cli.config.into_config(cli.test)?;

    // Test mode never touches the store, so skip creating the database file.
    let mut store = if config.test_mode {
        println!("Test Mode - no writing rows in DB\n============");
        SqliteProductStore::open_in_memory()?
    } else {
        println!("Writing to DB");
        SqliteProductStore::open(&database)?
    };

    let mut importer = Importer::new(config.clone());
    match importer.import_file(&cli.csv_path, &mut store) {
        Ok(report) => {
            print_report(&report, cli.json, cli.view_error);
            if report.aborted.is_some() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Err(err) if err.is_empty_or_invalid() => {
            error!("{}", err);
            println!("File data is empty or invalid - {}", cli.csv_path.display());
            let summary = ImportSummary {
                test_mode: config.test_mode,
                ..ImportSummary::default()
            };
            print_summary(&summary, cli.json);
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err),
    }
}

fn check_source(path: &Path) -> ImportResult<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    if extension != "csv" {
        return Err(ImportError::BadExtension(extension.to_string()));
    }
    if !path.is_file() {
        return Err(ImportError::MissingFile(path.to_path_buf()));
    }
    Ok(())
}

fn print_report(report: &ImportReport, json: bool, view_error: bool) {
    print_summary(&report.summary(), json);

    let rejected = report.run.rejected_rows();
    if view_error && !rejected.is_empty() {
        println!("Error rows (first 100 lines): \n============");
        print!("{}", render_error_table(report.run.header().labels(), rejected));
    }
}

fn print_summary(summary: &ImportSummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(text) => println!("{}", text),
            Err(err) => error!("cannot encode summary: {}", err),
        }
    } else {
        print!("{}", render_summary(summary));
    }
}
