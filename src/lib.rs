pub mod add_column;
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod freshness;
pub mod identifier;
pub mod infer;
pub mod io_utils;
pub mod load;
pub mod present;
pub mod schema;
pub mod server;
pub mod service;
pub mod store;
pub mod table;

use std::{env, sync::Arc, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, ConfigArgs, SummaryFormat},
    config::Settings,
    service::{EvalService, ImportOutcome},
    table::Align,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_evalboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Import(args) => handle_import(&args),
        Commands::Schema(args) => handle_schema(&args),
        Commands::Summary(args) => handle_summary(&args),
        Commands::Serve(args) => handle_serve(&args),
        Commands::AddColumn(args) => handle_add_column(&args),
    }
}

/// Settings file (if any) overridden by the shared command-line options.
fn resolve_settings(args: &ConfigArgs) -> Result<Settings> {
    let mut settings = Settings::load_or_default(args.config.as_deref())
        .with_context(|| format!("Loading settings from {:?}", args.config))?;
    if let Some(rows) = args.sample_rows {
        settings.sample_rows = rows;
    }
    if args.preserve_script {
        settings.preserve_script = true;
    }
    if let Some(label) = &args.input_encoding {
        settings.input_encoding = Some(label.clone());
    }
    debug!("Effective settings:\n{}", settings.to_yaml_string()?);
    Ok(settings)
}

fn handle_import(args: &cli::ImportArgs) -> Result<()> {
    let mut settings = resolve_settings(&args.config)?;
    if let Some(csv) = &args.csv {
        settings.csv_path = csv.clone();
    }
    if let Some(table) = &args.table {
        settings.table_name = table.clone();
    }
    if let Some(store) = &args.store {
        settings.store_path = store.clone();
    }
    if args.keep_marker {
        settings.clear_marker_on_exit = false;
    }
    let service = EvalService::new(settings)?;
    let outcome = service.import(args.force);
    service.finish();
    match outcome {
        ImportOutcome::Updated { .. } | ImportOutcome::Unchanged => {
            println!("{outcome}");
            Ok(())
        }
        ImportOutcome::MissingInput | ImportOutcome::Failed { .. } => bail!("{outcome}"),
    }
}

fn handle_schema(args: &cli::SchemaArgs) -> Result<()> {
    let mut settings = resolve_settings(&args.config)?;
    if let Some(csv) = &args.csv {
        settings.csv_path = csv.clone();
    }
    if let Some(table) = &args.table {
        settings.table_name = table.clone();
    }
    settings.validate()?;
    let schema = schema::build_schema(&settings.csv_path, &settings)
        .with_context(|| format!("Inferring schema from {:?}", settings.csv_path))?;
    info!(
        "Inferred {} metric column(s) from {:?}",
        schema.metrics.len(),
        settings.csv_path
    );
    println!("{}", schema.create_table_sql());
    println!();
    let headers = ["#", "column", "normalized", "type", "role"]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    table::print_table(&headers, &schema.describe_rows());
    Ok(())
}

fn handle_summary(args: &cli::SummaryArgs) -> Result<()> {
    let mut settings = resolve_settings(&args.config)?;
    if let Some(store) = &args.store {
        settings.store_path = store.clone();
    }
    if let Some(table) = &args.table {
        settings.table_name = table.clone();
    }
    let service = EvalService::new(settings)?;
    let summary = service
        .summary_data()
        .with_context(|| format!("Summarising {:?}", service.settings().store_path))?;
    let display = present::summary_table(&summary);
    match args.format {
        SummaryFormat::Text => {
            let aligns = (0..display.headers.len())
                .map(|idx| {
                    if idx < summary.identifier_count {
                        Align::Left
                    } else {
                        Align::Right
                    }
                })
                .collect::<Vec<_>>();
            print!(
                "{}",
                table::render_aligned(&display.headers, &display.rows, &aligns)
            );
        }
        SummaryFormat::Html => println!("{}", display.to_html()),
        SummaryFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&display).context("Serializing summary to JSON")?
        ),
    }
    info!(
        "{} row(s) in {} group(s)",
        summary.rows.len(),
        summary.group_starts().count()
    );
    Ok(())
}

fn handle_serve(args: &cli::ServeArgs) -> Result<()> {
    let mut settings = resolve_settings(&args.config)?;
    if let Some(bind) = &args.bind {
        settings.bind = bind.clone();
    }
    if let Some(csv) = &args.csv {
        settings.csv_path = csv.clone();
    }
    if let Some(store) = &args.store {
        settings.store_path = store.clone();
    }
    let bind = settings.bind.clone();
    let service = Arc::new(EvalService::new(settings)?);
    server::serve(service, &bind)
}

fn handle_add_column(args: &cli::AddColumnArgs) -> Result<()> {
    let mut rng = rand::thread_rng();
    let rows = add_column::add_random_column(&args.csv, &args.name, &mut rng)
        .with_context(|| format!("Adding column '{}' to {:?}", args.name, args.csv))?;
    println!(
        "Added column '{}' to {} row(s) (values {}-{})",
        args.name,
        rows,
        add_column::RANDOM_MIN,
        add_column::RANDOM_MAX
    );
    Ok(())
}
