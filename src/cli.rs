use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Import model-evaluation CSV files and summarise them by dataset family",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import a CSV file into the summary store (skipped when unchanged)
    Import(ImportArgs),
    /// Print the table definition inferred from a CSV file
    Schema(SchemaArgs),
    /// Print the per-family averaged summary of the stored table
    Summary(SummaryArgs),
    /// Serve the summary page over HTTP
    Serve(ServeArgs),
    /// Append a column of random scores (0-100) to a CSV file
    AddColumn(AddColumnArgs),
}

/// Options shared by every command that reads the configuration.
#[derive(Debug, Args, Clone, Default)]
pub struct ConfigArgs {
    /// YAML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Number of data rows to sample for type inference (0 means full scan)
    #[arg(long)]
    pub sample_rows: Option<usize>,
    /// Keep CJK characters in normalized column names
    #[arg(long)]
    pub preserve_script: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Source CSV file
    pub csv: Option<PathBuf>,
    /// Target table name
    pub table: Option<String>,
    /// SQLite store file
    pub store: Option<PathBuf>,
    /// Reimport even when the CSV content is unchanged
    #[arg(short, long)]
    pub force: bool,
    /// Keep the freshness marker after the command finishes
    #[arg(long)]
    pub keep_marker: bool,
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Source CSV file
    pub csv: Option<PathBuf>,
    /// Target table name
    pub table: Option<String>,
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// SQLite store file
    #[arg(short, long)]
    pub store: Option<PathBuf>,
    /// Table to summarise
    #[arg(short, long)]
    pub table: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    pub format: SummaryFormat,
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    Text,
    Html,
    Json,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(short, long)]
    pub bind: Option<String>,
    /// Source CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// SQLite store file
    #[arg(long)]
    pub store: Option<PathBuf>,
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Args)]
pub struct AddColumnArgs {
    /// CSV file to rewrite in place
    pub csv: PathBuf,
    /// Header of the new column
    pub name: String,
}
