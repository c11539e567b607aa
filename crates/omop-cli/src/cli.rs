//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "omop",
    version,
    about = "Transform source extracts into OMOP CDM 5.4 tables",
    long_about = "Transform per-domain CSV extracts into OMOP CDM 5.4 tables.\n\n\
                  Source codes are resolved against an OMOP vocabulary export;\n\
                  rows breaking CDM invariants are quarantined or abort the table."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow source values (codes, dates) to appear in debug logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the pipeline described by a manifest.
    Run(RunArgs),

    /// List the supported CDM tables and their columns.
    Tables,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the run manifest.
    #[arg(long = "config", short = 'c', value_name = "PATH", default_value = "omop.toml")]
    pub config: PathBuf,

    /// Output directory (overrides the manifest).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Abort a table on the first broken invariant instead of quarantining rows.
    #[arg(long = "strict")]
    pub strict: bool,

    /// Run and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
