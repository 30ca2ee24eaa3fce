use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sqlcheck",
    version,
    about = "Asserts exact SQL result sets against SQLite database snapshots"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// tracing filter directive, e.g. `info` or `sqlcheck_core=debug`
    #[arg(long, global = true, env = "SQLCHECK_LOG", default_value = "warn")]
    pub log_level: String,

    /// log line format on stderr: text|json
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a suite against its snapshot
    Run(RunArgs),
    /// Check a suite config without running queries
    Validate(ValidateArgs),
    /// Write a sample suite config
    Init(InitArgs),
    /// Show stored results of recent runs
    History(HistoryArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = "sqlcheck.yaml")]
    pub config: PathBuf,

    #[arg(long, default_value = ".sqlcheck/history.db")]
    pub db: PathBuf,

    /// JUnit XML report path
    #[arg(long)]
    pub junit: Option<PathBuf>,

    /// JSON run artifact path
    #[arg(long, default_value = "run.json")]
    pub json: PathBuf,

    /// only scenarios whose id contains this substring
    #[arg(long)]
    pub filter: Option<String>,

    /// only scenarios carrying this tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// execute each query N times and require identical results
    #[arg(long)]
    pub repeat: Option<u32>,

    /// unknown config fields are errors instead of warnings
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = "sqlcheck.yaml")]
    pub config: PathBuf,

    /// also compile every query against the snapshot
    #[arg(long)]
    pub check_queries: bool,

    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "sqlcheck.yaml")]
    pub config: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct HistoryArgs {
    #[arg(long, default_value = ".sqlcheck/history.db")]
    pub db: PathBuf,

    /// suite name as written in the config
    #[arg(long)]
    pub suite: String,

    /// number of recent runs to include
    #[arg(long, default_value_t = 5)]
    pub last: u32,

    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}
