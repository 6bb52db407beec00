//! Command line definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "scriptbox",
    version,
    about = "Run HTTP collections with sandboxed pre-request and post-response scripts",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every request of a collection file, or of every collection in a directory
    Run(RunArgs),
    /// Run a single script stand-alone
    Exec(ExecArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Collection file (.yaml, .yml, .json) or directory of collection files
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Set a variable after the collection's own environment
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Script wall-clock limit in milliseconds
    #[arg(long, value_name = "MS", env = "SCRIPTBOX_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Script file to run
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Run as a post-response script against a synthetic response
    #[arg(long)]
    pub post: bool,

    /// Status of the synthetic response
    #[arg(long, default_value_t = 200, requires = "post")]
    pub status: u16,

    /// File holding the synthetic response body
    #[arg(long, value_name = "FILE", requires = "post")]
    pub body: Option<PathBuf>,

    /// Header of the synthetic response
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header, requires = "post")]
    pub headers: Vec<(String, String)>,

    /// Seed a variable before the script runs
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Script wall-clock limit in milliseconds
    #[arg(long, value_name = "MS", env = "SCRIPTBOX_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME:VALUE, got `{raw}`")),
    }
}
