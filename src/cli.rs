use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

use crate::probe::{DEFAULT_TARGET_VERSION, DEFAULT_TIMEOUT_SECS};

#[derive(Parser, Debug)]
#[command(name = "redprobe")]
#[command(version = "0.1.0")]
#[command(about = "Concurrent Redis version reconnaissance", long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["target", "list"])))]
pub struct Cli {
    #[arg(
        short = 't',
        long,
        help = "Single target: [http://|https://][[user:]password@]host[:port]"
    )]
    pub target: Option<String>,

    #[arg(
        short = 'l',
        long,
        value_name = "FILE",
        help = "Newline-delimited target list; blank lines and # comments are skipped"
    )]
    pub list: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = 50,
        help = "Concurrent workers (clamped to the number of parsed targets)"
    )]
    pub threads: usize,

    #[arg(
        long,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_name = "SECS",
        help = "Per-probe timeout applied to connect, auth and query"
    )]
    pub timeout: u64,

    #[arg(
        long,
        default_value = DEFAULT_TARGET_VERSION,
        value_name = "VERSION",
        help = "Version string to match against"
    )]
    pub match_version: String,

    #[arg(short = 'o', long, value_enum, default_value = "human", help = "Output format")]
    pub output_format: OutputFormat,

    #[arg(short = 'f', long, help = "Output file path")]
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    #[value(name = "human", help = "Human-readable output")]
    Human,
    #[value(name = "json", help = "JSON output")]
    Json,
}
