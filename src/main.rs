use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::*;

use redprobe::cli::Cli;
use redprobe::output::{report_line, OutputWriter, ScanSummary};
use redprobe::probe::{self, PoolConfig, RespClient, TaskQueue};
use redprobe::target::{parse_target, read_target_file, Target};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    let writer = OutputWriter::new(cli.output_format, cli.output_file.clone());
    let targets = resolve_targets(&cli);

    if targets.is_empty() {
        eprintln!("{}", "[!] no valid targets".red());
        std::process::exit(1);
    }

    let config = PoolConfig {
        workers: cli.threads,
        timeout: Duration::from_secs(cli.timeout),
        target_version: cli.match_version.clone(),
    };
    let workers = config.effective_workers(targets.len());
    eprintln!(
        "{} probing {} targets with {} workers (matching {})",
        "[*]".cyan().bold(),
        targets.len(),
        workers,
        config.target_version
    );

    let queue = Arc::new(TaskQueue::from_targets(targets));
    let live = writer.live();
    let start_time = chrono::Utc::now();

    let reports = probe::run(queue.clone(), Arc::new(RespClient), config.clone(), |report| {
        if live {
            println!("{}", report_line(report));
        }
    })
    .await;

    let summary = ScanSummary {
        target_version: config.target_version,
        total_targets: queue.len(),
        workers,
        start_time,
        end_time: chrono::Utc::now(),
        reports,
    };
    writer.write(&summary)?;

    Ok(())
}

/// Resolve the single target or the batch file into descriptors. Unusable
/// input (bad single target, missing file, nothing parseable) is fatal;
/// bad lines inside a batch are reported and skipped.
fn resolve_targets(cli: &Cli) -> Vec<Target> {
    if let Some(raw) = &cli.target {
        match parse_target(raw) {
            Ok(target) => vec![target],
            Err(err) => {
                eprintln!("{} {}", "[!]".red(), err);
                std::process::exit(1);
            }
        }
    } else if let Some(path) = &cli.list {
        match read_target_file(path) {
            Ok((targets, failures)) => {
                for failure in &failures {
                    eprintln!("{} line {}: {}", "[!]".red(), failure.line, failure.error);
                }
                targets
            }
            Err(err) => {
                eprintln!("{} {err:#}", "[!]".red());
                std::process::exit(1);
            }
        }
    } else {
        // clap's ArgGroup guarantees one of the two is present.
        unreachable!("clap enforces --target xor --list")
    }
}
