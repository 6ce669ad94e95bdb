pub mod client;
pub mod outcome;
pub mod queue;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::debug;

pub use client::{ClientError, InfoClient, RespClient, ServerInfo};
pub use outcome::{Outcome, ProbeReport, UnreachableCause};
pub use queue::TaskQueue;

use crate::target::Target;

/// Version string the tool is hunting for, unless overridden on the CLI.
pub const DEFAULT_TARGET_VERSION: &str = "8.2.1";

/// Per-probe timeout applied uniformly to connect, auth and query.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub timeout: Duration,
    pub target_version: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            target_version: DEFAULT_TARGET_VERSION.to_string(),
        }
    }
}

impl PoolConfig {
    /// Pool size actually spawned: never more workers than queued targets.
    pub fn effective_workers(&self, queued: usize) -> usize {
        self.workers.min(queued).max(1)
    }
}

/// Probe one target and classify the result. Every failure category is
/// converted into an `Outcome` here; nothing propagates past this function.
pub async fn probe(client: &dyn InfoClient, target: &Target, config: &PoolConfig) -> Outcome {
    match client.fetch_info(target, config.timeout).await {
        Ok(info) => {
            if info.version == config.target_version {
                Outcome::MatchedTarget {
                    version: info.version,
                }
            } else {
                Outcome::OtherVersion {
                    version: info.version,
                    build_id: info.build_id,
                }
            }
        }
        Err(ClientError::Auth) => Outcome::AuthRequired,
        Err(ClientError::Timeout) => Outcome::Unreachable {
            cause: UnreachableCause::Timeout,
        },
        Err(ClientError::Refused) => Outcome::Unreachable {
            cause: UnreachableCause::Refused,
        },
        Err(ClientError::Protocol(message)) => Outcome::UnexpectedError { message },
    }
}

/// Drain the queue with a bounded pool of workers.
///
/// Spawns `min(workers, queue.len())` tasks; each loops dequeue → probe →
/// emit → mark_done until the queue is empty. `on_report` fires once per
/// report as it arrives, in completion order. Blocks until the queue is
/// drained and every worker has exited, then returns all reports.
pub async fn run(
    queue: Arc<TaskQueue>,
    client: Arc<dyn InfoClient>,
    config: PoolConfig,
    on_report: impl Fn(&ProbeReport),
) -> Vec<ProbeReport> {
    let workers = config.effective_workers(queue.len());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let queue = queue.clone();
        let client = client.clone();
        let config = config.clone();
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            while let Some(target) = queue.try_dequeue() {
                debug!(worker_id, host = %target.host, port = target.port, "probing");
                let outcome = probe(client.as_ref(), &target, &config).await;
                let report = ProbeReport::new(&target, outcome);
                // Receiver outlives the workers; a send failure only means
                // the caller went away, and the queue must still drain.
                let _ = tx.send(report);
                queue.mark_done();
            }
            debug!(worker_id, "queue empty, worker exiting");
        }));
    }
    drop(tx);

    let mut reports = Vec::with_capacity(queue.len());
    while let Some(report) = rx.recv().await {
        on_report(&report);
        reports.push(report);
    }

    queue.wait_until_drained().await;
    join_all(handles).await;
    reports
}
