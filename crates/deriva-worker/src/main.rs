//! Derivative worker binary
//!
//! Reads storage-finalize notifications as newline-delimited JSON on stdin and
//! runs each one through every category pipeline.

use anyhow::Context;
use deriva_core::{Config, ErrorMetadata, UploadEvent};
use deriva_storage::{create_storage, Storage};
use deriva_worker::pipeline::Outcome;
use deriva_worker::telemetry::init_tracing;
use deriva_worker::{wait_for_slot, EventDispatcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(config.log_format()).context("Failed to initialize tracing")?;

    tracing::info!(
        environment = %config.environment(),
        max_concurrent_jobs = config.max_concurrent_jobs(),
        job_timeout_secs = config.job_timeout_secs(),
        scratch_dir = %config.scratch_dir().display(),
        "Starting deriva worker"
    );

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;

    tracing::info!(backend = %storage.backend_type(), "Storage backend ready");

    let dispatcher = EventDispatcher::from_config(&config, storage.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut jobs = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read notification")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let event = match parse_event(&line, storage.as_ref()).await {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring malformed notification");
                        continue;
                    }
                };

                wait_for_slot(&mut jobs, config.max_concurrent_jobs()).await;
                let dispatcher = dispatcher.clone();
                jobs.spawn(async move { report(dispatcher.dispatch(event).await) });
            }
            Some(joined) = jobs.join_next(), if !jobs.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Dispatch task panicked");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, no new notifications will be read");
                break;
            }
        }
    }

    while let Some(joined) = jobs.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Dispatch task panicked");
        }
    }

    tracing::info!("Deriva worker stopped");
    Ok(())
}

/// Decode one notification, completing a missing content type from the stored object.
async fn parse_event(line: &str, storage: &dyn Storage) -> anyhow::Result<UploadEvent> {
    let mut event: UploadEvent =
        serde_json::from_str(line).context("Notification is not a valid upload event")?;

    if event.content_type.is_empty() && !event.object_path.is_empty() {
        match storage.head(&event.object_path).await {
            Ok(info) => {
                event.content_type = info.content_type.unwrap_or_default();
                for (key, value) in info.metadata {
                    event.custom_metadata.entry(key).or_insert(value);
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %event.object_path,
                    error = %e,
                    "Could not read object attributes for notification"
                );
            }
        }
    }

    Ok(event)
}

fn report(reports: Vec<deriva_worker::JobReport>) {
    for report in reports {
        match report.result {
            Ok(Outcome::Completed(receipts)) => tracing::debug!(
                category = %report.category,
                artifacts = receipts.len(),
                "Job completed"
            ),
            Ok(Outcome::Skipped(_)) => {}
            Err(e) => tracing::debug!(
                category = %report.category,
                error_code = e.error_code(),
                recoverable = e.is_recoverable(),
                "Job failed"
            ),
        }
    }
}
