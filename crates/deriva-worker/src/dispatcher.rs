//! Event dispatcher
//!
//! Every notification goes to every registered category pipeline, the way
//! several jobs subscribed to one bucket would each receive it. Concurrency is
//! bounded by a semaphore shared across events, and each job runs under the
//! timeout ceiling.

use std::sync::Arc;
use std::time::Duration;

use deriva_core::{Category, Config, PipelineError, PipelineResult, UploadEvent};
use deriva_storage::Storage;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::pipeline::{CategoryConfig, DerivativePipeline, Outcome};

/// Result of one category's job for one event.
#[derive(Debug)]
pub struct JobReport {
    pub category: Category,
    pub result: PipelineResult<Outcome>,
}

#[derive(Clone)]
pub struct EventDispatcher {
    pipelines: Arc<Vec<Arc<DerivativePipeline>>>,
    semaphore: Arc<Semaphore>,
    job_timeout: Duration,
}

impl EventDispatcher {
    pub fn new(
        pipelines: Vec<DerivativePipeline>,
        max_concurrent_jobs: usize,
        job_timeout: Duration,
    ) -> Self {
        Self {
            pipelines: Arc::new(pipelines.into_iter().map(Arc::new).collect()),
            semaphore: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            job_timeout,
        }
    }

    /// One pipeline per built-in category, sharing `storage`.
    pub fn from_config(config: &Config, storage: Arc<dyn Storage>) -> Self {
        let pipelines = Category::ALL
            .into_iter()
            .map(|category| {
                DerivativePipeline::new(
                    CategoryConfig::for_category(category),
                    storage.clone(),
                    config.scratch_dir(),
                )
            })
            .collect();

        Self::new(
            pipelines,
            config.max_concurrent_jobs(),
            Duration::from_secs(config.job_timeout_secs()),
        )
    }

    pub fn categories(&self) -> Vec<Category> {
        self.pipelines.iter().map(|p| p.category()).collect()
    }

    /// Run `event` through every pipeline and wait for all of them.
    ///
    /// Reports come back in registration order.
    pub async fn dispatch(&self, event: UploadEvent) -> Vec<JobReport> {
        let event = Arc::new(event);

        let handles: Vec<_> = self
            .pipelines
            .iter()
            .map(|pipeline| {
                let pipeline = Arc::clone(pipeline);
                let event = Arc::clone(&event);
                let semaphore = Arc::clone(&self.semaphore);
                let job_timeout = self.job_timeout;

                let category = pipeline.category();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| PipelineError::Internal(format!("Worker pool closed: {}", e)))?;

                    match tokio::time::timeout(job_timeout, pipeline.handle(&event)).await {
                        Ok(result) => result,
                        Err(_) => {
                            tracing::error!(
                                category = %pipeline.category(),
                                path = %event.object_path,
                                timeout_seconds = job_timeout.as_secs(),
                                "Derivative job timed out"
                            );
                            Err(PipelineError::Timeout {
                                seconds: job_timeout.as_secs(),
                            })
                        }
                    }
                });
                (category, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (category, handle) in handles {
            let result = handle.await.unwrap_or_else(|e| {
                Err(PipelineError::Internal(format!("Job task failed: {}", e)))
            });
            reports.push(JobReport { category, result });
        }
        reports
    }
}

/// Wait until fewer than `limit` tasks are in flight in `jobs`.
pub async fn wait_for_slot(jobs: &mut JoinSet<()>, limit: usize) {
    while jobs.len() >= limit.max(1) {
        match jobs.join_next().await {
            Some(Err(e)) => tracing::error!(error = %e, "Dispatch task panicked"),
            Some(Ok(())) => {}
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_slot_caps_in_flight_tasks() {
        let mut jobs = JoinSet::new();
        for ms in [10u64, 20, 30] {
            jobs.spawn(async move { tokio::time::sleep(Duration::from_millis(ms)).await });
        }

        wait_for_slot(&mut jobs, 2).await;
        assert!(jobs.len() < 2);

        wait_for_slot(&mut jobs, 2).await;
        assert!(jobs.len() < 2);
    }

    #[tokio::test]
    async fn test_wait_for_slot_returns_at_once_below_limit() {
        let mut jobs = JoinSet::new();
        jobs.spawn(async { tokio::time::sleep(Duration::from_secs(30)).await });

        tokio::time::timeout(Duration::from_secs(1), wait_for_slot(&mut jobs, 4))
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);

        // Zero is treated as one slot.
        jobs.abort_all();
        while jobs.join_next().await.is_some() {}
        wait_for_slot(&mut jobs, 0).await;
        assert!(jobs.is_empty());
    }
}
