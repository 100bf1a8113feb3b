//! Configuration module
//!
//! Environment-driven configuration for the derivative worker: storage
//! bootstrap, scratch space, concurrency and the job-timeout ceiling.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONCURRENT_JOBS: usize = 4;
const JOB_TIMEOUT_SECS: u64 = 540;

/// Console log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Derivative worker configuration
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub environment: String,
    pub log_format: LogFormat,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Job execution
    pub scratch_dir: PathBuf,
    pub max_concurrent_jobs: usize,
    pub job_timeout_secs: u64,
}

/// Application configuration (derivative worker).
#[derive(Clone, Debug)]
pub struct Config(pub Box<WorkerConfig>);

impl Config {
    fn as_worker(&self) -> &WorkerConfig {
        &self.0
    }

    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config(Box::new(WorkerConfig::from_lookup(lookup)?)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_worker().validate()
    }

    // Convenience getters
    pub fn environment(&self) -> &str {
        &self.as_worker().environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_worker().log_format
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.as_worker().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_worker().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_worker().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_worker().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_worker().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_worker().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_worker().local_storage_base_url.as_deref()
    }

    pub fn scratch_dir(&self) -> &std::path::Path {
        &self.as_worker().scratch_dir
    }

    pub fn max_concurrent_jobs(&self) -> usize {
        self.as_worker().max_concurrent_jobs
    }

    pub fn job_timeout_secs(&self) -> u64 {
        self.as_worker().job_timeout_secs
    }
}

impl WorkerConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let log_format = match lookup("LOG_FORMAT") {
            Some(s) => s.parse()?,
            None => LogFormat::default(),
        };

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(s) => Some(s.parse::<StorageBackend>()?),
            None => None,
        };

        Ok(WorkerConfig {
            environment,
            log_format,
            storage_backend,
            s3_bucket: lookup("S3_BUCKET"),
            s3_region: lookup("S3_REGION"),
            s3_endpoint: lookup("S3_ENDPOINT"),
            aws_region: lookup("AWS_REGION"),
            local_storage_path: lookup("LOCAL_STORAGE_PATH"),
            local_storage_base_url: lookup("LOCAL_STORAGE_BASE_URL"),
            scratch_dir: lookup("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            max_concurrent_jobs: lookup("WORKER_MAX_CONCURRENT_JOBS")
                .map(|s| s.parse::<usize>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("WORKER_MAX_CONCURRENT_JOBS must be a valid number"))?
                .unwrap_or(MAX_CONCURRENT_JOBS),
            job_timeout_secs: lookup("JOB_TIMEOUT_SECS")
                .map(|s| s.parse::<u64>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("JOB_TIMEOUT_SECS must be a valid number"))?
                .unwrap_or(JOB_TIMEOUT_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_concurrent_jobs == 0 {
            return Err(anyhow::anyhow!(
                "WORKER_MAX_CONCURRENT_JOBS must be at least 1"
            ));
        }

        if self.job_timeout_secs == 0 {
            return Err(anyhow::anyhow!("JOB_TIMEOUT_SECS must be at least 1"));
        }

        // Validate storage backend configuration
        let backend = self.storage_backend.unwrap_or(StorageBackend::S3);
        match backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
