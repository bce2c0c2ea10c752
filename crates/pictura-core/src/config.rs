//! Configuration module
//!
//! Settings are read from the environment (after loading an optional `.env`
//! file). Every setting except the database and queue locations has a default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    ALLOWED_CONTENT_TYPES, DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_MAX_IMAGE_HEIGHT,
    DEFAULT_MAX_IMAGE_WIDTH, DEFAULT_THUMBNAIL_QUALITY, MAX_FILE_SIZE_CEILING_MB,
};
use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 9002;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const QUEUE_WAIT_TIME_SECS: u64 = 20;
const QUEUE_VISIBILITY_TIMEOUT_SECS: u64 = 600;
const WORKER_CONCURRENCY: usize = 4;
const WORKER_MAX_ATTEMPTS: u32 = 5;
const STAGE_TIMEOUT_SECS: u64 = 120;
const SHUTDOWN_GRACE_SECS: u64 = 30;
/// Timed stages a job runs through: validate, promote, derive, persist.
const PIPELINE_STAGES: u64 = 4;

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_seconds: u64,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    // Custom endpoint for S3-compatible providers (MinIO, LocalStack, ...)
    pub s3_endpoint: Option<String>,
    pub local_path: Option<String>,
    pub local_base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub queue_url: String,
    pub dead_letter_queue_url: Option<String>,
    // Custom endpoint for SQS-compatible brokers (ElasticMQ, LocalStack, ...)
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub wait_time_secs: u64,
    pub visibility_timeout_secs: u64,
}

impl QueueConfig {
    /// Queue settings alone, for tools that only publish jobs.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(QueueConfig {
            queue_url: var("QUEUE_URL").ok_or_else(|| anyhow::anyhow!("QUEUE_URL must be set"))?,
            dead_letter_queue_url: var("DEAD_LETTER_QUEUE_URL"),
            endpoint: var("QUEUE_ENDPOINT"),
            region: var("AWS_REGION").or_else(|| var("S3_REGION")),
            wait_time_secs: parse_or(var("QUEUE_WAIT_TIME_SECS"), QUEUE_WAIT_TIME_SECS),
            visibility_timeout_secs: parse_or(
                var("QUEUE_VISIBILITY_TIMEOUT_SECS"),
                QUEUE_VISIBILITY_TIMEOUT_SECS,
            ),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.wait_time_secs > 20 {
            return Err(anyhow::anyhow!("QUEUE_WAIT_TIME_SECS cannot exceed 20"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    pub max_file_size_bytes: u64,
    pub max_image_width: u32,
    pub max_image_height: u32,
    pub allowed_content_types: Vec<String>,
    pub thumbnail_quality: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            max_image_width: DEFAULT_MAX_IMAGE_WIDTH,
            max_image_height: DEFAULT_MAX_IMAGE_HEIGHT,
            allowed_content_types: ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            thumbnail_quality: DEFAULT_THUMBNAIL_QUALITY,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub stage_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: WORKER_CONCURRENCY,
            max_attempts: WORKER_MAX_ATTEMPTS,
            stage_timeout: Duration::from_secs(STAGE_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(SHUTDOWN_GRACE_SECS),
        }
    }
}

/// Application configuration (ingestion worker).
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub server_port: u16,
    pub log_format: String,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub queue: QueueConfig,
    pub processing: ProcessingConfig,
    pub worker: WorkerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let database = DatabaseConfig {
            url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            max_connections: parse_or(var("DB_MAX_CONNECTIONS"), MAX_CONNECTIONS),
            timeout_seconds: parse_or(var("DB_TIMEOUT_SECONDS"), CONNECTION_TIMEOUT_SECS),
        };

        let backend = match var("STORAGE_BACKEND") {
            Some(s) => StorageBackend::from_str(&s)?,
            None => StorageBackend::S3,
        };

        let storage = StorageConfig {
            backend,
            s3_bucket: var("S3_BUCKET"),
            s3_region: var("S3_REGION").or_else(|| var("AWS_REGION")),
            s3_endpoint: var("S3_ENDPOINT"),
            local_path: var("LOCAL_STORAGE_PATH"),
            local_base_url: var("LOCAL_STORAGE_BASE_URL"),
        };

        let queue = QueueConfig::from_lookup(&lookup)?;

        let defaults = ProcessingConfig::default();
        let processing = ProcessingConfig {
            max_file_size_bytes: parse_or(var("MAX_FILE_SIZE_MB"), DEFAULT_MAX_FILE_SIZE_MB)
                .saturating_mul(1024 * 1024),
            max_image_width: parse_or(var("MAX_IMAGE_WIDTH"), DEFAULT_MAX_IMAGE_WIDTH),
            max_image_height: parse_or(var("MAX_IMAGE_HEIGHT"), DEFAULT_MAX_IMAGE_HEIGHT),
            allowed_content_types: var("ALLOWED_CONTENT_TYPES")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_content_types),
            thumbnail_quality: parse_or(var("THUMBNAIL_QUALITY"), DEFAULT_THUMBNAIL_QUALITY),
        };

        let worker = WorkerConfig {
            concurrency: parse_or(var("WORKER_CONCURRENCY"), WORKER_CONCURRENCY),
            max_attempts: parse_or(var("WORKER_MAX_ATTEMPTS"), WORKER_MAX_ATTEMPTS),
            stage_timeout: Duration::from_secs(parse_or(
                var("STAGE_TIMEOUT_SECS"),
                STAGE_TIMEOUT_SECS,
            )),
            shutdown_grace: Duration::from_secs(parse_or(
                var("SHUTDOWN_GRACE_SECS"),
                SHUTDOWN_GRACE_SECS,
            )),
        };

        Ok(Config {
            environment,
            server_port,
            log_format: var("LOG_FORMAT")
                .map(|s| s.to_lowercase())
                .unwrap_or_else(|| "text".to_string()),
            database,
            storage,
            queue,
            processing,
            worker,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET must be set for the s3 backend"));
                }
                if self.storage.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set for the s3 backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_path.is_none() || self.storage.local_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL must be set for the local backend"
                    ));
                }
            }
        }

        if self.worker.concurrency == 0 {
            return Err(anyhow::anyhow!("WORKER_CONCURRENCY must be at least 1"));
        }
        if self.worker.max_attempts == 0 {
            return Err(anyhow::anyhow!("WORKER_MAX_ATTEMPTS must be at least 1"));
        }
        if self.processing.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_CONTENT_TYPES must not be empty"));
        }
        if !(1..=100).contains(&self.processing.thumbnail_quality) {
            return Err(anyhow::anyhow!("THUMBNAIL_QUALITY must be between 1 and 100"));
        }
        let max_size = self.processing.max_file_size_bytes;
        if max_size == 0 || max_size > MAX_FILE_SIZE_CEILING_MB * 1024 * 1024 {
            return Err(anyhow::anyhow!(
                "MAX_FILE_SIZE_MB must be between 1 and {}",
                MAX_FILE_SIZE_CEILING_MB
            ));
        }

        self.queue.validate()?;
        // A job must finish every stage before SQS makes it visible again.
        let job_budget = self
            .worker
            .stage_timeout
            .as_secs()
            .saturating_mul(PIPELINE_STAGES);
        if self.queue.visibility_timeout_secs < job_budget {
            return Err(anyhow::anyhow!(
                "QUEUE_VISIBILITY_TIMEOUT_SECS ({}) must be at least {} x STAGE_TIMEOUT_SECS ({})",
                self.queue.visibility_timeout_secs,
                PIPELINE_STAGES,
                job_budget
            ));
        }

        Ok(())
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("DATABASE_URL", "postgres://localhost/pictura"),
        ("QUEUE_URL", "http://localhost:9324/000000000000/file_processing"),
        ("S3_BUCKET", "uploads"),
        ("S3_REGION", "eu-west-1"),
    ];

    #[test]
    fn defaults_match_pipeline_limits() {
        let config = config_from(&REQUIRED).unwrap();
        assert_eq!(config.processing.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.processing.max_image_width, 5000);
        assert_eq!(config.processing.max_image_height, 5000);
        assert_eq!(config.processing.allowed_content_types.len(), 4);
        assert_eq!(config.worker.concurrency, 4);
        assert_eq!(config.server_port, 9002);
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = config_from(&[("QUEUE_URL", "q")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("WORKER_CONCURRENCY", "16"),
            ("MAX_FILE_SIZE_MB", "2"),
            ("ALLOWED_CONTENT_TYPES", "image/png, IMAGE/JPEG"),
            ("STAGE_TIMEOUT_SECS", "5"),
        ]);
        let config = config_from(&vars).unwrap();
        assert_eq!(config.worker.concurrency, 16);
        assert_eq!(config.processing.max_file_size_bytes, 2 * 1024 * 1024);
        assert_eq!(
            config.processing.allowed_content_types,
            vec!["image/png".to_string(), "image/jpeg".to_string()]
        );
        assert_eq!(config.worker.stage_timeout, Duration::from_secs(5));
    }

    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("WORKER_MAX_ATTEMPTS", "many"));
        let config = config_from(&vars).unwrap();
        assert_eq!(config.worker.max_attempts, 5);
    }

    #[test]
    fn local_backend_requires_path_and_url() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/pictura"),
            ("QUEUE_URL", "q"),
            ("STORAGE_BACKEND", "local"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn visibility_timeout_must_cover_every_stage() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("STAGE_TIMEOUT_SECS", "120"),
            ("QUEUE_VISIBILITY_TIMEOUT_SECS", "300"),
        ]);
        let err = config_from(&vars).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("QUEUE_VISIBILITY_TIMEOUT_SECS"));

        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("STAGE_TIMEOUT_SECS", "120"),
            ("QUEUE_VISIBILITY_TIMEOUT_SECS", "480"),
        ]);
        assert!(config_from(&vars).unwrap().validate().is_ok());
    }

    #[test]
    fn huge_max_file_size_saturates_and_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("MAX_FILE_SIZE_MB", "18446744073709551615"));
        let config = config_from(&vars).unwrap();
        assert_eq!(config.processing.max_file_size_bytes, u64::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MAX_FILE_SIZE_MB"));
    }

    #[test]
    fn queue_config_needs_only_queue_settings() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("QUEUE_URL", "http://localhost:9324/000000000000/file_processing"),
            ("QUEUE_ENDPOINT", "http://localhost:9324"),
            ("AWS_REGION", "us-east-1"),
        ]);
        let queue = QueueConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(queue.endpoint.as_deref(), Some("http://localhost:9324"));
        assert_eq!(queue.wait_time_secs, 20);
        assert!(queue.validate().is_ok());

        let err = QueueConfig::from_lookup(|_| None).unwrap_err();
        assert!(err.to_string().contains("QUEUE_URL"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("WORKER_CONCURRENCY", "0"));
        let config = config_from(&vars).unwrap();
        assert!(config.validate().is_err());
    }
}
