// Layered configuration (default.toml -> local.toml -> APP__ env), following
// the layered `config` crate setup used across this workspace. `PipelineConfig`
// is carved out of `Settings` as a plain value object injected into the
// Orchestrator and Worker Pool instead of reading feature flags from the
// environment inline.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub nats: NatsConfig,
    pub minio: MinioConfig,
    pub pipeline: PipelineConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    pub url: String,
    pub stream_name: String,
    pub consumer_name: String,
    pub dlq_stream_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinioConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

/// Feature flags for the extraction pipeline, assembled once at startup
/// and injected into the Orchestrator / Worker Pool rather than read from
/// the environment inline inside business logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub structured_enabled: bool,
    pub hybrid_enabled: bool,
    pub vision_fallback_enabled: bool,
    pub validate_output: bool,
    pub worker_concurrency: u32,
    pub max_retries: i32,
    pub visibility_timeout_secs: u64,
    pub long_poll_secs: u64,
    pub backend_timeout_secs: u64,
}

impl PipelineConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn long_poll(&self) -> Duration {
        Duration::from_secs(self.long_poll_secs)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            structured_enabled: true,
            hybrid_enabled: true,
            vision_fallback_enabled: true,
            validate_output: true,
            worker_concurrency: 5,
            max_retries: 3,
            visibility_timeout_secs: 300,
            long_poll_secs: 20,
            backend_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_port: u16,
}

impl Settings {
    /// Load configuration with layered precedence: defaults -> file -> env.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }
        if self.server.max_upload_bytes <= 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }
        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.nats.url.is_empty() {
            return Err("NATS URL cannot be empty".to_string());
        }
        if self.nats.stream_name.is_empty() {
            return Err("NATS stream_name cannot be empty".to_string());
        }
        if self.minio.endpoint.is_empty() {
            return Err("MinIO endpoint cannot be empty".to_string());
        }
        if self.minio.bucket.is_empty() {
            return Err("MinIO bucket cannot be empty".to_string());
        }
        if self.pipeline.worker_concurrency == 0 {
            return Err("worker_concurrency must be greater than 0".to_string());
        }
        if self.pipeline.max_retries <= 0 {
            return Err("max_retries must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                max_upload_bytes: 10 * 1024 * 1024, // 10 MiB
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/timetable_extraction".to_string(),
                max_connections: 10,
                min_connections: 2,
                connect_timeout_seconds: 30,
            },
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                stream_name: "TIMETABLE_JOBS".to_string(),
                consumer_name: "timetable-workers".to_string(),
                dlq_stream_name: "TIMETABLE_JOBS_DLQ".to_string(),
            },
            minio: MinioConfig {
                endpoint: "http://localhost:9000".to_string(),
                access_key: "minioadmin".to_string(),
                secret_key: "minioadmin".to_string(),
                bucket: "timetable-extraction".to_string(),
                region: "us-east-1".to_string(),
            },
            pipeline: PipelineConfig::default(),
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: 9090,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validation_catches_empty_database_url() {
        let mut settings = Settings::default();
        settings.database.url = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validation_catches_zero_port() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn pipeline_config_durations() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.visibility_timeout().as_secs(), 300);
        assert_eq!(cfg.long_poll().as_secs(), 20);
    }
}
