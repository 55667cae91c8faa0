//! Configuration types for xhs-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration
///
/// Fields are organized into sub-configs:
/// - [`request`](RequestConfig) - outbound HTTP defaults (timeout, cookie, proxy, endpoints)
/// - [`retry`](RetryConfig) - attempt ceiling and pacing for remote calls
/// - [`walk`](WalkConfig) - listing pagination
/// - [`download`](DownloadConfig) - where media files land
/// - [`persistence`](PersistenceConfig) - record store location
/// - [`tasks`](TaskConfig) - task registry retention
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Outbound request defaults
    #[serde(default)]
    pub request: RequestConfig,

    /// Retry and pacing for remote calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Listing pagination
    #[serde(default)]
    pub walk: WalkConfig,

    /// Media download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Task registry retention
    #[serde(default)]
    pub tasks: TaskConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }
}

/// Outbound HTTP request configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestConfig {
    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Cookie used when a task does not supply one
    #[serde(default)]
    pub cookie: Option<String>,

    /// Proxy used when a task does not supply one (http(s)/socks5)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base URL of the listing API (default: "https://edith.xiaohongshu.com")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL of the web site used for canonical item links
    /// (default: "https://www.xiaohongshu.com")
    #[serde(default = "default_web_base_url")]
    pub web_base_url: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            cookie: None,
            proxy: None,
            api_base_url: default_api_base_url(),
            web_base_url: default_web_base_url(),
        }
    }
}

/// Retry configuration for transient failures
///
/// Attempts are paced by a fixed delay; there is no backoff growth and no jitter.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Total attempts per remote call, including the first (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts (default: 1000 ms)
    #[serde(default = "default_retry_delay", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub delay: Duration,

    /// Courtesy pause after every successful remote call (default: 1000 ms)
    #[serde(default = "default_courtesy_delay", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub courtesy_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
            courtesy_delay: default_courtesy_delay(),
        }
    }
}

/// Listing pagination configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WalkConfig {
    /// Items requested per page (default: 30)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Hard ceiling on page requests per walk (default: 500)
    ///
    /// Guards against listings that keep reporting more pages without the cursor
    /// making progress.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

/// Media download configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// File collision handling
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

/// What to do when a media file already exists at the target path
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileCollisionAction {
    /// Append " (1)", " (2)", ... to the file stem
    #[default]
    Rename,
    /// Replace the existing file
    Overwrite,
    /// Leave the existing file and report the URL as failed
    Skip,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./xhs-dl.db")
    #[serde(default = "default_database_path")]
    #[schema(value_type = String)]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Task registry configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskConfig {
    /// How long finished tasks stay queryable (default: 24 hours)
    #[serde(default = "default_retention", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub retention: Duration,

    /// How often the retention sweeper runs (default: 10 minutes)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5556)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

// Default value functions
fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/126.0.0.0 Safari/537.36"
        .to_string()
}

fn default_api_base_url() -> String {
    "https://edith.xiaohongshu.com".to_string()
}

fn default_web_base_url() -> String {
    "https://www.xiaohongshu.com".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_courtesy_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_page_size() -> u32 {
    30
}

fn default_max_pages() -> usize {
    500
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("xhs-dl.db")
}

fn default_retention() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5556))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for pacing delays)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.request.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.walk.page_size, 30);
        assert_eq!(config.walk.max_pages, 500);
        assert_eq!(config.download.file_collision, FileCollisionAction::Rename);
        assert_eq!(config.persistence.database_path, PathBuf::from("xhs-dl.db"));
        assert_eq!(config.tasks.retention, Duration::from_secs(86_400));
        assert!(config.server.api.swagger_ui);
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let json = r#"{
            "retry": { "max_attempts": 2, "delay": 250 },
            "request": { "proxy": "socks5://127.0.0.1:1080" },
            "download": { "file_collision": "skip" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.delay, Duration::from_millis(250));
        assert_eq!(config.retry.courtesy_delay, Duration::from_millis(1000));
        assert_eq!(
            config.request.proxy.as_deref(),
            Some("socks5://127.0.0.1:1080")
        );
        assert_eq!(config.request.api_base_url, "https://edith.xiaohongshu.com");
        assert_eq!(config.download.file_collision, FileCollisionAction::Skip);
    }

    #[test]
    fn test_round_trip_preserves_delays() {
        let mut config = Config::default();
        config.retry.courtesy_delay = Duration::from_millis(1500);
        config.tasks.sweep_interval = Duration::from_secs(30);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.retry.courtesy_delay, Duration::from_millis(1500));
        assert_eq!(parsed.tasks.sweep_interval, Duration::from_secs(30));
    }
}
