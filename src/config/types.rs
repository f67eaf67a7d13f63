use serde::Deserialize;

/// Main configuration structure for coub-backup
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: Option<ServerConfig>,
    pub backup: BackupConfig,
}

/// Remote platform access configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the platform API, e.g. "https://coub.com"
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Captured request header block replayed on timeline requests
    #[serde(rename = "headers-file", default)]
    pub headers_file: Option<String>,
}

/// Metadata and blob store locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory where media blobs are written
    #[serde(rename = "blob-directory")]
    pub blob_directory: String,
}

/// Observability server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on, e.g. "127.0.0.1:8080"
    pub bind: String,
}

/// Which feeds to back up
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupConfig {
    /// Profiles whose channel timeline is backed up
    #[serde(default)]
    pub profiles: Vec<String>,

    /// Profiles whose like-list is backed up
    #[serde(default)]
    pub likes: Vec<String>,
}

fn default_base_url() -> String {
    "https://coub.com".to_string()
}

fn default_user_agent() -> String {
    format!("coub-backup/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    60
}
