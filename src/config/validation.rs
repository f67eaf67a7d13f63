use crate::config::types::{BackupConfig, Config, RemoteConfig, ServerConfig, StorageConfig};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_remote_config(&config.remote)?;
    validate_storage_config(&config.storage)?;
    if let Some(server) = &config.server {
        validate_server_config(server)?;
    }
    validate_backup_config(&config.backup)?;
    Ok(())
}

/// Validates remote platform configuration
fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 600 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 600, got {}",
            config.timeout_secs
        )));
    }

    if let Some(path) = &config.headers_file {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "headers-file cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.blob_directory.is_empty() {
        return Err(ConfigError::Validation(
            "blob-directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid server bind '{}': {}", config.bind, e))
    })?;
    Ok(())
}

/// Validates the list of feeds to back up
fn validate_backup_config(config: &BackupConfig) -> Result<(), ConfigError> {
    if config.profiles.is_empty() && config.likes.is_empty() {
        return Err(ConfigError::Validation(
            "at least one entry in backup.profiles or backup.likes is required".to_string(),
        ));
    }

    for profile in config.profiles.iter().chain(config.likes.iter()) {
        validate_profile_name(profile)?;
    }

    Ok(())
}

/// Profile names end up in URL paths, so only permalink characters are allowed
fn validate_profile_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "profile name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ConfigError::Validation(format!(
            "profile '{}' must contain only alphanumerics, '-', '_' or '.'",
            name
        )));
    }

    Ok(())
}
