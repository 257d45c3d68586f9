#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for relval
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.relval/relval.toml, generated on first run)
//! - Environment variables
//! - CLI flags

pub mod constants;

use relval_errors::{ConfigError, Error};
use relval_types::StatusCodeMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub status_codes: StatusCodesConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
    /// Base URL of the tarball catalog; listings live under it
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,
    /// Template for the results page, e.g. `http://host/$SESSIONTAG`
    #[serde(default = "default_results_url")]
    pub results_url: String,
    #[serde(default)]
    pub dry_run: bool,
}

/// Command and path templates used to drive a validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationConfig {
    #[serde(default = "default_unpack_dir")]
    pub unpack_dir: String,
    #[serde(default = "default_module_file")]
    pub module_file: String,
    #[serde(default = "default_unpack_cmd")]
    pub unpack_cmd: String,
    #[serde(default = "default_run_cmd")]
    pub run_cmd: String,
    #[serde(default = "default_status_cmd")]
    pub status_cmd: String,
}

/// Exit codes returned by the status command
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCodesConfig {
    #[serde(default = "default_code_running")]
    pub running: i32,
    #[serde(default = "default_code_not_running")]
    pub not_running: i32,
    #[serde(default = "default_code_done_ok")]
    pub done_ok: i32,
    #[serde(default = "default_code_done_fail")]
    pub done_fail: i32,
}

/// Notification mail configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailConfig {
    #[serde(default = "default_mail_enabled")]
    pub enabled: bool,
    #[serde(default = "default_mail_sender")]
    pub sender: String,
    #[serde(default = "default_mail_recipients")]
    pub recipients: Vec<String>,
    /// Command reading an RFC 5322 message on stdin
    #[serde(default = "default_mail_command")]
    pub command: String,
}

/// Single-instance lock configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockConfig {
    #[serde(default = "default_lock_attempts")]
    pub attempts: u32,
    #[serde(default = "default_lock_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            db_path: default_db_path(),
            pid_file: default_pid_file(),
            catalog_url: default_catalog_url(),
            results_url: default_results_url(),
            dry_run: false,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            unpack_dir: default_unpack_dir(),
            module_file: default_module_file(),
            unpack_cmd: default_unpack_cmd(),
            run_cmd: default_run_cmd(),
            status_cmd: default_status_cmd(),
        }
    }
}

impl Default for StatusCodesConfig {
    fn default() -> Self {
        Self {
            running: default_code_running(),
            not_running: default_code_not_running(),
            done_ok: default_code_done_ok(),
            done_fail: default_code_done_fail(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: default_mail_enabled(),
            sender: default_mail_sender(),
            recipients: default_mail_recipients(),
            command: default_mail_command(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            attempts: default_lock_attempts(),
            retry_delay_ms: default_lock_retry_delay_ms(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

// Default value functions for serde
fn default_log_dir() -> PathBuf {
    PathBuf::from(constants::LOG_DIR)
}

fn default_db_path() -> PathBuf {
    PathBuf::from(constants::DB_PATH)
}

fn default_pid_file() -> PathBuf {
    PathBuf::from(constants::PID_FILE)
}

fn default_catalog_url() -> String {
    constants::CATALOG_URL.to_string()
}

fn default_results_url() -> String {
    constants::RESULTS_URL.to_string()
}

fn default_unpack_dir() -> String {
    constants::UNPACK_DIR.to_string()
}

fn default_module_file() -> String {
    constants::MODULE_FILE.to_string()
}

fn default_unpack_cmd() -> String {
    constants::UNPACK_CMD.to_string()
}

fn default_run_cmd() -> String {
    constants::RUN_CMD.to_string()
}

fn default_status_cmd() -> String {
    constants::STATUS_CMD.to_string()
}

fn default_code_running() -> i32 {
    100
}

fn default_code_not_running() -> i32 {
    101
}

fn default_code_done_ok() -> i32 {
    102
}

fn default_code_done_fail() -> i32 {
    103
}

fn default_mail_enabled() -> bool {
    true
}

fn default_mail_sender() -> String {
    constants::MAIL_SENDER.to_string()
}

fn default_mail_recipients() -> Vec<String> {
    vec![
        "noreply1@localhost".to_string(),
        "noreply2@localhost".to_string(),
    ]
}

fn default_mail_command() -> String {
    constants::MAIL_COMMAND.to_string()
}

fn default_lock_attempts() -> u32 {
    10
}

fn default_lock_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1 // 1 second
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        Ok(expand_tilde(Path::new(constants::CONFIG_FILE))?)
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load the configuration, generating a default file on first run
    ///
    /// An explicit path must exist. When no path is given the default
    /// location is used and, if nothing is there yet, a file holding the
    /// default values is written so operators have a template to edit.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or created.
    pub async fn load_or_create(path: Option<&Path>) -> Result<Self, Error> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path).await;
        }

        let config_path = Self::default_path()?;
        if fs::try_exists(&config_path).await.unwrap_or(false) {
            Self::load_from_file(&config_path).await
        } else {
            tracing::warn!(
                path = %config_path.display(),
                "config file not found: generating default template"
            );
            let config = Self::default();
            config.write_to_file(&config_path).await?;
            Ok(config)
        }
    }

    /// Serialize this configuration to a TOML file, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem step fails.
    pub async fn write_to_file(&self, path: &Path) -> Result<(), Error> {
        let body = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            error: e.to_string(),
        })?;
        let contents = format!("# relval configuration, generated with default values\n\n{body}");

        let write_error = |e: std::io::Error| ConfigError::WriteError {
            path: path.display().to_string(),
            error: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        fs::write(path, contents).await.map_err(write_error)?;
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // RELVAL_DB_PATH
        if let Ok(db_path) = std::env::var("RELVAL_DB_PATH") {
            self.general.db_path = PathBuf::from(db_path);
        }

        // RELVAL_LOG_DIR
        if let Ok(log_dir) = std::env::var("RELVAL_LOG_DIR") {
            self.general.log_dir = PathBuf::from(log_dir);
        }

        // RELVAL_CATALOG_URL
        if let Ok(url) = std::env::var("RELVAL_CATALOG_URL") {
            if url.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "RELVAL_CATALOG_URL".to_string(),
                    value: url,
                }
                .into());
            }
            self.general.catalog_url = url;
        }

        // RELVAL_DRY_RUN
        if let Ok(dry_run) = std::env::var("RELVAL_DRY_RUN") {
            self.general.dry_run = match dry_run.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "RELVAL_DRY_RUN".to_string(),
                        value: dry_run,
                    }
                    .into())
                }
            };
        }

        Ok(())
    }

    /// Check values that serde cannot check on its own
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate status codes, an empty catalog URL or
    /// a lock configured with zero attempts.
    pub fn validate(&self) -> Result<(), Error> {
        self.status_code_map()?;
        if self.general.catalog_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "general.catalog_url".to_string(),
                value: self.general.catalog_url.clone(),
            }
            .into());
        }
        if self.lock.attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lock.attempts".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Status command exit code table
    ///
    /// # Errors
    ///
    /// Returns an error if two statuses share the same exit code.
    pub fn status_code_map(&self) -> Result<StatusCodeMap, ConfigError> {
        let codes = &self.status_codes;
        StatusCodeMap::new(
            codes.running,
            codes.not_running,
            codes.done_ok,
            codes.done_fail,
        )
    }

    /// Log directory with `~` expanded
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn log_dir(&self) -> Result<PathBuf, ConfigError> {
        expand_tilde(&self.general.log_dir)
    }

    /// Database path with `~` expanded
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        expand_tilde(&self.general.db_path)
    }

    /// Pid file path with `~` expanded
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn pid_file(&self) -> Result<PathBuf, ConfigError> {
        expand_tilde(&self.general.pid_file)
    }
}

/// Expand a leading `~` component to the home directory
///
/// # Errors
///
/// Returns `ConfigError::NoHomeDirectory` if the path needs the home
/// directory and it cannot be determined.
pub fn expand_tilde(path: &Path) -> Result<PathBuf, ConfigError> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_expansion() {
        let absolute = expand_tilde(Path::new("/var/lib/relval.sqlite")).unwrap();
        assert_eq!(absolute, PathBuf::from("/var/lib/relval.sqlite"));

        if let Some(home) = dirs::home_dir() {
            let expanded = expand_tilde(Path::new("~/.relval/pid")).unwrap();
            assert_eq!(expanded, home.join(".relval/pid"));
        }

        // `~user` is not the current home and is left alone
        let other = expand_tilde(Path::new("~other/pid")).unwrap();
        assert_eq!(other, PathBuf::from("~other/pid"));
    }

    #[test]
    fn default_status_codes_are_distinct() {
        let config = Config::default();
        let map = config.status_code_map().unwrap();
        assert_eq!(map.lookup(101).map(|s| s.name()), Some("NOT_RUNNING"));
        config.validate().unwrap();
    }

    #[test]
    fn zero_lock_attempts_is_invalid() {
        let mut config = Config::default();
        config.lock.attempts = 0;
        assert!(config.validate().is_err());
    }
}
