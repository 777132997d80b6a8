use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::utils::error::{EtpError, EtpResult};

/// Settings for the ETP session layer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Channel streaming defaults
    #[serde(default)]
    pub streaming: StreamingSettings,

    /// Logger settings
    #[serde(default)]
    pub logger: LoggerSettings,
}

/// Defaults for the channel streaming producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingSettings {
    /// Emission interval in milliseconds used until a consumer requests
    /// its own rate via the Start message
    #[serde(default = "default_max_message_rate_ms")]
    pub max_message_rate_ms: u64,

    /// Upper bound on data items carried by one ChannelData message
    #[serde(default = "default_max_data_items")]
    pub max_data_items: i32,

    /// Whether the producer advertises itself as a simple streamer
    #[serde(default = "default_simple_streamer")]
    pub simple_streamer: bool,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            max_message_rate_ms: default_max_message_rate_ms(),
            max_data_items: default_max_data_items(),
            simple_streamer: default_simple_streamer(),
        }
    }
}

/// Logger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path
    pub path: Option<String>,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            path: None,
        }
    }
}

fn default_max_message_rate_ms() -> u64 {
    1000
}

fn default_max_data_items() -> i32 {
    1000
}

fn default_simple_streamer() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load settings from a YAML file
pub fn load_settings<P: AsRef<Path>>(path: P) -> EtpResult<Settings> {
    let mut file = File::open(path)
        .map_err(|e| EtpError::Config(format!("Failed to open config file: {}", e)))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| EtpError::Config(format!("Failed to read config file: {}", e)))?;

    let settings: Settings = serde_yaml::from_str(&contents)
        .map_err(|e| EtpError::Config(format!("Failed to parse config file: {}", e)))?;

    Ok(settings)
}

/// Get settings, optionally from a specific file
pub fn get_settings(config_path: Option<&str>) -> EtpResult<Settings> {
    match config_path {
        Some(path) => load_settings(path),
        None => {
            // Try to find config file in common locations
            let default_paths = vec![
                "etp_session.config.yaml",
                "config/etp_session.config.yaml",
            ];

            for path in default_paths {
                if Path::new(path).exists() {
                    return load_settings(path);
                }
            }

            Ok(Settings::default())
        }
    }
}
