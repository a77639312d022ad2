//! Configuration types for the EduGenie client.
//!
//! The only environment-dependent input to the client is the backend base
//! URL. It is either given explicitly or derived from the deployment
//! environment and the platform the client runs on.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "edugenie.json";

/// Host the Android emulator uses to reach the development machine.
const ANDROID_EMULATOR_HOST: &str = "10.0.2.2";

/// Default port the backend listens on in development.
const fn default_backend_port() -> u16 {
    3000
}

/// Default request timeout in seconds.
const fn default_timeout_seconds() -> u32 {
    10
}

/// Default session file path.
fn default_session_file() -> String {
    ".edugenie/session.json".to_string()
}

/// Main configuration for the EduGenie client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Explicit backend URL. Overrides environment/platform selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,

    /// Platform the client runs on; selects the development host.
    #[serde(default)]
    pub platform: Platform,

    /// Port of the development backend.
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,

    /// LAN address of the development machine, used from physical devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lan_host: Option<String>,

    /// Backend URL used in production.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_url: Option<String>,

    /// Client-side timeout for a single request, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,

    /// Path of the durable session file.
    #[serde(default = "default_session_file")]
    pub session_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            environment: Environment::default(),
            platform: Platform::default(),
            backend_port: default_backend_port(),
            lan_host: None,
            production_url: None,
            timeout_seconds: default_timeout_seconds(),
            session_file: default_session_file(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `edugenie.json` in the current directory and falls back to
    /// defaults when it is absent.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            ClientError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `edugenie.json` inside `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ConfigParseError` if the file exists but is not
    /// valid JSON, and `ClientError::ConfigValidationError` if the values are
    /// inconsistent.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(ClientError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ClientError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// - `timeoutSeconds` and `backendPort` must be greater than 0
    /// - `sessionFile` must not be empty
    /// - `baseUrl` and `productionUrl`, when set, must be http(s) URLs
    /// - without `baseUrl`, production needs `productionUrl` and a physical
    ///   device in development needs `lanHost`
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(ClientError::config_validation(
                "timeoutSeconds must be greater than 0",
                "Set timeoutSeconds to at least 1 in your edugenie.json",
            ));
        }

        if self.backend_port == 0 {
            return Err(ClientError::config_validation(
                "backendPort must be greater than 0",
                "Set backendPort to the port your backend listens on (usually 3000)",
            ));
        }

        if self.session_file.trim().is_empty() {
            return Err(ClientError::config_validation(
                "sessionFile must not be empty",
                "Provide a writable path for sessionFile in your edugenie.json",
            ));
        }

        if let Some(url) = &self.base_url {
            check_http_url("baseUrl", url)?;
            return Ok(());
        }

        match self.environment {
            Environment::Production => match &self.production_url {
                Some(url) => check_http_url("productionUrl", url)?,
                None => {
                    return Err(ClientError::config_validation(
                        "productionUrl is required when environment is 'production'",
                        "Set productionUrl (or baseUrl) in your edugenie.json",
                    ));
                }
            },
            Environment::Development => {
                let lan_host_missing = self
                    .lan_host
                    .as_deref()
                    .map_or(true, |host| host.trim().is_empty());
                if self.platform == Platform::Device && lan_host_missing {
                    return Err(ClientError::config_validation(
                        "lanHost is required when platform is 'device'",
                        "Set lanHost to your computer's Wi-Fi IP address in your edugenie.json",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Resolves the backend base URL, without a trailing slash.
    ///
    /// Precedence: explicit `baseUrl`, then `productionUrl` in production,
    /// then the development host for the configured platform.
    #[must_use]
    pub fn resolve_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }

        if self.environment == Environment::Production {
            if let Some(url) = &self.production_url {
                return url.trim_end_matches('/').to_string();
            }
        }

        let host = match self.platform {
            Platform::Device => self.lan_host.as_deref().unwrap_or("localhost"),
            Platform::Android => ANDROID_EMULATOR_HOST,
            Platform::Ios | Platform::Web => "localhost",
        };
        format!("http://{host}:{}", self.backend_port)
    }

    /// Returns the request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_seconds))
    }
}

fn check_http_url(field: &str, url: &str) -> Result<()> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(parsed) => Err(ClientError::config_validation(
            format!("{field} must use http or https, got '{}'", parsed.scheme()),
            format!("Change {field} to an http:// or https:// URL"),
        )),
        Err(e) => Err(ClientError::config_validation(
            format!("{field} is not a valid URL: {e}"),
            format!("Set {field} to a full URL such as http://localhost:3000"),
        )),
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    /// Local development backend (default).
    #[default]
    Development,
    /// Hosted backend.
    Production,
}

impl Environment {
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid environment '{s}': expected one of 'development', 'production'"
            ))
        })
    }
}

impl Serialize for Environment {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Self::Development => "development",
            Self::Production => "production",
        };
        serializer.serialize_str(s)
    }
}

/// Platform the client runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
    /// Browser or desktop on the development machine (default).
    #[default]
    Web,
    /// iOS simulator; shares the host network.
    Ios,
    /// Android emulator; reaches the host through a fixed alias.
    Android,
    /// Physical device on the LAN.
    Device,
}

impl Platform {
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "web" => Some(Self::Web),
            "ios" => Some(Self::Ios),
            "android" => Some(Self::Android),
            "device" => Some(Self::Device),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid platform '{s}': expected one of 'web', 'ios', 'android', 'device'"
            ))
        })
    }
}

impl Serialize for Platform {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Self::Web => "web",
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Device => "device",
        };
        serializer.serialize_str(s)
    }
}
