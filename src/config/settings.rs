//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the QR login service.

use crate::origin::TrustPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration settings for the QR login service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server configuration
    pub server: ServerSettings,
    /// Referer/origin admission configuration
    pub admission: AdmissionSettings,
    /// Poll loop and outbound call timing
    pub polling: PollingSettings,
    /// Remote login provider endpoints and keys
    pub provider: ProviderSettings,
    /// Client session bookkeeping
    pub registry: RegistrySettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Development mode disables referer admission checks
    pub development: bool,
}

/// Trusted origins shared by admission control and the broadcaster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionSettings {
    /// Trusted origins; `*` trusts everything
    pub trust_origins: Vec<String>,
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Maximum number of poll ticks per session
    pub max_ticks: u32,
    /// Delay between poll ticks in milliseconds
    pub interval_ms: u64,
    /// Delay between the generate event and the first poll in milliseconds
    pub first_poll_delay_ms: u64,
    /// Upper bound for the challenge-generate call in seconds
    pub generate_timeout_secs: u64,
    /// Upper bound for the status-poll and fingerprint calls in seconds
    pub poll_timeout_secs: u64,
    /// Upper bound for the credential probe in seconds
    pub probe_timeout_secs: u64,
    /// Run the credential probe after a successful login
    pub validate_credential: bool,
}

/// Remote provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Base URL of the passport (login) API
    pub passport_base_url: String,
    /// Base URL of the general API (fingerprint, probe)
    pub api_base_url: String,
    /// App key used by the TV flow
    pub tv_appkey: String,
    /// App secret used to sign TV flow requests
    pub tv_appsec: String,
}

/// Session registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Sessions idle for longer than this are swept
    pub inactivity_timeout_secs: u64,
    /// How often the sweep runs
    pub sweep_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "::".to_string(),
            port: 3000,
            development: false,
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            max_ticks: 100,
            interval_ms: 2000,
            first_poll_delay_ms: 2000,
            generate_timeout_secs: 15,
            poll_timeout_secs: 10,
            probe_timeout_secs: 10,
            validate_credential: true,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            passport_base_url: "https://passport.bilibili.com".to_string(),
            api_base_url: "https://api.bilibili.com".to_string(),
            tv_appkey: crate::session::sign::TV_APPKEY.to_string(),
            tv_appsec: crate::session::sign::TV_APPSEC.to_string(),
        }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn first_poll_delay(&self) -> Duration {
        Duration::from_millis(self.first_poll_delay_ms)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl RegistrySettings {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl AdmissionSettings {
    /// Build the trust policy from the configured origin list
    pub fn trust_policy(&self) -> TrustPolicy {
        TrustPolicy::from_origins(self.trust_origins.iter().map(String::as_str))
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from environment variables on top of defaults
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::config(format!("Invalid config file {:?}: {}", path, e)))
    }

    /// Apply environment variable overrides
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| crate::Error::config(format!("Invalid port: {}", e)))?;
        }

        if let Some(development) = development_mode(
            std::env::var("QR_LOGIN_ENV").ok().as_deref(),
            std::env::var("NODE_ENV").ok().as_deref(),
        ) {
            self.server.development = development;
        }

        if let Ok(origins) = std::env::var("TRUST_ORIGIN") {
            self.admission.trust_origins = split_origin_list(&origins);
        }

        if let Some(debug) = env_flag("DEBUG") {
            self.logging.verbose = debug;
            if debug {
                self.logging.level = "debug".to_string();
            }
        }

        if let Some(probe) = env_flag("QR_LOGIN_PROBE") {
            self.polling.validate_credential = probe;
        }

        if let Ok(url) = std::env::var("QR_LOGIN_PASSPORT_URL") {
            self.provider.passport_base_url = url;
        }

        if let Ok(url) = std::env::var("QR_LOGIN_API_URL") {
            self.provider.api_base_url = url;
        }

        Ok(self)
    }

    /// Check that the settings describe a usable service
    pub fn validate(&self) -> crate::Result<()> {
        if self.polling.max_ticks == 0 {
            return Err(crate::Error::config("polling.max_ticks must be at least 1"));
        }

        if self.polling.generate_timeout_secs == 0
            || self.polling.poll_timeout_secs == 0
            || self.polling.probe_timeout_secs == 0
        {
            return Err(crate::Error::config("polling timeouts must be non-zero"));
        }

        for (name, value) in [
            ("provider.passport_base_url", &self.provider.passport_base_url),
            ("provider.api_base_url", &self.provider.api_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| crate::Error::config(format!("Invalid {}: {}", name, e)))?;
        }

        if self.provider.tv_appkey.is_empty() || self.provider.tv_appsec.is_empty() {
            return Err(crate::Error::config("TV app key and secret must be set"));
        }

        Ok(())
    }
}

/// Split a comma separated origin list, dropping blanks
pub fn split_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Development mode from the environment name; `QR_LOGIN_ENV` wins over
/// `NODE_ENV`
fn development_mode(qr_login_env: Option<&str>, node_env: Option<&str>) -> Option<bool> {
    qr_login_env
        .or(node_env)
        .map(|env| env.trim().eq_ignore_ascii_case("development"))
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"))
}
