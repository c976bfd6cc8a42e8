// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Validates the idler configuration at boot-up time.
//! Any invalid field results in a HardValidationError that prevents startup.
//! Values taken from the environment are layered over the file through
//! [`ConfigOverrides`] before validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::eligibility::DEFAULT_SCALE_LABEL;
use crate::error::{HardValidationError, IdlerError, IdlerResult};
use crate::types::InactivityWindow;

/// Raw gateway section as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawGatewayConfig {
    url: Option<String>,
    #[serde(default = "default_secret_mount_path")]
    secret_mount_path: String,
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,
}

impl Default for RawGatewayConfig {
    fn default() -> Self {
        Self {
            url: None,
            secret_mount_path: default_secret_mount_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_secret_mount_path() -> String {
    "/var/secrets/".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

/// Raw metric source section.
#[derive(Debug, Deserialize)]
struct RawMetricsConfig {
    #[serde(default = "default_metrics_url")]
    url: String,
    #[serde(default = "default_metric_name")]
    metric_name: String,
}

fn default_metrics_url() -> String {
    "http://gateway-metrics:8082/metrics".to_string()
}

fn default_metric_name() -> String {
    "gateway_function_invocation_total".to_string()
}

impl Default for RawMetricsConfig {
    fn default() -> Self {
        Self {
            url: default_metrics_url(),
            metric_name: default_metric_name(),
        }
    }
}

/// Raw idler section.
#[derive(Debug, Deserialize)]
struct RawIdlerConfig {
    #[serde(default = "default_inactivity_duration_secs")]
    inactivity_duration_secs: u64,
    #[serde(default = "default_reconcile_interval_secs")]
    reconcile_interval_secs: u64,
    #[serde(default = "default_scale_label")]
    scale_label: String,
    #[serde(default)]
    dry_run: bool,
    #[serde(default)]
    metrics_port: Option<u16>,
}

fn default_inactivity_duration_secs() -> u64 {
    300 // 5 minutes
}

fn default_reconcile_interval_secs() -> u64 {
    30
}

fn default_scale_label() -> String {
    DEFAULT_SCALE_LABEL.to_string()
}

impl Default for RawIdlerConfig {
    fn default() -> Self {
        Self {
            inactivity_duration_secs: default_inactivity_duration_secs(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            scale_label: default_scale_label(),
            dry_run: false,
            metrics_port: None,
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    gateway: Option<RawGatewayConfig>,
    #[serde(default)]
    metrics: RawMetricsConfig,
    #[serde(default)]
    idler: RawIdlerConfig,
}

/// Validated gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL. Its path always ends with `/` so API paths join under it.
    pub url: Url,
    pub secret_mount_path: PathBuf,
    pub request_timeout: Duration,
}

/// Validated metric source configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub url: Url,
    pub metric_name: String,
}

/// Validated idler configuration.
#[derive(Debug, Clone)]
pub struct IdlerConfig {
    pub inactivity_window: InactivityWindow,
    pub reconcile_interval: Duration,
    pub scale_label: String,
    pub dry_run: bool,
    pub metrics_port: Option<u16>,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub metrics: MetricsConfig,
    pub idler: IdlerConfig,
}

/// Settings supplied outside the config file, usually from the environment.
///
/// Durations accept `humantime` strings such as `5m` or `90s`, or a bare
/// number of seconds.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub gateway_url: Option<String>,
    pub secret_mount_path: Option<String>,
    pub inactivity_duration: Option<String>,
    pub reconcile_interval: Option<String>,
}

impl ConfigOverrides {
    fn is_empty(&self) -> bool {
        self.gateway_url.is_none()
            && self.secret_mount_path.is_none()
            && self.inactivity_duration.is_none()
            && self.reconcile_interval.is_none()
    }

    fn apply(&self, raw: &mut RawConfig) -> Result<(), HardValidationError> {
        if self.gateway_url.is_some() || self.secret_mount_path.is_some() {
            let gateway = raw.gateway.get_or_insert_with(RawGatewayConfig::default);
            if let Some(url) = &self.gateway_url {
                gateway.url = Some(url.clone());
            }
            if let Some(path) = self.secret_mount_path.as_deref().filter(|p| !p.is_empty()) {
                gateway.secret_mount_path = path.to_string();
            }
        }

        if let Some(value) = &self.inactivity_duration {
            raw.idler.inactivity_duration_secs = parse_duration_secs("inactivity_duration", value)?;
        }
        if let Some(value) = &self.reconcile_interval {
            raw.idler.reconcile_interval_secs = parse_duration_secs("reconcile_interval", value)?;
        }
        Ok(())
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    /// Returns HardValidationError for any invalid fields.
    pub fn load_file(path: impl AsRef<Path>) -> IdlerResult<Config> {
        Self::load_file_with(path, &ConfigOverrides::default())
    }

    /// Load a YAML file and layer `overrides` over it.
    ///
    /// A missing file is accepted when overrides are present, so the idler
    /// can be configured from the environment alone.
    pub fn load_file_with(
        path: impl AsRef<Path>,
        overrides: &ConfigOverrides,
    ) -> IdlerResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            if overrides.is_empty() {
                return Err(IdlerError::ConfigNotFound {
                    path: path.to_path_buf(),
                });
            }
            tracing::debug!(path = %path.display(), "Config file not found, using overrides");
            return Self::load_string_with("{}", overrides);
        }

        let content = std::fs::read_to_string(path).map_err(|e| IdlerError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string_with(&content, overrides)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> IdlerResult<Config> {
        Self::load_string_with(content, &ConfigOverrides::default())
    }

    /// Load a YAML string and layer `overrides` over it.
    pub fn load_string_with(content: &str, overrides: &ConfigOverrides) -> IdlerResult<Config> {
        let mut raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| IdlerError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        overrides.apply(&mut raw)?;
        Self::validate(raw)
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig) -> IdlerResult<Config> {
        let gateway = Self::validate_gateway(raw.gateway)?;
        let metrics = Self::validate_metrics(raw.metrics)?;
        let idler = Self::validate_idler(raw.idler)?;

        Ok(Config {
            gateway,
            metrics,
            idler,
        })
    }

    fn validate_gateway(raw: Option<RawGatewayConfig>) -> IdlerResult<GatewayConfig> {
        let raw = raw.ok_or_else(|| HardValidationError::MissingRequiredField {
            field: "gateway",
            context: "configuration root".to_string(),
        })?;

        let url = match raw.url {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => {
                return Err(HardValidationError::MissingRequiredField {
                    field: "url",
                    context: "gateway".to_string(),
                }
                .into())
            }
        };
        let mut url = validate_http_url("gateway.url", &url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        // Bounded so a stalled gateway cannot hold an evaluation forever
        if raw.request_timeout_ms == 0 || raw.request_timeout_ms > 60_000 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "request_timeout_ms",
                value: raw.request_timeout_ms.to_string(),
                reason: "Must be between 1 and 60000".to_string(),
            }
            .into());
        }

        Ok(GatewayConfig {
            url,
            secret_mount_path: PathBuf::from(raw.secret_mount_path),
            request_timeout: Duration::from_millis(raw.request_timeout_ms),
        })
    }

    fn validate_metrics(raw: RawMetricsConfig) -> IdlerResult<MetricsConfig> {
        let url = validate_http_url("metrics.url", raw.url.trim())?;

        let metric_name = raw.metric_name.trim().to_string();
        let valid_name = !metric_name.is_empty()
            && metric_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
        if !valid_name {
            return Err(HardValidationError::InvalidFieldValue {
                field: "metric_name",
                value: metric_name,
                reason: "Must be a non-empty Prometheus metric name".to_string(),
            }
            .into());
        }

        Ok(MetricsConfig { url, metric_name })
    }

    fn validate_idler(raw: RawIdlerConfig) -> IdlerResult<IdlerConfig> {
        let inactivity_window = InactivityWindow::from_secs(raw.inactivity_duration_secs)?;

        if raw.reconcile_interval_secs == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "reconcile_interval_secs",
                value: "0".to_string(),
                reason: "Reconcile interval must be greater than 0".to_string(),
            }
            .into());
        }

        if raw.scale_label.trim().is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "scale_label",
                value: raw.scale_label,
                reason: "Scale label cannot be empty".to_string(),
            }
            .into());
        }

        if raw.metrics_port == Some(0) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "metrics_port",
                value: "0".to_string(),
                reason: "Port 0 is reserved and cannot be used".to_string(),
            }
            .into());
        }

        Ok(IdlerConfig {
            inactivity_window,
            reconcile_interval: Duration::from_secs(raw.reconcile_interval_secs),
            scale_label: raw.scale_label.trim().to_string(),
            dry_run: raw.dry_run,
            metrics_port: raw.metrics_port,
        })
    }
}

fn validate_http_url(field: &'static str, value: &str) -> Result<Url, HardValidationError> {
    let invalid = |reason: String| HardValidationError::InvalidFieldValue {
        field,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(format!("Not a valid URL: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("Scheme must be http or https".to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host".to_string()));
    }

    Ok(url)
}

fn parse_duration_secs(field: &'static str, value: &str) -> Result<u64, HardValidationError> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(secs);
    }

    humantime::parse_duration(value)
        .map(|d| d.as_secs())
        .map_err(|e| HardValidationError::InvalidFieldValue {
            field,
            value: value.to_string(),
            reason: format!("Not a duration: {}", e),
        })
}
