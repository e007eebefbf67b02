use crate::clients::Credentials;
use crate::error::ConfigError;
use anyhow::Error;
use confique::Config;
use std::{
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::Duration,
};

#[derive(Debug, Config)]
pub struct CardAuditConfig {
    #[config(env = "PROMETHEUS_URL")]
    pub prometheus_url: Option<String>,

    #[config(env = "GRAFANA_URL")]
    pub grafana_url: Option<String>,
    #[config(env = "GRAFANA_SESSION_COOKIE")]
    pub grafana_session_cookie: Option<String>,
    #[config(env = "GRAFANA_API_TOKEN")]
    pub grafana_api_token: Option<String>,

    #[config(env = "ALERTMANAGER_URL")]
    pub alertmanager_url: Option<String>,
    #[config(env = "ALERTMANAGER_SESSION_COOKIE")]
    pub alertmanager_session_cookie: Option<String>,
    #[config(env = "ALERTMANAGER_API_TOKEN")]
    pub alertmanager_api_token: Option<String>,

    #[config(env = "CARDAUDIT_RESULTS_DIR", default = "results")]
    pub results_dir: PathBuf,

    /// Number of highest-cardinality metrics to analyze
    #[config(env = "CARDAUDIT_TOP_METRICS", default = 10)]
    pub top_metrics: usize,

    #[config(env = "CARDAUDIT_REQUEST_TIMEOUT_SECONDS", default = 30)]
    pub request_timeout_seconds: u64,

    /// Metrics analyzed in parallel
    #[config(env = "CARDAUDIT_CONCURRENCY", default = 4)]
    pub concurrency: usize,

    #[config(env = "CARDAUDIT_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,
}

impl CardAuditConfig {
    pub fn load() -> Result<CardAuditConfig, Error> {
        let c = CardAuditConfig::builder()
            .env()
            .file("settings.toml")
            .load()?;

        Ok(c)
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::MustBePositive {
                setting: "CARDAUDIT_REQUEST_TIMEOUT_SECONDS",
            });
        }
        Ok(Duration::from_secs(self.request_timeout_seconds))
    }

    pub fn require_prometheus_url(&self) -> Result<&str, ConfigError> {
        required(&self.prometheus_url, "PROMETHEUS_URL")
    }

    pub fn require_grafana_url(&self) -> Result<&str, ConfigError> {
        required(&self.grafana_url, "GRAFANA_URL")
    }

    pub fn require_alertmanager_url(&self) -> Result<&str, ConfigError> {
        required(&self.alertmanager_url, "ALERTMANAGER_URL")
    }

    pub fn grafana_credentials(&self) -> Credentials {
        Credentials::from_settings(
            "grafana_session",
            self.grafana_session_cookie.as_deref(),
            self.grafana_api_token.as_deref(),
        )
    }

    pub fn alertmanager_credentials(&self) -> Credentials {
        Credentials::from_settings(
            "alertmanager_session",
            self.alertmanager_session_cookie.as_deref(),
            self.alertmanager_api_token.as_deref(),
        )
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingSetting(name)),
    }
}

static CARDAUDIT_CONFIG: OnceLock<Arc<CardAuditConfig>> = OnceLock::new();

pub fn get() -> Result<Arc<CardAuditConfig>, Error> {
    CARDAUDIT_CONFIG.get().cloned().ok_or_else(|| {
        Error::msg(
            "Configuration not loaded. Please call load_configuration() before using the configuration",
        )
    })
}

pub fn load_configuration() -> Result<(), Error> {
    // Check if the configuration has already been loaded
    if CARDAUDIT_CONFIG.get().is_some() {
        return Ok(());
    }

    let config = CardAuditConfig::load()?;
    CARDAUDIT_CONFIG.get_or_init(|| Arc::new(config));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 7] = [
        "PROMETHEUS_URL",
        "GRAFANA_URL",
        "GRAFANA_SESSION_COOKIE",
        "GRAFANA_API_TOKEN",
        "ALERTMANAGER_URL",
        "ALERTMANAGER_SESSION_COOKIE",
        "ALERTMANAGER_API_TOKEN",
    ];

    fn with_clean_env<F: FnOnce()>(extra: &[(&str, Option<&str>)], f: F) {
        let mut vars: Vec<(&str, Option<&str>)> =
            ALL_VARS.iter().map(|name| (*name, None)).collect();
        vars.extend_from_slice(extra);
        temp_env::with_vars(vars, f);
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        with_clean_env(&[], || {
            let config = CardAuditConfig::load().unwrap();
            assert_eq!(config.results_dir, PathBuf::from("results"));
            assert_eq!(config.top_metrics, 10);
            assert_eq!(config.concurrency, 4);
            assert_eq!(config.request_timeout().unwrap(), Duration::from_secs(30));
            assert!(config.prometheus_url.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        with_clean_env(
            &[
                ("PROMETHEUS_URL", Some("http://localhost:9090")),
                ("CARDAUDIT_TOP_METRICS", Some("25")),
                ("CARDAUDIT_RESULTS_DIR", Some("/tmp/audit")),
            ],
            || {
                let config = CardAuditConfig::load().unwrap();
                assert_eq!(
                    config.require_prometheus_url().unwrap(),
                    "http://localhost:9090"
                );
                assert_eq!(config.top_metrics, 25);
                assert_eq!(config.results_dir, PathBuf::from("/tmp/audit"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_missing_required_urls() {
        with_clean_env(&[("GRAFANA_URL", Some("  "))], || {
            let config = CardAuditConfig::load().unwrap();
            assert_eq!(
                config.require_prometheus_url(),
                Err(ConfigError::MissingSetting("PROMETHEUS_URL"))
            );
            assert_eq!(
                config.require_grafana_url(),
                Err(ConfigError::MissingSetting("GRAFANA_URL"))
            );
            assert_eq!(
                config.require_alertmanager_url(),
                Err(ConfigError::MissingSetting("ALERTMANAGER_URL"))
            );
        });
    }

    #[test]
    #[serial]
    fn test_zero_timeout_is_rejected() {
        with_clean_env(&[("CARDAUDIT_REQUEST_TIMEOUT_SECONDS", Some("0"))], || {
            let config = CardAuditConfig::load().unwrap();
            assert!(config.request_timeout().is_err());
        });
    }

    #[test]
    #[serial]
    fn test_credentials_prefer_session_cookie() {
        with_clean_env(
            &[
                ("GRAFANA_SESSION_COOKIE", Some("abc")),
                ("GRAFANA_API_TOKEN", Some("token")),
                ("ALERTMANAGER_API_TOKEN", Some("am-token")),
            ],
            || {
                let config = CardAuditConfig::load().unwrap();
                assert_eq!(
                    config.grafana_credentials(),
                    Credentials::SessionCookie {
                        cookie_name: "grafana_session",
                        value: "abc".to_string()
                    }
                );
                assert_eq!(
                    config.alertmanager_credentials(),
                    Credentials::BearerToken("am-token".to_string())
                );
            },
        );
    }

    #[test]
    #[serial]
    fn test_load_configuration() {
        with_clean_env(&[], || {
            load_configuration().unwrap();
            assert!(CARDAUDIT_CONFIG.get().is_some());
            let config = get().unwrap();
            assert_eq!(config.top_metrics, 10);
        });
    }
}
