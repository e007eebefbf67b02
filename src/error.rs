use thiserror::Error;

/// Errors raised while talking to Prometheus, Grafana or Alertmanager.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection, timeout or transport failure
    #[error("{backend} request to {url} failed: {source}")]
    Request {
        backend: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status
    #[error("{backend} returned HTTP {status} for {url}")]
    Status {
        backend: &'static str,
        url: String,
        status: u16,
    },

    /// The response body did not have the expected shape
    #[error("{backend} returned an unexpected payload for {url}: {message}")]
    Decode {
        backend: &'static str,
        url: String,
        message: String,
    },

    /// The backend health probe did not succeed
    #[error("{backend} is not healthy: {reason}")]
    Unhealthy {
        backend: &'static str,
        reason: String,
    },

    /// The configured base URL cannot be used
    #[error("Invalid {backend} URL '{url}': {message}")]
    InvalidUrl {
        backend: &'static str,
        url: String,
        message: String,
    },
}

impl BackendError {
    pub fn request(backend: &'static str, url: &str, source: reqwest::Error) -> Self {
        BackendError::Request {
            backend,
            url: url.to_string(),
            source,
        }
    }

    pub fn decode(backend: &'static str, url: &str, message: impl ToString) -> Self {
        BackendError::Decode {
            backend,
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Request { source, .. } if source.is_timeout())
    }
}

/// Missing or invalid settings detected before any work starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingSetting(&'static str),

    #[error("{setting} must be greater than zero")]
    MustBePositive { setting: &'static str },
}
