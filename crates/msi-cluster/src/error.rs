use miette::Diagnostic;
use msi_sampler::ErrorKind;
use thiserror::Error;

/// Error type for cluster API access
#[derive(Error, Debug, Diagnostic)]
pub enum ClusterError {
    /// Request never got a response
    #[error("HTTP request to {url} failed: {message}")]
    #[diagnostic(
        code(msi::cluster::transport),
        help("Check that the API server URL is reachable from this host")
    )]
    Transport {
        #[allow(unused)]
        url: String,
        #[allow(unused)]
        message: String,
    },

    /// The resource does not exist
    #[error("Resource not found: {url}")]
    #[diagnostic(code(msi::cluster::not_found))]
    NotFound {
        #[allow(unused)]
        url: String,
    },

    /// Non-success status other than 404
    #[error("GET {url} failed with status {status}: {body}")]
    #[diagnostic(
        code(msi::cluster::bad_status),
        help("401/403 usually means the token is missing or lacks cluster-reader permissions")
    )]
    Status {
        #[allow(unused)]
        url: String,
        #[allow(unused)]
        status: u16,
        #[allow(unused)]
        body: String,
    },

    /// Response body did not match the expected type
    #[error("Failed to parse response from {url}: {message}")]
    #[diagnostic(code(msi::cluster::parse))]
    Parse {
        #[allow(unused)]
        url: String,
        #[allow(unused)]
        message: String,
    },

    /// Client could not be built
    #[error("Invalid client configuration: {message}")]
    #[diagnostic(code(msi::cluster::invalid_config))]
    InvalidConfig {
        #[allow(unused)]
        message: String,
    },
}

/// Result type alias for cluster operations
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Coarse classification used to pick which errors a wait retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterErrorKind {
    Transport,
    NotFound,
    Status,
    Parse,
    Config,
}

impl ErrorKind for ClusterError {
    type Kind = ClusterErrorKind;

    fn kind(&self) -> ClusterErrorKind {
        match self {
            ClusterError::Transport { .. } => ClusterErrorKind::Transport,
            ClusterError::NotFound { .. } => ClusterErrorKind::NotFound,
            ClusterError::Status { .. } => ClusterErrorKind::Status,
            ClusterError::Parse { .. } => ClusterErrorKind::Parse,
            ClusterError::InvalidConfig { .. } => ClusterErrorKind::Config,
        }
    }
}

impl ClusterError {
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// 5xx answer from the API server
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if (500..600).contains(status))
    }
}
