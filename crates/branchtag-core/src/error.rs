use std::path::PathBuf;

/// Central error type for the tagger.
#[derive(Debug, thiserror::Error)]
pub enum TaggerError {
    #[error("missing credential: {name} must be set")]
    MissingCredential { name: String },

    #[error("unknown region: {region}")]
    UnknownRegion { region: String },

    #[error("invalid source types: {invalid:?} (valid types are: {allowed})")]
    InvalidSourceType { invalid: Vec<String>, allowed: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("API error ({status}) from {url}: {message}")]
    ApiError {
        status: u16,
        url: String,
        message: String,
    },

    #[error("malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("could not derive owner/repo from {url}")]
    RepoIdentity { url: String },

    #[error("path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl TaggerError {
    /// HTTP status carried by the error, if the remote side answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TaggerError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
