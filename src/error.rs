use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the remote photo service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network hiccup or overloaded service; worth another attempt.
    #[error("transient remote failure: {0}")]
    Transient(String),

    #[error("remote request rejected: {0}")]
    Permanent(String),

    /// Application level `stat: fail` payload.
    #[error("remote API error {code}: {message}")]
    Api { code: i64, message: String },
}

/// API codes the service documents as temporary conditions.
const TRANSIENT_API_CODES: &[i64] = &[105, 106];

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transient(_) => true,
            RemoteError::Permanent(_) => false,
            RemoteError::Api { code, .. } => TRANSIENT_API_CODES.contains(code),
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, context: &str) -> Self {
        if status >= 500 || status == 429 {
            RemoteError::Transient(format!("HTTP {} from {}", status, context))
        } else {
            RemoteError::Permanent(format!("HTTP {} from {}", status, context))
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            RemoteError::Transient(e.to_string())
        } else if let Some(status) = e.status() {
            RemoteError::from_status(status.as_u16(), "remote service")
        } else {
            RemoteError::Permanent(e.to_string())
        }
    }
}

/// Failures of the exiftool channel.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("exiftool not found at {0}")]
    MissingExecutable(PathBuf),

    #[error("failed to start exiftool: {0}")]
    Spawn(std::io::Error),

    #[error("exiftool I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("exiftool stream closed while waiting for {0:?}")]
    StreamClosed(&'static str),

    #[error("exiftool produced non UTF-8 output")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("malformed exiftool JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("exiftool returned no metadata for {0}")]
    Empty(PathBuf),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config file corrupted: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("please provide a suitable secret to your key")]
    IncompleteApiCredentials,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("photo listing is incomplete or unavailable, aborting")]
    ListingUnavailable,

    #[error("could not fetch the join date of user {0}, please check the privacy settings of the account")]
    JoinDateUnavailable(String),

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("no photoset selected")]
    NoPhotoset,

    #[error("interactive prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
