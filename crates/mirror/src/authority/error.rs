use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("authority unreachable at {addr}: {reason}")]
    Unreachable { addr: String, reason: String },
    #[error("authority connection i/o failed: {0}")]
    Io(#[source] io::Error),
    #[error("authority connection closed")]
    Disconnected,
    /// The authority processed the request and refused it. The message is the
    /// authority's own text.
    #[error("{0}")]
    Rejected(String),
    #[error("unexpected `{command}` response at {path}: {message}")]
    Decode {
        command: &'static str,
        path: String,
        message: String,
    },
    #[error("failed to encode `{command}` request: {source}")]
    Encode {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("authority protocol violation: {0}")]
    Protocol(String),
    #[error("event stream already open for this connection")]
    AlreadySubscribed,
}

impl From<io::Error> for AuthorityError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}
