/// Errors surfaced by the session, dispatcher and moderator.
///
/// Every variant is fatal to the current RTM session. Nothing in the core
/// retries; the caller decides whether to tear down or restart.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("connection closed")]
    ConnectionClosed,

    /// The event stream delivered an `error` frame.
    #[error("slack protocol error: {0}")]
    RemoteProtocol(String),

    /// A Web API method returned `ok: false` or could not be completed.
    #[error("slack method {method} failed: {error}")]
    RemoteCall { method: String, error: String },
}

impl Error {
    pub fn remote_call(method: &str, error: impl Into<String>) -> Self {
        Error::RemoteCall {
            method: method.to_string(),
            error: error.into(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Connection(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
