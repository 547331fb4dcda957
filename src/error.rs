#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Bridge error (status {status}): {message}")]
    Bridge { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Label already registered: {0}")]
    DuplicateLabel(String),

    #[error("Invalid metric definition: {0}")]
    InvalidDefinition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    pub(crate) fn bridge<S: Into<String>>(status: u16, msg: S) -> Self {
        Error::Bridge { status, message: msg.into() }
    }

    pub(crate) fn invalid_response<S: Into<String>>(msg: S) -> Self {
        Error::InvalidResponse(msg.into())
    }

    pub(crate) fn invalid_definition<S: Into<String>>(msg: S) -> Self {
        Error::InvalidDefinition(msg.into())
    }

    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn scheduler<S: Into<String>>(msg: S) -> Self {
        Error::Scheduler(msg.into())
    }

    /// Whether the failure happened while talking to the bridge, as opposed to a caller mistake.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Bridge { .. } | Error::InvalidResponse(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::invalid_response(err.to_string())
        } else if err.is_timeout() {
            Error::transport(format!("request timed out: {}", err))
        } else {
            Error::transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
