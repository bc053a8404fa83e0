use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConciergeError>;

#[derive(Error, Debug)]
pub enum ConciergeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Agent call failed: {0}")]
    AgentCall(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConciergeError {
    /// True for failures reported by a remote HTTP peer or the network.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }
}

/// Every client-side HTTP failure is a transport failure, request timeouts
/// included. `Timeout` is reserved for the transcription poll deadline.
impl From<reqwest::Error> for ConciergeError {
    fn from(err: reqwest::Error) -> Self {
        ConciergeError::Transport(err.to_string())
    }
}

impl From<crate::config::ConfigError> for ConciergeError {
    fn from(err: crate::config::ConfigError) -> Self {
        ConciergeError::Config(err.to_string())
    }
}
