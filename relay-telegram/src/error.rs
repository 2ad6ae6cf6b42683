use relay_updates::PollError;
use thiserror::Error;

/// Result type for Bot API calls
pub type TelegramResult<T> = Result<T, TelegramError>;

/// Errors talking to the Bot API.
///
/// Messages never contain the bot token: transport errors are stripped of
/// their URL before they are wrapped.
#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Transport error: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status}: {description}")]
    Status { status: u16, description: String },

    #[error("API error ({}): {description}", .code.map_or_else(|| "no code".to_string(), |c| c.to_string()))]
    Api {
        code: Option<i64>,
        description: String,
    },

    #[error("Malformed response: {reason}")]
    Malformed { reason: String },

    #[error("File {file_id} has no download path")]
    MissingFilePath { file_id: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl TelegramError {
    pub fn transport(source: reqwest::Error) -> Self {
        Self::Transport {
            source: source.without_url(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether repeating the same request may succeed.
    ///
    /// Connectivity, timeouts, 5xx, 429 and garbled bodies are transient.
    /// Rejected credentials and other 4xx answers are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source } => match source.status() {
                Some(status) => status_is_transient(status.as_u16()),
                None => !source.is_builder(),
            },
            Self::Status { status, .. } => status_is_transient(*status),
            Self::Api { code, .. } => code.map_or(false, |c| c == 429 || c >= 500),
            Self::Malformed { .. } => true,
            Self::MissingFilePath { .. } | Self::Config { .. } => false,
        }
    }
}

fn status_is_transient(status: u16) -> bool {
    status == 429 || status >= 500
}

impl From<TelegramError> for PollError {
    fn from(err: TelegramError) -> Self {
        if err.is_transient() {
            PollError::transient(err.to_string())
        } else {
            PollError::fatal(err.to_string())
        }
    }
}
