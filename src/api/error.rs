use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("server returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    #[error("unexpected response from {endpoint}: {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(err)
        }
    }
}

impl ApiError {
    /// Text suitable for an alert popup.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => "No response received from server.".to_string(),
            ApiError::Timeout => "The server took too long to respond.".to_string(),
            ApiError::Status { status, detail } if detail.is_empty() => {
                format!("Request failed ({})", status.as_u16())
            }
            ApiError::Status { status, detail } => format!("{} ({})", detail, status.as_u16()),
            ApiError::Malformed { .. } => "The server sent an unexpected response.".to_string(),
            ApiError::Io { path, .. } => format!("Could not read {}", path),
        }
    }
}
