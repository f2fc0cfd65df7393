use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NetworkApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("The network could not be reached or did not answer in time: {0}")]
    Transport(String),
    #[error("Authentication was refused. Error {status}. {message}")]
    Unauthorized { status: u16, message: String },
    #[error("Request rejected. Error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("Business rejection [{code}]: {message}")]
    Business { code: String, message: String },
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("The response did not contain the expected field: {0}")]
    MissingField(String),
}

impl NetworkApiError {
    /// Failures where the request may never have reached the network, or where the network (or a gateway in front of
    /// it) reported it could not answer. Only these are safe to retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Self::Transport(format!("Error {}. {message}", status.as_u16()))
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Self::Unauthorized { status: status.as_u16(), message }
            },
            _ => Self::Rejected { status: status.as_u16(), message },
        }
    }
}

impl From<reqwest::Error> for NetworkApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::JsonError(e.to_string())
        } else if e.is_builder() {
            Self::Initialization(e.to_string())
        } else if let Some(status) = e.status() {
            Self::from_status(status, e.to_string())
        } else {
            // Timeouts, connection failures and requests that never produced a response
            Self::Transport(e.to_string())
        }
    }
}
