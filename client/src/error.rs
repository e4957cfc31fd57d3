use thiserror::Error;

pub const MSG_NETWORK: &str = "Network error, make sure the backend service is running";
pub const MSG_QUERY_FAILED: &str = "Query failed, make sure the backend service is running";
pub const MSG_SESSION_EXPIRED: &str = "Session expired, please log in again";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Request never produced a response (connection refused, DNS, CORS, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Response arrived but its body reports a failure.
    #[error("server error: {0}")]
    Server(String),

    /// HTTP 401 from an authenticated endpoint.
    #[error("unauthorized")]
    Unauthorized,

    /// Required input missing; no request was issued.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    /// Text shown next to the form that triggered the request.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Transport(_) | ClientError::Decode(_) => MSG_QUERY_FAILED.to_string(),
            ClientError::Server(message) | ClientError::Validation(message) => message.clone(),
            ClientError::Unauthorized => MSG_SESSION_EXPIRED.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
