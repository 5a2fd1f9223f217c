use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token lookup failed: {0}")]
    Token(String),

    #[error("event '{event_id}' conflicts: {message}")]
    Conflict { event_id: String, message: String },

    #[error("calendar api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("response is missing field '{0}'")]
    MissingField(&'static str),
}
