use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkersAiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api returned errors: {0}")]
    Api(String),

    #[error("response is missing field '{0}'")]
    MissingField(&'static str),
}
