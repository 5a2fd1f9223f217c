use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::CalendarError;

/// Supplies the bearer token for each request. Deployments refresh an
/// OAuth grant behind this; tests and single-user setups hand in a static
/// token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, CalendarError>;
}

/// A fixed token with no refresh.
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, CalendarError> {
        Ok(self.0.expose_secret().to_string())
    }
}
