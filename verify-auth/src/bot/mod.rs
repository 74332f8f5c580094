//! Bot token authentication for platform REST calls.

use secrecy::{ExposeSecret, SecretString};

/// Trait for authenticating outbound HTTP requests.
pub trait ProviderAuth: Send + Sync {
    /// Value for the `Authorization` header.
    fn authorization_value(&self) -> SecretString;
}

/// Discord bot authentication: `Authorization: Bot <token>`.
pub struct BotTokenAuth {
    token: SecretString,
}

impl BotTokenAuth {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

impl ProviderAuth for BotTokenAuth {
    fn authorization_value(&self) -> SecretString {
        SecretString::new(format!("Bot {}", self.token.expose_secret()))
    }
}
