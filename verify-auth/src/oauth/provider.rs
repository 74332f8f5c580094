//! OAuth provider trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Tokens;
use crate::error::Error;

/// Authorization request with the URL to send the member to.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// Correlation token carried as the `state` parameter.
    pub state: String,
}

/// Identity of the authenticated account, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Provider's unique user identifier.
    pub id: String,
    /// Account username.
    pub username: String,
    /// Display name, when the account has one set.
    #[serde(default)]
    pub global_name: Option<String>,
}

impl UserInfo {
    /// Name to show the member on the confirmation page.
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

/// Trait for OAuth 2.0 identity providers.
///
/// Implementations handle the authorization-code flow:
/// - Authorization URL generation
/// - Authorization code exchange for an access token
/// - Identity retrieval with that access token
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the authorization URL carrying `state`.
    fn authorization_url(&self, state: &str) -> AuthorizationRequest;

    /// Exchange an authorization code for an access token.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from the OAuth callback
    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error>;

    /// Get the identity behind an access token.
    ///
    /// # Arguments
    ///
    /// * `access_token` - Valid access token
    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, Error>;
}
