//! Discord OAuth provider implementation.

use async_trait::async_trait;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::{oauth_error, Error, OAuthErrorKind};
use crate::oauth::tokens::TokenResponse;
use crate::oauth::{AuthorizationRequest, Tokens, UserInfo};

/// Default Discord REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api";

/// Default Discord authorization page.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";

/// Endpoints and credentials for the Discord OAuth application.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Pre-registered redirect URI pointing at our `/callback`.
    pub redirect_uri: String,
    pub authorize_url: String,
    pub api_base_url: String,
    /// Requested scopes, space separated.
    pub scopes: String,
}

/// Request to exchange authorization code for tokens
#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

/// Discord OAuth provider.
///
/// Codes are single-use, so the exchange is never retried automatically.
pub struct Provider {
    config: Config,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new Discord OAuth provider.
    pub fn new(config: Config) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder().build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.config.api_base_url)
    }

    fn user_info_url(&self) -> String {
        format!("{}/users/@me", self.config.api_base_url)
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn authorization_url(&self, state: &str) -> AuthorizationRequest {
        let url = format!(
            "{}?\
            client_id={}&\
            redirect_uri={}&\
            response_type=code&\
            scope={}&\
            state={}",
            self.config.authorize_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scopes),
            urlencoding::encode(state)
        );

        AuthorizationRequest {
            url,
            state: state.to_string(),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error> {
        let request = TokenExchangeRequest {
            client_id: &self.config.client_id,
            client_secret: self.config.client_secret.expose_secret(),
            grant_type: "authorization_code",
            code,
            redirect_uri: &self.config.redirect_uri,
        };

        debug!("Exchanging Discord OAuth code for tokens");

        let response = self
            .http_client
            .post(self.token_url())
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to exchange Discord OAuth code: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Discord token endpoint returned {status}: {error_text}");
            return Err(oauth_error(OAuthErrorKind::TokenExchangeFailed, &error_text));
        }

        let tokens: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Discord token response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })?;

        info!("Successfully exchanged Discord OAuth code for an access token");
        Ok(tokens.into())
    }

    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, Error> {
        let response = self
            .http_client
            .get(self.user_info_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to get Discord user info: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::IdentityFetchFailed),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Discord user info returned {status}: {error_text}");
            return Err(oauth_error(OAuthErrorKind::IdentityFetchFailed, &error_text));
        }

        response.json::<UserInfo>().await.map_err(|e| {
            warn!("Failed to parse Discord user info: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })
    }
}
