//! Discord REST API client for guild lookups and member role mutations.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind};
use crate::platform::{Member, Platform, Role, Scope};
use async_trait::async_trait;
use log::*;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use verify_auth::bot::BotTokenAuth;
use verify_auth::http::{AuthenticatedClient, AuthenticatedClientBuilder};

/// Guild object, trimmed to the fields we read.
#[derive(Debug, Deserialize)]
struct GuildResponse {
    id: String,
    name: String,
    #[serde(default)]
    roles: Vec<RoleResponse>,
}

#[derive(Debug, Deserialize)]
struct RoleResponse {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MemberUser {
    id: String,
}

/// Guild member object, trimmed to the fields we read.
#[derive(Debug, Deserialize)]
struct MemberResponse {
    user: Option<MemberUser>,
    #[serde(default)]
    roles: Vec<String>,
}

/// Bot-authenticated Discord REST client.
pub struct DiscordClient {
    client: AuthenticatedClient,
    base_url: String,
}

impl DiscordClient {
    /// Create a new client using `bot_token` against `base_url`.
    pub fn new(
        bot_token: &str,
        base_url: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, Error> {
        let client = AuthenticatedClientBuilder::new()
            .with_auth(Box::new(BotTokenAuth::new(SecretString::new(
                bot_token.to_string(),
            ))))
            .with_timeout(timeout)
            .with_max_retries(max_retries)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn role_url(&self, scope_id: &str, subject_id: &str, role_id: &str) -> String {
        format!(
            "{}/guilds/{}/members/{}/roles/{}",
            self.base_url,
            urlencoding::encode(scope_id),
            urlencoding::encode(subject_id),
            urlencoding::encode(role_id)
        )
    }

    async fn upstream_error(response: reqwest::Response, context: &str) -> Error {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        warn!("Discord {context} returned {status}: {error_text}");
        Error {
            source: None,
            error_kind: DomainErrorKind::External(ExternalErrorKind::Other(format!(
                "{context} returned {status}"
            ))),
        }
    }

    fn invalid_response(e: reqwest::Error, context: &str) -> Error {
        warn!("Failed to parse Discord {context} response: {:?}", e);
        Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Other(format!(
                "Invalid {context} response from Discord"
            ))),
        }
    }
}

#[async_trait]
impl Platform for DiscordClient {
    async fn fetch_scope(&self, scope_id: &str) -> Result<Option<Scope>, Error> {
        let url = format!("{}/guilds/{}", self.base_url, urlencoding::encode(scope_id));
        let response = self.client.get(url).send().await.inspect_err(|e| {
            warn!("Failed to fetch guild {scope_id}: {:?}", e);
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let guild: GuildResponse = response
                    .json()
                    .await
                    .map_err(|e| Self::invalid_response(e, "guild"))?;
                Ok(Some(Scope {
                    id: guild.id,
                    name: guild.name,
                    roles: guild
                        .roles
                        .into_iter()
                        .map(|role| Role {
                            id: role.id,
                            name: role.name,
                        })
                        .collect(),
                }))
            }
            _ => Err(Self::upstream_error(response, "guild lookup").await),
        }
    }

    async fn fetch_member(
        &self,
        scope_id: &str,
        subject_id: &str,
    ) -> Result<Option<Member>, Error> {
        let url = format!(
            "{}/guilds/{}/members/{}",
            self.base_url,
            urlencoding::encode(scope_id),
            urlencoding::encode(subject_id)
        );
        let response = self.client.get(url).send().await.inspect_err(|e| {
            warn!("Failed to fetch member {subject_id} of guild {scope_id}: {:?}", e);
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let member: MemberResponse = response
                    .json()
                    .await
                    .map_err(|e| Self::invalid_response(e, "member"))?;
                Ok(Some(Member {
                    subject_id: member
                        .user
                        .map(|user| user.id)
                        .unwrap_or_else(|| subject_id.to_string()),
                    role_ids: member.roles,
                }))
            }
            _ => Err(Self::upstream_error(response, "member lookup").await),
        }
    }

    async fn add_role(&self, scope_id: &str, subject_id: &str, role_id: &str) -> Result<(), Error> {
        debug!("Adding role {role_id} to member {subject_id} in guild {scope_id}");
        let response = self
            .client
            .put(self.role_url(scope_id, subject_id, role_id))
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::upstream_error(response, "add role").await)
        }
    }

    async fn remove_role(
        &self,
        scope_id: &str,
        subject_id: &str,
        role_id: &str,
    ) -> Result<(), Error> {
        debug!("Removing role {role_id} from member {subject_id} in guild {scope_id}");
        let response = self
            .client
            .delete(self.role_url(scope_id, subject_id, role_id))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::upstream_error(response, "remove role").await)
        }
    }
}
