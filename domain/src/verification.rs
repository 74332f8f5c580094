//! The member verification state machine.
//!
//! A button press starts an attempt ([`Verifier::initiate`]), which stores a
//! pending entry under a fresh correlation token and hands the member an
//! authorization URL carrying that token as `state`. The identity provider
//! redirects back to `/callback`, where [`Verifier::complete`] redeems the token
//! exactly once and promotes the member.

use crate::error::{Error, VerificationErrorKind};
use crate::gateway::discord::DiscordClient;
use crate::platform::Platform;
use crate::role_set::RoleDirectory;
use crate::role_transition;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use service::config::Config;
use std::sync::Arc;
use std::time::Duration;
use verify_auth::oauth::{providers::discord, PendingStore, Provider};

/// Query parameters of the OAuth callback.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Result of a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Initiation {
    /// The member already holds the full-access role; nothing was stored.
    AlreadyVerified,
    /// A pending verification was stored under `token`.
    Started { token: String, authorize_url: String },
}

/// A completed verification, for the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub subject_id: String,
    pub username: String,
    pub display_name: String,
    pub scope_name: String,
}

pub struct Verifier {
    store: Arc<PendingStore>,
    provider: Arc<dyn Provider>,
    platform: Arc<dyn Platform>,
    roles: RoleDirectory,
    supplementary_role_ids: Vec<String>,
}

impl Verifier {
    pub fn new(
        store: Arc<PendingStore>,
        provider: Arc<dyn Provider>,
        platform: Arc<dyn Platform>,
        roles: RoleDirectory,
        supplementary_role_ids: Vec<String>,
    ) -> Self {
        Self {
            store,
            provider,
            platform,
            roles,
            supplementary_role_ids,
        }
    }

    /// Wire up the Discord provider and REST client from configuration.
    ///
    /// Fails with a `Config` error when a required credential is missing.
    pub fn from_config(config: &Config, store: Arc<PendingStore>) -> Result<Self, Error> {
        let client_id = config.discord_client_id().ok_or_else(|| {
            error!("DISCORD_CLIENT_ID not configured");
            Error::config()
        })?;
        let client_secret = config.discord_client_secret().ok_or_else(|| {
            error!("DISCORD_CLIENT_SECRET not configured");
            Error::config()
        })?;
        let redirect_uri = config.redirect_uri().ok_or_else(|| {
            error!("REDIRECT_URI not configured");
            Error::config()
        })?;
        let bot_token = SecretString::new(config.discord_bot_token().ok_or_else(|| {
            error!("DISCORD_BOT_TOKEN not configured");
            Error::config()
        })?);

        let provider = discord::Provider::new(discord::Config {
            client_id,
            client_secret: SecretString::new(client_secret),
            redirect_uri,
            authorize_url: config.oauth_authorize_url().to_string(),
            api_base_url: config.discord_api_base_url().to_string(),
            scopes: config.oauth_scopes().to_string(),
        })?;

        let platform = DiscordClient::new(
            bot_token.expose_secret(),
            config.discord_api_base_url(),
            Duration::from_secs(config.http_timeout_secs),
            config.http_max_retries,
        )?;

        Ok(Self::new(
            store,
            Arc::new(provider),
            Arc::new(platform),
            RoleDirectory::new(
                config.restricted_role_name.clone(),
                config.full_access_role_name.clone(),
            ),
            config.supplementary_role_ids.clone(),
        ))
    }

    pub fn store(&self) -> &Arc<PendingStore> {
        &self.store
    }

    /// Start a verification for `subject_id` in `scope_id`.
    ///
    /// `member_role_ids` is the member's role snapshot from the triggering
    /// interaction.
    pub async fn initiate(
        &self,
        subject_id: &str,
        scope_id: &str,
        member_role_ids: &[String],
    ) -> Result<Initiation, Error> {
        let roles = self
            .roles
            .resolve(self.platform.as_ref(), scope_id)
            .await?
            .ok_or_else(|| {
                warn!("Verification roles are not set up in guild {scope_id}");
                Error::verification(VerificationErrorKind::RolesNotConfigured)
            })?;

        if member_role_ids.iter().any(|id| *id == roles.full_access) {
            debug!("Member {subject_id} in guild {scope_id} is already verified");
            return Ok(Initiation::AlreadyVerified);
        }

        let token = self.store.mint(subject_id, scope_id)?;
        let authorize_url = self.provider.authorization_url(&token).url;

        info!("Started verification for member {subject_id} in guild {scope_id}");
        Ok(Initiation::Started {
            token,
            authorize_url,
        })
    }

    /// Redeem an OAuth callback.
    ///
    /// Once the `state` token has been matched it is consumed, whatever the
    /// outcome of the remaining steps: any later failure requires the member to
    /// press the button again.
    pub async fn complete(&self, params: &CallbackParams) -> Result<Verified, Error> {
        let (code, state) = match (params.code.as_deref(), params.state.as_deref()) {
            (Some(code), Some(state)) if !code.is_empty() && !state.is_empty() => (code, state),
            _ => return Err(Error::verification(VerificationErrorKind::MissingParameters)),
        };

        let pending = self.store.take_if_present(state).ok_or_else(|| {
            info!("Callback presented an unknown or expired state token");
            Error::verification(VerificationErrorKind::InvalidOrExpired)
        })?;

        let tokens = self.provider.exchange_code(code).await.map_err(|e| {
            warn!(
                "Code exchange failed for member {}: {e}",
                pending.subject_id
            );
            Error::from(e).into_verification(VerificationErrorKind::ExchangeFailed)
        })?;

        let user = self
            .provider
            .get_user_info(tokens.access_token.expose_secret())
            .await
            .map_err(|e| {
                warn!(
                    "Identity fetch failed for member {}: {e}",
                    pending.subject_id
                );
                Error::from(e).into_verification(VerificationErrorKind::IdentityFetchFailed)
            })?;

        if user.id != pending.subject_id {
            warn!(
                "Verification started by {} was authorized by {}",
                pending.subject_id, user.id
            );
            return Err(Error::verification(VerificationErrorKind::IdentityMismatch));
        }

        let scope = self
            .platform
            .fetch_scope(&pending.scope_id)
            .await?
            .ok_or_else(|| {
                warn!("Guild {} is no longer available", pending.scope_id);
                Error::verification(VerificationErrorKind::ScopeNotFound)
            })?;

        let member = self
            .platform
            .fetch_member(&scope.id, &pending.subject_id)
            .await?
            .ok_or_else(|| {
                warn!(
                    "Member {} is no longer in guild {}",
                    pending.subject_id, scope.id
                );
                Error::verification(VerificationErrorKind::SubjectNotFound)
            })?;

        let roles = self.roles.resolve_in(&scope).ok_or_else(|| {
            warn!("Verification roles are not set up in guild {}", scope.id);
            Error::verification(VerificationErrorKind::RolesNotConfigured)
        })?;

        let report = role_transition::execute(
            self.platform.as_ref(),
            &scope,
            &member,
            &roles,
            &self.supplementary_role_ids,
        )
        .await
        .inspect_err(|_| self.roles.invalidate(&scope.id))?;

        info!(
            "Verified {} ({}) in guild {}: {:?}",
            user.username, user.id, scope.id, report
        );

        Ok(Verified {
            subject_id: user.id.clone(),
            display_name: user.display_name().to_string(),
            username: user.username,
            scope_name: scope.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};
    use crate::test_support::{guild_one, member, FakePlatform, FakeProvider};
    use chrono::{Duration as ChronoDuration, Utc};
    use verify_auth::oauth::ManualClock;

    struct Harness {
        verifier: Verifier,
        store: Arc<PendingStore>,
        provider: Arc<FakeProvider>,
        platform: Arc<FakePlatform>,
    }

    fn harness_with(provider: FakeProvider, platform: FakePlatform, store: PendingStore) -> Harness {
        let store = Arc::new(store);
        let provider = Arc::new(provider);
        let platform = Arc::new(platform);
        let verifier = Verifier::new(
            Arc::clone(&store),
            provider.clone(),
            platform.clone(),
            RoleDirectory::new("Unverified", "Verified"),
            vec![],
        );
        Harness {
            verifier,
            store,
            provider,
            platform,
        }
    }

    fn harness(provider: FakeProvider) -> Harness {
        harness_with(
            provider,
            FakePlatform::new()
                .with_scope(guild_one())
                .with_member("G1", member("U1", &["R1"])),
            PendingStore::new(),
        )
    }

    fn callback(code: &str, state: &str) -> CallbackParams {
        CallbackParams {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
        }
    }

    async fn start(h: &Harness) -> String {
        match h.verifier.initiate("U1", "G1", &["R1".to_string()]).await.unwrap() {
            Initiation::Started { token, .. } => token,
            other => panic!("expected a started verification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_initiate_stores_pending_and_builds_url() {
        let h = harness(FakeProvider::returning("U1", "alice"));

        let initiation = h
            .verifier
            .initiate("U1", "G1", &["R1".to_string()])
            .await
            .unwrap();

        let Initiation::Started {
            token,
            authorize_url,
        } = initiation
        else {
            panic!("expected a started verification");
        };
        assert!(authorize_url.ends_with(&format!("state={token}")));
        assert_eq!(h.store.len(), 1);
        let pending = h.store.take_if_present(&token).unwrap();
        assert_eq!(pending.subject_id, "U1");
        assert_eq!(pending.scope_id, "G1");
    }

    #[tokio::test]
    async fn test_initiate_already_verified_creates_no_entry() {
        let h = harness(FakeProvider::returning("U1", "alice"));

        let initiation = h
            .verifier
            .initiate("U1", "G1", &["R2".to_string()])
            .await
            .unwrap();

        assert_eq!(initiation, Initiation::AlreadyVerified);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_initiate_roles_not_configured() {
        let mut guild = guild_one();
        guild.roles.retain(|role| role.name != "Verified");
        let h = harness_with(
            FakeProvider::returning("U1", "alice"),
            FakePlatform::new().with_scope(guild),
            PendingStore::new(),
        );

        let err = h.verifier.initiate("U1", "G1", &[]).await.unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::RolesNotConfigured)
        );
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_initiate_twice_yields_distinct_tokens() {
        let h = harness(FakeProvider::returning("U1", "alice"));

        let first = start(&h).await;
        let second = start(&h).await;

        assert_ne!(first, second);
        assert_eq!(h.store.len(), 2);
    }

    #[tokio::test]
    async fn test_complete_happy_path() {
        let h = harness(FakeProvider::returning("U1", "alice"));
        let token = start(&h).await;

        let verified = h.verifier.complete(&callback("abc", &token)).await.unwrap();

        assert_eq!(verified.username, "alice");
        assert_eq!(verified.display_name, "alice");
        assert_eq!(verified.scope_name, "Guild One");
        assert_eq!(h.provider.calls(), vec!["exchange:abc", "identity:T1"]);
        assert_eq!(
            h.platform.mutations(),
            vec!["remove G1/U1/R1", "add G1/U1/R2"]
        );
        assert!(h.store.take_if_present(&token).is_none());
    }

    #[tokio::test]
    async fn test_complete_missing_parameters_keeps_token() {
        let h = harness(FakeProvider::returning("U1", "alice"));
        let token = start(&h).await;

        let params = CallbackParams {
            code: None,
            state: Some(token.clone()),
        };
        let err = h.verifier.complete(&params).await.unwrap_err();
        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::MissingParameters)
        );

        // A well-formed retry with the same token still succeeds.
        assert!(h.verifier.complete(&callback("abc", &token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_complete_unknown_state_makes_no_external_calls() {
        let h = harness(FakeProvider::returning("U1", "alice"));

        let err = h
            .verifier
            .complete(&callback("abc", "not-a-token"))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::InvalidOrExpired)
        );
        assert!(h.provider.calls().is_empty());
        assert!(h.platform.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_complete_token_is_single_use() {
        let h = harness(FakeProvider::returning("U1", "alice"));
        let token = start(&h).await;

        h.verifier.complete(&callback("abc", &token)).await.unwrap();
        let err = h
            .verifier
            .complete(&callback("abc", &token))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::InvalidOrExpired)
        );
    }

    #[tokio::test]
    async fn test_complete_expired_token() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let h = harness_with(
            FakeProvider::returning("U1", "alice"),
            FakePlatform::new()
                .with_scope(guild_one())
                .with_member("G1", member("U1", &["R1"])),
            PendingStore::with_clock(ChronoDuration::minutes(10), clock.clone()),
        );
        let token = start(&h).await;

        clock.advance(ChronoDuration::minutes(11));
        h.store.sweep_expired();

        let err = h
            .verifier
            .complete(&callback("abc", &token))
            .await
            .unwrap_err();
        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::InvalidOrExpired)
        );
    }

    #[tokio::test]
    async fn test_complete_exchange_failure_consumes_token() {
        let h = harness(FakeProvider::rejecting_codes());
        let token = start(&h).await;

        let err = h
            .verifier
            .complete(&callback("stale", &token))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::ExchangeFailed)
        );
        assert!(h.store.is_empty());
        assert!(h.platform.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_complete_identity_fetch_failure() {
        let h = harness(FakeProvider::without_identity());
        let token = start(&h).await;

        let err = h
            .verifier
            .complete(&callback("abc", &token))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::IdentityFetchFailed)
        );
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_complete_identity_mismatch_never_mutates_roles() {
        let h = harness(FakeProvider::returning("U2", "mallory"));
        let token = start(&h).await;

        let err = h
            .verifier
            .complete(&callback("abc", &token))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::IdentityMismatch)
        );
        assert!(h.platform.mutations().is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_complete_scope_not_found() {
        let h = harness_with(
            FakeProvider::returning("U1", "alice"),
            FakePlatform::new().with_scope(guild_one()),
            PendingStore::new(),
        );
        h.store.put("token-x", "U1", "G404").unwrap();

        let err = h
            .verifier
            .complete(&callback("abc", "token-x"))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::ScopeNotFound)
        );
    }

    #[tokio::test]
    async fn test_complete_subject_not_found() {
        let h = harness_with(
            FakeProvider::returning("U1", "alice"),
            FakePlatform::new().with_scope(guild_one()),
            PendingStore::new(),
        );
        let token = start(&h).await;

        let err = h
            .verifier
            .complete(&callback("abc", &token))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::SubjectNotFound)
        );
    }

    #[tokio::test]
    async fn test_complete_roles_removed_after_initiation() {
        let mut guild = guild_one();
        guild.roles.clear();
        let h = harness_with(
            FakeProvider::returning("U1", "alice"),
            FakePlatform::new()
                .with_scope(guild)
                .with_member("G1", member("U1", &["R1"])),
            PendingStore::new(),
        );
        h.store.put("token-x", "U1", "G1").unwrap();

        let err = h
            .verifier
            .complete(&callback("abc", "token-x"))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::RolesNotConfigured)
        );
        assert!(h.platform.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_complete_role_deleted_between_initiate_and_callback() {
        let h = harness(FakeProvider::returning("U1", "alice"));
        let token = start(&h).await;

        let mut guild = guild_one();
        guild.roles.retain(|role| role.name != "Verified");
        h.platform.set_scope(guild);

        let err = h
            .verifier
            .complete(&callback("abc", &token))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::RolesNotConfigured)
        );
        assert!(h.platform.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_complete_uses_recreated_role() {
        let h = harness(FakeProvider::returning("U1", "alice"));
        let token = start(&h).await;

        let mut guild = guild_one();
        for role in guild.roles.iter_mut().filter(|role| role.name == "Verified") {
            role.id = "R9".to_string();
        }
        h.platform.set_scope(guild);

        h.verifier.complete(&callback("abc", &token)).await.unwrap();

        assert_eq!(
            h.platform.mutations(),
            vec!["remove G1/U1/R1", "add G1/U1/R9"]
        );
    }

    #[tokio::test]
    async fn test_complete_transition_failure() {
        let h = harness_with(
            FakeProvider::returning("U1", "alice"),
            FakePlatform::new()
                .with_scope(guild_one())
                .with_member("G1", member("U1", &["R1"]))
                .failing_role("R2"),
            PendingStore::new(),
        );
        let token = start(&h).await;

        let err = h
            .verifier
            .complete(&callback("abc", &token))
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(VerificationErrorKind::TransitionFailed)
        );
        assert_eq!(
            h.platform.mutations(),
            vec!["remove G1/U1/R1", "add G1/U1/R1"]
        );
        // Re-initiation is allowed straight away.
        assert!(matches!(
            h.verifier.initiate("U1", "G1", &[]).await.unwrap(),
            Initiation::Started { .. }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_callbacks_single_winner() {
        let h = harness(FakeProvider::returning("U1", "alice"));
        let token = start(&h).await;
        let params = callback("abc", &token);

        let results = complete_four_times(&h.verifier, &params).await;

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| {
                r.as_ref().err().and_then(Error::verification_kind)
                    == Some(VerificationErrorKind::InvalidOrExpired)
            })
            .count();
        assert_eq!(successes, 1);
        assert_eq!(rejected, 3);
        assert_eq!(h.provider.calls().len(), 2);
    }

    async fn complete_four_times(verifier: &Verifier, params: &CallbackParams) -> Vec<Result<Verified, Error>> {
        let (a, b, c, d) = tokio::join!(
            verifier.complete(params),
            verifier.complete(params),
            verifier.complete(params),
            verifier.complete(params),
        );
        vec![a, b, c, d]
    }

    #[tokio::test]
    async fn test_duplicate_token_surfaces_as_store_error() {
        let h = harness(FakeProvider::returning("U1", "alice"));
        h.store.put("token-x", "U1", "G1").unwrap();

        let err: Error = h.store.put("token-x", "U1", "G1").unwrap_err().into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Store)
        );
    }
}
