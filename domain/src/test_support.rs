//! In-memory fakes of the platform and identity provider.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind};
use crate::platform::{Member, Platform, Role, Scope};
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use verify_auth::error::{oauth_error, OAuthErrorKind};
use verify_auth::oauth::{AuthorizationRequest, Provider, Tokens, UserInfo};

/// Guild `G1` ("Guild One") with `Unverified` = `R1`, `Verified` = `R2`, `Member` = `R3`.
pub fn guild_one() -> Scope {
    Scope {
        id: "G1".to_string(),
        name: "Guild One".to_string(),
        roles: [("R1", "Unverified"), ("R2", "Verified"), ("R3", "Member")]
            .into_iter()
            .map(|(id, name)| Role {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect(),
    }
}

pub fn member(subject_id: &str, role_ids: &[&str]) -> Member {
    Member {
        subject_id: subject_id.to_string(),
        role_ids: role_ids.iter().map(|r| r.to_string()).collect(),
    }
}

#[derive(Default)]
pub struct FakePlatform {
    scopes: Mutex<HashMap<String, Scope>>,
    members: Mutex<HashMap<(String, String), Member>>,
    failing_roles: HashSet<String>,
    mutations: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(self, scope: Scope) -> Self {
        self.set_scope(scope);
        self
    }

    /// Replace a guild, as an admin editing its roles would.
    pub fn set_scope(&self, scope: Scope) {
        self.scopes
            .lock()
            .unwrap()
            .insert(scope.id.clone(), scope);
    }

    pub fn with_member(self, scope_id: &str, member: Member) -> Self {
        self.members
            .lock()
            .unwrap()
            .insert((scope_id.to_string(), member.subject_id.clone()), member);
        self
    }

    /// Make every mutation of `role_id` fail.
    pub fn failing_role(mut self, role_id: &str) -> Self {
        self.failing_roles.insert(role_id.to_string());
        self
    }

    /// Role mutations performed so far, as `"add G/U/R"` or `"remove G/U/R"`.
    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    fn mutate(&self, op: &str, scope_id: &str, subject_id: &str, role_id: &str) -> Result<(), Error> {
        if self.failing_roles.contains(role_id) {
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Missing Permissions".to_string(),
                )),
            });
        }

        self.mutations
            .lock()
            .unwrap()
            .push(format!("{op} {scope_id}/{subject_id}/{role_id}"));

        let mut members = self.members.lock().unwrap();
        if let Some(member) = members.get_mut(&(scope_id.to_string(), subject_id.to_string())) {
            member.role_ids.retain(|id| id != role_id);
            if op == "add" {
                member.role_ids.push(role_id.to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn fetch_scope(&self, scope_id: &str) -> Result<Option<Scope>, Error> {
        Ok(self.scopes.lock().unwrap().get(scope_id).cloned())
    }

    async fn fetch_member(&self, scope_id: &str, subject_id: &str) -> Result<Option<Member>, Error> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .get(&(scope_id.to_string(), subject_id.to_string()))
            .cloned())
    }

    async fn add_role(&self, scope_id: &str, subject_id: &str, role_id: &str) -> Result<(), Error> {
        self.mutate("add", scope_id, subject_id, role_id)
    }

    async fn remove_role(&self, scope_id: &str, subject_id: &str, role_id: &str) -> Result<(), Error> {
        self.mutate("remove", scope_id, subject_id, role_id)
    }
}

/// Identity provider that accepts any code and reports a fixed identity.
pub struct FakeProvider {
    identity: Option<UserInfo>,
    exchange_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    /// Provider reporting `id`/`username` for every access token.
    pub fn returning(id: &str, username: &str) -> Self {
        Self {
            identity: Some(UserInfo {
                id: id.to_string(),
                username: username.to_string(),
                global_name: None,
            }),
            exchange_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Provider whose token endpoint rejects every code.
    pub fn rejecting_codes() -> Self {
        Self {
            identity: None,
            exchange_fails: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Provider whose identity endpoint always fails.
    pub fn without_identity() -> Self {
        Self {
            identity: None,
            exchange_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Outbound calls made so far, as `"exchange:<code>"` or `"identity:<token>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn authorization_url(&self, state: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            url: format!("https://idp.test/authorize?response_type=code&state={state}"),
            state: state.to_string(),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens, verify_auth::Error> {
        self.calls.lock().unwrap().push(format!("exchange:{code}"));
        if self.exchange_fails {
            return Err(oauth_error(OAuthErrorKind::TokenExchangeFailed, "invalid_grant"));
        }
        Ok(Tokens {
            access_token: SecretString::new("T1".to_string()),
            expires_at: None,
            token_type: "Bearer".to_string(),
            scopes: vec!["identify".to_string()],
        })
    }

    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, verify_auth::Error> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("identity:{access_token}"));
        self.identity
            .clone()
            .ok_or_else(|| oauth_error(OAuthErrorKind::IdentityFetchFailed, "401: Unauthorized"))
    }
}
