//! The chat platform hosting guilds, members and roles.

use async_trait::async_trait;

use crate::error::Error;

/// A role defined in a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: String,
    pub name: String,
}

/// A guild (scope) and the roles defined in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub id: String,
    pub name: String,
    pub roles: Vec<Role>,
}

impl Scope {
    pub fn role_named(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|role| role.name == name)
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|role| role.id == role_id)
    }
}

/// A member of a guild and the role IDs they currently hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub subject_id: String,
    pub role_ids: Vec<String>,
}

impl Member {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.iter().any(|id| id == role_id)
    }
}

/// Operations the verification flow needs from the chat platform.
///
/// Lookups return `Ok(None)` when the guild or member does not exist; `Err`
/// is reserved for transport and upstream failures. Role mutations are
/// idempotent on the platform side.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn fetch_scope(&self, scope_id: &str) -> Result<Option<Scope>, Error>;

    async fn fetch_member(&self, scope_id: &str, subject_id: &str)
        -> Result<Option<Member>, Error>;

    async fn add_role(&self, scope_id: &str, subject_id: &str, role_id: &str)
        -> Result<(), Error>;

    async fn remove_role(&self, scope_id: &str, subject_id: &str, role_id: &str)
        -> Result<(), Error>;
}
