//! Resolution of the restricted/full-access role pair for each guild.
//!
//! Roles are configured by name; the first successful lookup in a guild is
//! cached as IDs so the verification flow only ever works with role IDs.

use crate::error::Error;
use crate::platform::{Platform, Scope};
use dashmap::DashMap;
use log::*;

/// Role IDs a verification moves a member between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet {
    pub restricted: String,
    pub full_access: String,
}

pub struct RoleDirectory {
    restricted_name: String,
    full_access_name: String,
    resolved: DashMap<String, RoleSet>,
}

impl RoleDirectory {
    pub fn new(restricted_name: impl Into<String>, full_access_name: impl Into<String>) -> Self {
        Self {
            restricted_name: restricted_name.into(),
            full_access_name: full_access_name.into(),
            resolved: DashMap::new(),
        }
    }

    /// Resolve the role pair from an already fetched guild.
    ///
    /// A cached pair is only reused while both roles still exist in `scope`;
    /// otherwise the roles are looked up by name again.
    pub fn resolve_in(&self, scope: &Scope) -> Option<RoleSet> {
        let cached = self.resolved.get(&scope.id).map(|entry| entry.clone());
        if let Some(cached) = cached {
            if scope.has_role(&cached.restricted) && scope.has_role(&cached.full_access) {
                return Some(cached);
            }
            debug!("Cached roles for guild {} no longer exist", scope.id);
            self.resolved.remove(&scope.id);
        }

        let role_set = RoleSet {
            restricted: scope.role_named(&self.restricted_name)?.id.clone(),
            full_access: scope.role_named(&self.full_access_name)?.id.clone(),
        };
        debug!(
            "Resolved roles for guild {}: restricted={}, full_access={}",
            scope.id, role_set.restricted, role_set.full_access
        );
        self.resolved.insert(scope.id.clone(), role_set.clone());
        Some(role_set)
    }

    /// Resolve the role pair for `scope_id`, fetching the guild on a cache miss.
    ///
    /// Returns `Ok(None)` when the guild is unknown or lacks either role.
    pub async fn resolve(
        &self,
        platform: &dyn Platform,
        scope_id: &str,
    ) -> Result<Option<RoleSet>, Error> {
        if let Some(cached) = self.resolved.get(scope_id) {
            return Ok(Some(cached.clone()));
        }

        Ok(platform
            .fetch_scope(scope_id)
            .await?
            .and_then(|scope| self.resolve_in(&scope)))
    }

    /// Forget the cached pair for `scope_id`, e.g. after a role mutation failed.
    pub fn invalidate(&self, scope_id: &str) {
        self.resolved.remove(scope_id);
    }
}
