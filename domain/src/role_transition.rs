//! Moves a verified member from the restricted role to the full-access role.

use crate::error::{Error, VerificationErrorKind};
use crate::platform::{Member, Platform, Scope};
use crate::role_set::RoleSet;
use log::*;

/// What a transition actually changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub removed_restricted: bool,
    pub added_full_access: bool,
    pub supplementary_added: Vec<String>,
    pub supplementary_failed: Vec<String>,
}

/// Apply the role transition for `member`.
///
/// The restricted role is removed before the full-access role is added. If the
/// addition then fails, the restricted role is handed back so the member is not
/// left holding neither. Both steps are skipped when the member is already in
/// the target state. Supplementary roles are best-effort: failures are logged
/// and reported but never fail the transition.
pub async fn execute(
    platform: &dyn Platform,
    scope: &Scope,
    member: &Member,
    roles: &RoleSet,
    supplementary_role_ids: &[String],
) -> Result<TransitionReport, Error> {
    let mut report = TransitionReport::default();

    if member.has_role(&roles.restricted) {
        platform
            .remove_role(&scope.id, &member.subject_id, &roles.restricted)
            .await
            .map_err(|e| {
                error!(
                    "Failed to remove restricted role from {} in guild {}: {e}",
                    member.subject_id, scope.id
                );
                e.into_verification(VerificationErrorKind::TransitionFailed)
            })?;
        report.removed_restricted = true;
    }

    if !member.has_role(&roles.full_access) {
        if let Err(e) = platform
            .add_role(&scope.id, &member.subject_id, &roles.full_access)
            .await
        {
            error!(
                "Failed to add full-access role to {} in guild {}: {e}",
                member.subject_id, scope.id
            );
            if report.removed_restricted {
                restore_restricted(platform, scope, member, roles).await;
            }
            return Err(e.into_verification(VerificationErrorKind::TransitionFailed));
        }
        report.added_full_access = true;
    }

    for role_id in supplementary_role_ids {
        if member.has_role(role_id) {
            continue;
        }
        if !scope.has_role(role_id) {
            warn!("Supplementary role {role_id} does not exist in guild {}", scope.id);
            report.supplementary_failed.push(role_id.clone());
            continue;
        }

        match platform.add_role(&scope.id, &member.subject_id, role_id).await {
            Ok(()) => {
                info!("Added supplementary role {role_id} to {}", member.subject_id);
                report.supplementary_added.push(role_id.clone());
            }
            Err(e) => {
                warn!(
                    "Failed to add supplementary role {role_id} to {}: {e}",
                    member.subject_id
                );
                report.supplementary_failed.push(role_id.clone());
            }
        }
    }

    Ok(report)
}

async fn restore_restricted(platform: &dyn Platform, scope: &Scope, member: &Member, roles: &RoleSet) {
    match platform
        .add_role(&scope.id, &member.subject_id, &roles.restricted)
        .await
    {
        Ok(()) => info!(
            "Restored restricted role to {} in guild {}",
            member.subject_id, scope.id
        ),
        Err(e) => error!(
            "Member {} in guild {} holds neither verification role: {e}",
            member.subject_id, scope.id
        ),
    }
}
