//! Role to organization assignment

use std::sync::Arc;

use crate::config::OrgPolicy;
use crate::identity::{OrgRole, OrgRoles};
use crate::services::OrgLookup;

/// Maps an extracted role and groups to per-organization roles
///
/// Precedence for a valid role: auto-assign organization, then groups
/// resolved by name, then the default organization. Unknown or empty roles
/// produce no assignments.
#[derive(Clone)]
pub struct OrgRoleResolver {
    policy: OrgPolicy,
    orgs: Arc<dyn OrgLookup>,
}

impl std::fmt::Debug for OrgRoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgRoleResolver")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl OrgRoleResolver {
    pub fn new(policy: OrgPolicy, orgs: Arc<dyn OrgLookup>) -> Self {
        Self { policy, orgs }
    }

    pub async fn resolve(&self, role: &str, groups: &[String]) -> OrgRoles {
        let mut org_roles = OrgRoles::new();

        let Ok(role) = role.parse::<OrgRole>() else {
            if !role.is_empty() {
                tracing::debug!(role, "Ignoring unknown role");
            }
            return org_roles;
        };

        if self.policy.auto_assign_org && self.policy.auto_assign_org_id > 0 {
            org_roles.insert(self.policy.auto_assign_org_id, role);
        } else if !groups.is_empty() {
            for group in groups {
                match self.org_for_group(group).await {
                    Some(org_id) => {
                        org_roles.insert(org_id, role);
                    }
                    None => tracing::debug!(group = %group, "No organization for group"),
                }
            }
        } else {
            org_roles.insert(self.policy.default_org_id, role);
        }

        org_roles
    }

    /// Exact name first, then the lowercased name
    async fn org_for_group(&self, group: &str) -> Option<i64> {
        if let Ok(org_id) = self.orgs.org_by_name(group).await {
            return Some(org_id);
        }

        let lowered = group.to_lowercase();
        if lowered == group {
            return None;
        }
        self.orgs.org_by_name(&lowered).await.ok()
    }
}
