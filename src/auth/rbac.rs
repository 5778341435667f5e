/*!
 * # Role-Based Access Control
 *
 * Static role table for the three account roles. Permissions are
 * `resource:action` strings; `resource:*` grants every action on a resource
 * and `*` grants everything.
 */

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::entities::user::UserRole;

/// Permission string constants used by the router.
pub mod consts {
    pub const BATCHES_READ: &str = "batches:read";
    pub const BATCHES_WRITE: &str = "batches:write";
    pub const BATCHES_APPROVE: &str = "batches:approve";
    pub const BATCHES_DELETE: &str = "batches:delete";

    pub const CONTAMINATION_READ: &str = "contamination:read";
    pub const CONTAMINATION_WRITE: &str = "contamination:write";
    pub const CONTAMINATION_VERIFY: &str = "contamination:verify";

    pub const PLANNING_READ: &str = "planning:read";
    pub const PLANNING_WRITE: &str = "planning:write";

    pub const FINANCE_READ: &str = "finance:read";
    pub const FINANCE_WRITE: &str = "finance:write";

    pub const HR_READ: &str = "hr:read";
    pub const HR_WRITE: &str = "hr:write";

    pub const SALES_READ: &str = "sales:read";
    pub const SALES_WRITE: &str = "sales:write";

    pub const DASHBOARD_READ: &str = "dashboard:read";

    pub const USERS_MANAGE: &str = "users:manage";
}

#[derive(Debug, Clone)]
pub struct Role {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: Vec<&'static str>,
}

lazy_static! {
    pub static ref ROLES: HashMap<UserRole, Role> = {
        use consts::*;

        let mut roles = HashMap::new();

        roles.insert(
            UserRole::Admin,
            Role {
                name: "admin",
                description: "Full access including account management",
                permissions: vec!["*"],
            },
        );

        roles.insert(
            UserRole::Manager,
            Role {
                name: "manager",
                description: "Runs the farm; reviews worker edits",
                permissions: vec![
                    "batches:*",
                    "contamination:*",
                    "planning:*",
                    "finance:*",
                    "hr:*",
                    "sales:*",
                    DASHBOARD_READ,
                ],
            },
        );

        roles.insert(
            UserRole::Worker,
            Role {
                name: "worker",
                description: "Records day-to-day production work",
                permissions: vec![
                    BATCHES_READ,
                    BATCHES_WRITE,
                    CONTAMINATION_READ,
                    CONTAMINATION_WRITE,
                    PLANNING_READ,
                    PLANNING_WRITE,
                    SALES_READ,
                    SALES_WRITE,
                    FINANCE_READ,
                    HR_READ,
                    DASHBOARD_READ,
                ],
            },
        );

        roles
    };
}

fn grants(granted: &str, required: &str) -> bool {
    if granted == "*" || granted == required {
        return true;
    }
    match (granted.split_once(':'), required.split_once(':')) {
        (Some((g_res, "*")), Some((r_res, _))) => g_res == r_res,
        _ => false,
    }
}

pub fn role_has_permission(role: UserRole, permission: &str) -> bool {
    ROLES
        .get(&role)
        .map_or(false, |r| r.permissions.iter().any(|p| grants(p, permission)))
}

/// Permission strings carried in access-token claims.
pub fn permissions_for(role: UserRole) -> Vec<String> {
    ROLES
        .get(&role)
        .map(|r| r.permissions.iter().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::consts::*;
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(UserRole::Worker, BATCHES_WRITE, true)]
    #[case(UserRole::Worker, BATCHES_APPROVE, false)]
    #[case(UserRole::Worker, CONTAMINATION_VERIFY, false)]
    #[case(UserRole::Worker, HR_WRITE, false)]
    #[case(UserRole::Manager, BATCHES_APPROVE, true)]
    #[case(UserRole::Manager, HR_WRITE, true)]
    #[case(UserRole::Manager, USERS_MANAGE, false)]
    #[case(UserRole::Admin, USERS_MANAGE, true)]
    fn role_table(#[case] role: UserRole, #[case] permission: &str, #[case] expected: bool) {
        assert_eq!(role_has_permission(role, permission), expected);
    }

    #[test]
    fn wildcard_is_scoped_to_resource() {
        assert!(grants("sales:*", "sales:write"));
        assert!(!grants("sales:*", "salesx:write"));
        assert!(!grants("sales:read", "sales:write"));
    }

    #[test]
    fn every_role_has_an_entry() {
        for role in [UserRole::Admin, UserRole::Manager, UserRole::Worker] {
            assert!(!permissions_for(role).is_empty());
        }
    }
}
