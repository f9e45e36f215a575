// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Roles and the capability check for withdrawal operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `SuperAdmin` - Everything an admin can do, plus fund-moving processing
/// - `Admin` - Review the withdrawal queue, approve (tier one), reject
/// - `User` - Platform user; no access to the admin surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

/// Privileged operations, used both for capability checks and as the
/// rate-limit bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read the withdrawal queue, balances and audit trail.
    ViewWithdrawals,
    AdminApprove,
    Process,
    MarkSentManual,
    Reject,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewWithdrawals => "view_withdrawals",
            Action::AdminApprove => "admin_approve",
            Action::Process => "process",
            Action::MarkSentManual => "mark_sent_manual",
            Action::Reject => "reject",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Whether this role may perform `action`.
    pub fn can(&self, action: Action) -> bool {
        match action {
            Action::ViewWithdrawals | Action::AdminApprove | Action::Reject => {
                matches!(self, Role::Admin | Role::SuperAdmin)
            }
            Action::Process | Action::MarkSentManual => *self == Role::SuperAdmin,
        }
    }

    /// Whether this role may use the admin surface at all.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// Parse role from string (case-insensitive, `-` and `_` interchangeable).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "super_admin" | "superadmin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is User (least privilege for authenticated users).
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
            Role::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_can_do_everything() {
        for action in [
            Action::ViewWithdrawals,
            Action::AdminApprove,
            Action::Process,
            Action::MarkSentManual,
            Action::Reject,
        ] {
            assert!(Role::SuperAdmin.can(action), "{action}");
        }
    }

    #[test]
    fn admin_cannot_move_funds() {
        assert!(Role::Admin.can(Action::AdminApprove));
        assert!(Role::Admin.can(Action::Reject));
        assert!(!Role::Admin.can(Action::Process));
        assert!(!Role::Admin.can(Action::MarkSentManual));
    }

    #[test]
    fn user_has_no_admin_capability() {
        assert!(!Role::User.can(Action::ViewWithdrawals));
        assert!(!Role::User.can(Action::AdminApprove));
        assert!(!Role::User.can(Action::Reject));
        assert!(!Role::User.is_staff());
    }

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_str("super_admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::from_str("super-admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::from_str("auditor"), None);
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"super_admin\"");
    }
}
