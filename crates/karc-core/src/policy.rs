//! Role and approval based access policy.
//!
//! One table answers every "may this identity do that" question, for
//! hiding controls and for the service layer's own checks alike.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auth::SessionSnapshot;
use crate::model::{ParseEnumError, Role};

/// Something a member may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewPublic,
    ViewDashboard,
    CreateRecord,
    EditRecord,
    DeleteRecord,
    DeleteRecordBulk,
    BulkImport,
    AddComment,
    ManageMembers,
    ChangeMemberRole,
    AuthorBlog,
}

impl Action {
    pub const ALL: [Self; 11] = [
        Self::ViewPublic,
        Self::ViewDashboard,
        Self::CreateRecord,
        Self::EditRecord,
        Self::DeleteRecord,
        Self::DeleteRecordBulk,
        Self::BulkImport,
        Self::AddComment,
        Self::ManageMembers,
        Self::ChangeMemberRole,
        Self::AuthorBlog,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewPublic => "view_public",
            Self::ViewDashboard => "view_dashboard",
            Self::CreateRecord => "create_record",
            Self::EditRecord => "edit_record",
            Self::DeleteRecord => "delete_record",
            Self::DeleteRecordBulk => "delete_record_bulk",
            Self::BulkImport => "bulk_import",
            Self::AddComment => "add_comment",
            Self::ManageMembers => "manage_members",
            Self::ChangeMemberRole => "change_member_role",
            Self::AuthorBlog => "author_blog",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "action",
                value: s.to_string(),
                expected: "see `karc auth whoami` for the actions your role allows",
            })
    }
}

/// Whether an approved identity holding `role` may perform `action`.
const fn role_allows(role: Role, action: Action) -> bool {
    use Action as A;
    match role {
        Role::Public => matches!(action, A::ViewPublic),
        Role::Viewer => matches!(action, A::ViewPublic | A::ViewDashboard | A::AddComment),
        Role::Researcher => matches!(
            action,
            A::ViewPublic | A::ViewDashboard | A::AddComment | A::CreateRecord | A::EditRecord
        ),
        Role::Coordinator => matches!(
            action,
            A::ViewPublic
                | A::ViewDashboard
                | A::AddComment
                | A::CreateRecord
                | A::EditRecord
                | A::BulkImport
                | A::AuthorBlog
        ),
        Role::Admin => true,
    }
}

/// The single access check.
///
/// Approval gates everything but the public site, whatever the stored role.
#[must_use]
pub const fn can(role: Role, approved: bool, action: Action) -> bool {
    if !approved {
        return matches!(action, Action::ViewPublic);
    }
    role_allows(role, action)
}

/// Check by action name. Unknown names are denied.
#[must_use]
pub fn can_named(role: Role, approved: bool, action: &str) -> bool {
    action
        .parse::<Action>()
        .is_ok_and(|action| can(role, approved, action))
}

/// Every action the identity may perform, in table order.
#[must_use]
pub fn allowed_actions(role: Role, approved: bool) -> Vec<Action> {
    Action::ALL
        .into_iter()
        .filter(|action| can(role, approved, *action))
        .collect()
}

/// Where a dashboard request should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardGate {
    Allow,
    RedirectToLogin,
    RedirectToPending,
}

/// Decide dashboard access from the current session.
#[must_use]
pub fn dashboard_gate(snapshot: &SessionSnapshot) -> DashboardGate {
    if snapshot.user_id.is_none() {
        return DashboardGate::RedirectToLogin;
    }
    if can(snapshot.role, snapshot.approved, Action::ViewDashboard) {
        DashboardGate::Allow
    } else {
        DashboardGate::RedirectToPending
    }
}
