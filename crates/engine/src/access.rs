//! Household roles and the static role → permission table.
//!
//! | permission        | owner | admin | member | viewer |
//! |-------------------|:-----:|:-----:|:------:|:------:|
//! | `ViewReceipts`    |  x    |  x    |   x    |   x    |
//! | `CreateReceipts`  |  x    |  x    |   x    |        |
//! | `ManageFinances`  |  x    |  x    |        |        |
//! | `InviteMembers`   |  x    |  x    |        |        |
//! | `ManageHousehold` |  x    |       |        |        |

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// A capability checked against the caller's role in a household.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read the household, its members, categories, transactions, budgets and reports.
    ViewReceipts,
    /// Record transactions and edit the ones you created.
    CreateReceipts,
    /// Manage categories and budgets, and edit anyone's transactions.
    ManageFinances,
    /// Invite, re-role and remove members.
    InviteMembers,
    /// Rename, re-configure or delete the household.
    ManageHousehold,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::ViewReceipts,
        Permission::CreateReceipts,
        Permission::ManageFinances,
        Permission::InviteMembers,
        Permission::ManageHousehold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewReceipts => "view_receipts",
            Self::CreateReceipts => "create_receipts",
            Self::ManageFinances => "manage_finances",
            Self::InviteMembers => "invite_members",
            Self::ManageHousehold => "manage_household",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Viewer,
}

const OWNER_PERMISSIONS: &[Permission] = &Permission::ALL;
const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewReceipts,
    Permission::CreateReceipts,
    Permission::ManageFinances,
    Permission::InviteMembers,
];
const MEMBER_PERMISSIONS: &[Permission] = &[Permission::ViewReceipts, Permission::CreateReceipts];
const VIEWER_PERMISSIONS: &[Permission] = &[Permission::ViewReceipts];

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Admin, Role::Member, Role::Viewer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    /// The permission set granted to this role.
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Owner => OWNER_PERMISSIONS,
            Self::Admin => ADMIN_PERMISSIONS,
            Self::Member => MEMBER_PERMISSIONS,
            Self::Viewer => VIEWER_PERMISSIONS,
        }
    }

    pub fn has(self, permission: Permission) -> bool {
        has_permission(self, permission)
    }
}

/// Returns `true` iff `permission` is in the table row of `role`.
pub fn has_permission(role: Role, permission: Permission) -> bool {
    role.permissions().contains(&permission)
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            other => Err(EngineError::InvalidRole(format!(
                "invalid membership role: {other}"
            ))),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
