//! Role model: a static hierarchy mapping role identifiers to ordinal levels.
//!
//! Pure functions only. A role satisfies a requirement iff its level is greater
//! than or equal to the required role's level; unknown roles satisfy nothing.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role identifier carried by identities and access credentials.
///
/// Stored and transported as a plain string; only the roles listed in the
/// hierarchy below have a level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const USER: Role = Role(Cow::Borrowed("user"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Role assigned to newly registered identities.
    pub fn default_for_new_identity() -> Self {
        Self::USER
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Descriptive information about a known role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleInfo {
    pub name: &'static str,
    pub level: u8,
    pub description: &'static str,
}

// Ascending level order.
const HIERARCHY: &[RoleInfo] = &[
    RoleInfo {
        name: "user",
        level: 1,
        description: "Regular user; may manage their own sessions",
    },
    RoleInfo {
        name: "admin",
        level: 2,
        description: "Administrator with every permission",
    },
];

fn lookup(role: &str) -> Option<&'static RoleInfo> {
    HIERARCHY.iter().find(|info| info.name == role)
}

/// Ordinal level of a role.
pub fn level(role: &Role) -> Result<u8, RoleError> {
    lookup(role.as_str())
        .map(|info| info.level)
        .ok_or_else(|| RoleError::UnknownRole(role.as_str().to_string()))
}

/// `true` iff `actual` ranks at or above `required`.
///
/// Unknown roles on either side never satisfy the check.
pub fn has_role(actual: &Role, required: &Role) -> bool {
    match (level(actual), level(required)) {
        (Ok(actual), Ok(required)) => actual >= required,
        _ => false,
    }
}

pub fn has_any_role(actual: &Role, required: &[Role]) -> bool {
    required.iter().any(|r| has_role(actual, r))
}

/// Vacuously `true` for an empty requirement list.
pub fn has_all_roles(actual: &Role, required: &[Role]) -> bool {
    required.iter().all(|r| has_role(actual, r))
}

pub fn is_admin(role: &Role) -> bool {
    has_role(role, &Role::ADMIN)
}

pub fn is_user(role: &Role) -> bool {
    has_role(role, &Role::USER)
}

pub fn validate_role(role: &Role) -> bool {
    lookup(role.as_str()).is_some()
}

/// All known roles in ascending level order.
pub fn valid_roles() -> Vec<Role> {
    HIERARCHY.iter().map(|info| Role::new(info.name)).collect()
}

pub fn role_info(role: &Role) -> Result<RoleInfo, RoleError> {
    lookup(role.as_str())
        .cloned()
        .ok_or_else(|| RoleError::UnknownRole(role.as_str().to_string()))
}

/// Every known role at or below `role`'s level, ascending.
pub fn subordinate_roles(role: &Role) -> Result<Vec<Role>, RoleError> {
    let ceiling = level(role)?;
    Ok(HIERARCHY
        .iter()
        .filter(|info| info.level <= ceiling)
        .map(|info| Role::new(info.name))
        .collect())
}
