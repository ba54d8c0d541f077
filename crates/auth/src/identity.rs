//! Identity shapes that flow into the authentication core.
//!
//! The directory owns the full record (including the password hash); only
//! `Identity` (id, name, email, role) reaches token issuance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatekeeper_core::IdentityId;

use crate::Role;

/// The projection of an identity that access credentials are minted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// A persisted identity, as returned by the identity directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

/// An identity to be created; the directory assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}
