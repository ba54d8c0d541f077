use serde::Serialize;
use thiserror::Error;

use crate::{IdentityContext, Role, roles};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: requires role '{required}', caller has '{actual}'")]
    Forbidden { required: Role, actual: Role },
}

/// Check that an authenticated caller satisfies `required`.
///
/// - No IO
/// - No panics
/// - Unknown roles on either side deny
pub fn authorize(context: &IdentityContext, required: &Role) -> Result<(), AuthzError> {
    if roles::has_role(&context.role, required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            required: required.clone(),
            actual: context.role.clone(),
        })
    }
}

/// Why a role check came out the way it did; attached to denial logs.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_role: String,
    pub actual_role: String,
    pub required_level: Option<u8>,
    pub actual_level: Option<u8>,
    pub granted: bool,
    pub reason: String,
}

pub fn explain_authorization(context: &IdentityContext, required: &Role) -> AuthorizationExplanation {
    let required_level = roles::level(required).ok();
    let actual_level = roles::level(&context.role).ok();
    let granted = roles::has_role(&context.role, required);

    let reason = match (required_level, actual_level) {
        (None, _) => format!("required role '{required}' is not part of the hierarchy"),
        (_, None) => format!("caller role '{}' is not part of the hierarchy", context.role),
        (Some(req), Some(act)) if act >= req => {
            format!("role '{}' (level {act}) satisfies '{required}' (level {req})", context.role)
        }
        (Some(req), Some(act)) => {
            format!("role '{}' (level {act}) is below '{required}' (level {req})", context.role)
        }
    };

    AuthorizationExplanation {
        required_role: required.to_string(),
        actual_role: context.role.to_string(),
        required_level,
        actual_level,
        granted,
        reason,
    }
}
