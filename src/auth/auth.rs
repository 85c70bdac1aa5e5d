use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};

use crate::error::ApiError;

/// Closed set of capability-bearing roles. Role rows are free-form
/// reference data; only names mapping here grant anything. New roles are
/// a deliberate extension of this enum, not a string match.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessRole {
    Admin,
    Hr,
    Employee,
}

impl AccessRole {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "admin" => Some(AccessRole::Admin),
            "hr" => Some(AccessRole::Hr),
            "employee" => Some(AccessRole::Employee),
            _ => None,
        }
    }
}

/// Identity resolved by the auth middleware for the current request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub login: String,
    pub employee_id: i64,

    /// `None` when the account's role name maps to no known capability set;
    /// such callers are authenticated but can only read.
    pub access: Option<AccessRole>,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.access == Some(AccessRole::Admin) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin only".to_string()))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), ApiError> {
        if matches!(self.access, Some(AccessRole::Admin | AccessRole::Hr)) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("HR/Admin only".to_string()))
        }
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ApiError::AuthFailure("Not authenticated".to_string())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_map_case_insensitively() {
        assert_eq!(AccessRole::from_name("admin"), Some(AccessRole::Admin));
        assert_eq!(AccessRole::from_name("Admin"), Some(AccessRole::Admin));
        assert_eq!(AccessRole::from_name("HR"), Some(AccessRole::Hr));
        assert_eq!(AccessRole::from_name("employee"), Some(AccessRole::Employee));
        assert_eq!(AccessRole::from_name("auditor"), None);
    }

    #[test]
    fn capability_checks() {
        let admin = AuthUser {
            user_id: 1,
            login: "root".to_string(),
            employee_id: 1,
            access: Some(AccessRole::Admin),
        };
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_hr_or_admin().is_ok());

        let hr = AuthUser {
            access: Some(AccessRole::Hr),
            ..admin.clone()
        };
        assert!(hr.require_admin().is_err());
        assert!(hr.require_hr_or_admin().is_ok());

        let unknown = AuthUser {
            access: None,
            ..admin
        };
        assert!(unknown.require_admin().is_err());
        assert!(unknown.require_hr_or_admin().is_err());
    }
}
