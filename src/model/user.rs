use serde::{Deserialize, Serialize};

/// Account row as stored. `password` is an argon2 digest, never plaintext.
/// Serialization of this struct is internal only. API responses go through
/// `api::user::UserResponse`, which drops the digest.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub password: String,
    pub role_id: i64,
    pub employee_id: i64,
    pub is_active: bool,
}
