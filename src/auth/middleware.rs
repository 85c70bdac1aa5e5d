use actix_web::body::BoxBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage, ResponseError};
use sqlx::SqlitePool;

use crate::auth::auth::{AccessRole, AuthUser};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;

const INVALID_TOKEN: &str = "Invalid or expired token";

#[derive(sqlx::FromRow)]
struct SubjectRow {
    id: i64,
    login: String,
    employee_id: i64,
    is_active: bool,
    role_name: String,
}

fn deny(req: ServiceRequest, err: ApiError) -> ServiceResponse<BoxBody> {
    let resp = err.error_response();
    req.into_response(resp)
}

/// Resolves the bearer token on every protected request.
///
/// Bad signature, expiry and unknown subject all collapse to one
/// indistinguishable 401; a resolved-but-inactive account is the only
/// distinct failure.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("App config missing".to_string()))?;
    let pool = req
        .app_data::<Data<SqlitePool>>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("Database pool missing".to_string()))?;

    let header_value = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);
    let Some(header_value) = header_value else {
        return Ok(deny(
            req,
            ApiError::AuthFailure("Missing Authorization header".to_string()),
        ));
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Ok(deny(req, ApiError::AuthFailure(INVALID_TOKEN.to_string())));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => return Ok(deny(req, ApiError::AuthFailure(INVALID_TOKEN.to_string()))),
    };

    // Subject lookup keeps role changes and deletions effective immediately.
    let subject = sqlx::query_as::<_, SubjectRow>(
        r#"
        SELECT u.id, u.login, u.employee_id, u.is_active, r.name AS role_name
        FROM users u
        JOIN roles r ON r.id = u.role_id
        WHERE u.login = ?
        "#,
    )
    .bind(&claims.sub)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let Some(subject) = subject else {
        return Ok(deny(req, ApiError::AuthFailure(INVALID_TOKEN.to_string())));
    };

    if !subject.is_active {
        return Ok(deny(
            req,
            ApiError::AuthFailure("Inactive account".to_string()),
        ));
    }

    req.extensions_mut().insert(AuthUser {
        user_id: subject.id,
        login: subject.login,
        employee_id: subject.employee_id,
        access: AccessRole::from_name(&subject.role_name),
    });

    next.call(req).await
}
