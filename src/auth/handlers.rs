use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::auth::jwt::issue_token;
use crate::auth::password::verify_password;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::model::user::User;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ivanov")]
    pub login: String,
    #[schema(example = "secret")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

/// Login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 400, description = "Inactive account or empty credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, body), fields(login = %body.login))]
pub async fn login(
    body: web::Json<LoginRequest>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    if body.login.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::Validation(
            "Login and password are required".to_string(),
        ));
    }

    debug!("Fetching user");

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, login, password, role_id, employee_id, is_active
        FROM users
        WHERE login = ?
        "#,
    )
    .bind(&body.login)
    .fetch_optional(pool.get_ref())
    .await?;

    // Unknown login and wrong password must be indistinguishable.
    let user = match user {
        Some(u) if verify_password(&body.password, &u.password) => u,
        _ => {
            info!("Invalid credentials");
            return Err(ApiError::AuthFailure(INVALID_CREDENTIALS.to_string()));
        }
    };

    // Checked only after the password verified, so inactive accounts do
    // not leak existence to guessers.
    if !user.is_active {
        info!("Inactive account");
        return Err(ApiError::Inactive);
    }

    let access_token = issue_token(
        &user.login,
        user.id,
        user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("Login successful");

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
