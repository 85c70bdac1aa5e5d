use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use utoipa::ToSchema;

use crate::api::PageQuery;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::auth::password::hash_password;
use crate::utils::login_cache;

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "ivanov")]
    pub login: String,
    #[schema(example = "secret")]
    pub password: String,
    #[schema(example = 1)]
    pub role_id: i64,
    #[schema(example = 12)]
    pub employee_id: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update: every field is a distinct typed case; absent means
/// untouched. None of these columns are nullable, so one `Option` layer
/// covers the full case analysis.
#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    pub login: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub is_active: Option<bool>,
}

/// Account as exposed over the API; never carries the digest.
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub login: String,
    pub role_id: i64,
    #[schema(example = "admin")]
    pub role_name: String,
    pub employee_id: i64,
    pub is_active: bool,
}

const USER_RESPONSE_SQL: &str = r#"
    SELECT u.id, u.login, u.role_id, r.name AS role_name, u.employee_id, u.is_active
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

async fn fetch_user(conn: &mut SqliteConnection, id: i64) -> ApiResult<Option<UserResponse>> {
    let sql = format!("{USER_RESPONSE_SQL} WHERE u.id = ?");
    let row = sqlx::query_as::<_, UserResponse>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

async fn login_taken(conn: &mut SqliteConnection, login: &str) -> ApiResult<bool> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE login = ?)")
        .bind(login)
        .fetch_one(conn)
        .await?;
    Ok(taken)
}

/// List users
#[utoipa::path(
    get,
    path = "/users",
    params(PageQuery),
    responses((status = 200, description = "User list", body = [UserResponse])),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let (skip, limit) = query.bounds();

    let sql = format!("{USER_RESPONSE_SQL} ORDER BY u.id LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, UserResponse>(&sql)
        .bind(limit)
        .bind(skip)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id", Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let mut conn = pool.acquire().await?;
    let user = fetch_user(&mut *conn, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Create user account bound 1:1 to an employee (admin only)
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Login taken or employee already has an account"),
        (status = 400, description = "Role or employee not found"),
        (status = 403, description = "Admin only")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateUser>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;

    let login = payload.login.trim();
    if login.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Login and password must not be empty".to_string(),
        ));
    }

    // Fast in-memory check; the transactional check below is authoritative.
    if login_cache::is_taken(login).await {
        return Err(ApiError::Conflict(format!("Login '{login}' already taken")));
    }

    let mut tx = pool.begin().await?;

    if login_taken(&mut *tx, login).await? {
        return Err(ApiError::Conflict(format!("Login '{login}' already taken")));
    }

    let role_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE id = ?)")
        .bind(payload.role_id)
        .fetch_one(&mut *tx)
        .await?;
    if !role_exists {
        return Err(ApiError::InvalidReference(format!(
            "Role {} not found",
            payload.role_id
        )));
    }

    let employee_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
            .bind(payload.employee_id)
            .fetch_one(&mut *tx)
            .await?;
    if !employee_exists {
        return Err(ApiError::InvalidReference(format!(
            "Employee {} not found",
            payload.employee_id
        )));
    }

    // One account per employee.
    let already_bound: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE employee_id = ?)")
            .bind(payload.employee_id)
            .fetch_one(&mut *tx)
            .await?;
    if already_bound {
        return Err(ApiError::Conflict(format!(
            "Employee {} already has an account",
            payload.employee_id
        )));
    }

    let digest =
        hash_password(&payload.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (login, password, role_id, employee_id, is_active)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(login)
    .bind(&digest)
    .bind(payload.role_id)
    .bind(payload.employee_id)
    .bind(payload.is_active)
    .fetch_one(&mut *tx)
    .await?;

    let created = fetch_user(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::Internal("User vanished after insert".to_string()))?;

    tx.commit().await?;

    login_cache::mark_taken(login).await;
    info!(user_id = id, "User created");

    Ok(HttpResponse::Created().json(created))
}

/// Update user account fields (admin only, partial)
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id", Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 409, description = "Login taken or employee already bound"),
        (status = 400, description = "Role or employee not found"),
        (status = 403, description = "Admin only")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<UpdateUser>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let id = path.into_inner();

    let mut tx = pool.begin().await?;

    let current_login: String = sqlx::query_scalar("SELECT login FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let new_login = payload.login.as_deref().map(str::trim);
    if let Some(login) = new_login {
        if login.is_empty() {
            return Err(ApiError::Validation("Login must not be empty".to_string()));
        }
        if login != current_login && login_taken(&mut *tx, login).await? {
            return Err(ApiError::Conflict(format!("Login '{login}' already taken")));
        }
    }

    if let Some(role_id) = payload.role_id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE id = ?)")
            .bind(role_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(ApiError::InvalidReference(format!(
                "Role {role_id} not found"
            )));
        }
    }

    if let Some(employee_id) = payload.employee_id {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
                .bind(employee_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(ApiError::InvalidReference(format!(
                "Employee {employee_id} not found"
            )));
        }
        let bound_elsewhere: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE employee_id = ? AND id <> ?)",
        )
        .bind(employee_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if bound_elsewhere {
            return Err(ApiError::Conflict(format!(
                "Employee {employee_id} already has an account"
            )));
        }
    }

    let digest = match &payload.password {
        Some(p) if p.is_empty() => {
            return Err(ApiError::Validation(
                "Password must not be empty".to_string(),
            ))
        }
        Some(p) => Some(hash_password(p).map_err(|e| ApiError::Internal(e.to_string()))?),
        None => None,
    };

    sqlx::query(
        r#"
        UPDATE users SET
            login = COALESCE(?, login),
            password = COALESCE(?, password),
            role_id = COALESCE(?, role_id),
            employee_id = COALESCE(?, employee_id),
            is_active = COALESCE(?, is_active)
        WHERE id = ?
        "#,
    )
    .bind(new_login)
    .bind(&digest)
    .bind(payload.role_id)
    .bind(payload.employee_id)
    .bind(payload.is_active)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let updated = fetch_user(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    tx.commit().await?;

    // Keep the taken-login cache coherent across renames.
    if let Some(login) = new_login {
        if login != current_login {
            login_cache::forget(&current_login).await;
            login_cache::mark_taken(login).await;
        }
    }

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete user account (admin only)
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id", Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 403, description = "Admin only")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let id = path.into_inner();

    let mut tx = pool.begin().await?;

    let login: String = sqlx::query_scalar("SELECT login FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    login_cache::forget(&login).await;

    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}
