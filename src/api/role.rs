use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::PageQuery;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct RolePayload {
    #[schema(example = "admin")]
    pub name: String,
}

fn validated_name(raw: &str) -> ApiResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::Validation(
            "Role name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

/// List roles
#[utoipa::path(
    get,
    path = "/roles",
    params(PageQuery),
    responses((status = 200, description = "Role list", body = [Role])),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn list_roles(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let (skip, limit) = query.bounds();

    let rows = sqlx::query_as::<_, Role>(
        "SELECT id, name FROM roles ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Get role by ID
#[utoipa::path(
    get,
    path = "/roles/{id}",
    params(("id", Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role found", body = Role),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn get_role(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let row = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Role"))?;

    Ok(HttpResponse::Ok().json(row))
}

/// Create role
#[utoipa::path(
    post,
    path = "/roles",
    request_body = RolePayload,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Name already exists"),
        (status = 400, description = "Empty name")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn create_role(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<RolePayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let name = validated_name(&payload.name)?;

    let mut tx = pool.begin().await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE name = ?)")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
    if exists {
        return Err(ApiError::Conflict(format!(
            "Role '{name}' already exists"
        )));
    }

    let id: i64 = sqlx::query_scalar("INSERT INTO roles (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(Role {
        id,
        name: name.to_string(),
    }))
}

/// Rename role
#[utoipa::path(
    put,
    path = "/roles/{id}",
    params(("id", Path, description = "Role ID")),
    request_body = RolePayload,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Name already exists")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn update_role(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<RolePayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();
    let name = validated_name(&payload.name)?;

    let mut tx = pool.begin().await?;

    let current: String = sqlx::query_scalar("SELECT name FROM roles WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Role"))?;

    // Keeping the current name is not a conflict.
    if current != name {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE name = ?)")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            return Err(ApiError::Conflict(format!(
                "Role '{name}' already exists"
            )));
        }
    }

    sqlx::query("UPDATE roles SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(Role {
        id,
        name: name.to_string(),
    }))
}

/// Delete role
#[utoipa::path(
    delete,
    path = "/roles/{id}",
    params(("id", Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn delete_role(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    // A role still referenced by users fails the FK check and surfaces
    // as a conflict, not a dangling reference.
    let result = sqlx::query("DELETE FROM roles WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Role"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Role deleted successfully" })))
}
