use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::PageQuery;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::position::Position;

#[derive(Deserialize, ToSchema)]
pub struct PositionPayload {
    #[schema(example = "Lead engineer")]
    pub name: String,
}

fn validated_name(raw: &str) -> ApiResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::Validation(
            "Position name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

/// List positions
#[utoipa::path(
    get,
    path = "/positions",
    params(PageQuery),
    responses((status = 200, description = "Position list", body = [Position])),
    tag = "Positions",
    security(("bearer_auth" = []))
)]
pub async fn list_positions(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let (skip, limit) = query.bounds();

    let rows = sqlx::query_as::<_, Position>(
        "SELECT id, name FROM positions ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Get position by ID
#[utoipa::path(
    get,
    path = "/positions/{id}",
    params(("id", Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position found", body = Position),
        (status = 404, description = "Position not found")
    ),
    tag = "Positions",
    security(("bearer_auth" = []))
)]
pub async fn get_position(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let row = sqlx::query_as::<_, Position>("SELECT id, name FROM positions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Position"))?;

    Ok(HttpResponse::Ok().json(row))
}

/// Create position
#[utoipa::path(
    post,
    path = "/positions",
    request_body = PositionPayload,
    responses(
        (status = 201, description = "Position created", body = Position),
        (status = 409, description = "Name already exists"),
        (status = 400, description = "Empty name")
    ),
    tag = "Positions",
    security(("bearer_auth" = []))
)]
pub async fn create_position(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<PositionPayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let name = validated_name(&payload.name)?;

    let mut tx = pool.begin().await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM positions WHERE name = ?)")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
    if exists {
        return Err(ApiError::Conflict(format!(
            "Position '{name}' already exists"
        )));
    }

    let id: i64 = sqlx::query_scalar("INSERT INTO positions (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(Position {
        id,
        name: name.to_string(),
    }))
}

/// Rename position
#[utoipa::path(
    put,
    path = "/positions/{id}",
    params(("id", Path, description = "Position ID")),
    request_body = PositionPayload,
    responses(
        (status = 200, description = "Position updated", body = Position),
        (status = 404, description = "Position not found"),
        (status = 409, description = "Name already exists")
    ),
    tag = "Positions",
    security(("bearer_auth" = []))
)]
pub async fn update_position(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<PositionPayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();
    let name = validated_name(&payload.name)?;

    let mut tx = pool.begin().await?;

    let current: String = sqlx::query_scalar("SELECT name FROM positions WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Position"))?;

    // Keeping the current name is not a conflict.
    if current != name {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM positions WHERE name = ?)")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            return Err(ApiError::Conflict(format!(
                "Position '{name}' already exists"
            )));
        }
    }

    sqlx::query("UPDATE positions SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(Position {
        id,
        name: name.to_string(),
    }))
}

/// Delete position
#[utoipa::path(
    delete,
    path = "/positions/{id}",
    params(("id", Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position deleted"),
        (status = 404, description = "Position not found")
    ),
    tag = "Positions",
    security(("bearer_auth" = []))
)]
pub async fn delete_position(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM positions WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Position"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Position deleted successfully" })))
}
