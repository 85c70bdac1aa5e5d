use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::PageQuery;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::rank::Rank;

#[derive(Deserialize, ToSchema)]
pub struct RankPayload {
    #[schema(example = "Senior")]
    pub name: String,
}

fn validated_name(raw: &str) -> ApiResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::Validation(
            "Rank name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

/// List ranks
#[utoipa::path(
    get,
    path = "/ranks",
    params(PageQuery),
    responses((status = 200, description = "Rank list", body = [Rank])),
    tag = "Ranks",
    security(("bearer_auth" = []))
)]
pub async fn list_ranks(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let (skip, limit) = query.bounds();

    let rows = sqlx::query_as::<_, Rank>(
        "SELECT id, name FROM ranks ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Get rank by ID
#[utoipa::path(
    get,
    path = "/ranks/{id}",
    params(("id", Path, description = "Rank ID")),
    responses(
        (status = 200, description = "Rank found", body = Rank),
        (status = 404, description = "Rank not found")
    ),
    tag = "Ranks",
    security(("bearer_auth" = []))
)]
pub async fn get_rank(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let row = sqlx::query_as::<_, Rank>("SELECT id, name FROM ranks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Rank"))?;

    Ok(HttpResponse::Ok().json(row))
}

/// Create rank
#[utoipa::path(
    post,
    path = "/ranks",
    request_body = RankPayload,
    responses(
        (status = 201, description = "Rank created", body = Rank),
        (status = 409, description = "Name already exists"),
        (status = 400, description = "Empty name")
    ),
    tag = "Ranks",
    security(("bearer_auth" = []))
)]
pub async fn create_rank(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<RankPayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let name = validated_name(&payload.name)?;

    let mut tx = pool.begin().await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ranks WHERE name = ?)")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
    if exists {
        return Err(ApiError::Conflict(format!(
            "Rank '{name}' already exists"
        )));
    }

    let id: i64 = sqlx::query_scalar("INSERT INTO ranks (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(Rank {
        id,
        name: name.to_string(),
    }))
}

/// Rename rank
#[utoipa::path(
    put,
    path = "/ranks/{id}",
    params(("id", Path, description = "Rank ID")),
    request_body = RankPayload,
    responses(
        (status = 200, description = "Rank updated", body = Rank),
        (status = 404, description = "Rank not found"),
        (status = 409, description = "Name already exists")
    ),
    tag = "Ranks",
    security(("bearer_auth" = []))
)]
pub async fn update_rank(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<RankPayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();
    let name = validated_name(&payload.name)?;

    let mut tx = pool.begin().await?;

    let current: String = sqlx::query_scalar("SELECT name FROM ranks WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Rank"))?;

    // Keeping the current name is not a conflict.
    if current != name {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ranks WHERE name = ?)")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            return Err(ApiError::Conflict(format!(
                "Rank '{name}' already exists"
            )));
        }
    }

    sqlx::query("UPDATE ranks SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(Rank {
        id,
        name: name.to_string(),
    }))
}

/// Delete rank
#[utoipa::path(
    delete,
    path = "/ranks/{id}",
    params(("id", Path, description = "Rank ID")),
    responses(
        (status = 200, description = "Rank deleted"),
        (status = 404, description = "Rank not found")
    ),
    tag = "Ranks",
    security(("bearer_auth" = []))
)]
pub async fn delete_rank(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM ranks WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Rank"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Rank deleted successfully" })))
}
