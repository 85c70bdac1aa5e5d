use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::PageQuery;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::department::Department;

#[derive(Deserialize, ToSchema)]
pub struct DepartmentPayload {
    #[schema(example = "Engineering")]
    pub name: String,
}

fn validated_name(raw: &str) -> ApiResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::Validation(
            "Department name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

/// List departments
#[utoipa::path(
    get,
    path = "/departments",
    params(PageQuery),
    responses((status = 200, description = "Department list", body = [Department])),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let (skip, limit) = query.bounds();

    let rows = sqlx::query_as::<_, Department>(
        "SELECT id, name FROM departments ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Get department by ID
#[utoipa::path(
    get,
    path = "/departments/{id}",
    params(("id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
pub async fn get_department(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let row = sqlx::query_as::<_, Department>("SELECT id, name FROM departments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Department"))?;

    Ok(HttpResponse::Ok().json(row))
}

/// Create department
#[utoipa::path(
    post,
    path = "/departments",
    request_body = DepartmentPayload,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 409, description = "Name already exists"),
        (status = 400, description = "Empty name")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<DepartmentPayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let name = validated_name(&payload.name)?;

    let mut tx = pool.begin().await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE name = ?)")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
    if exists {
        return Err(ApiError::Conflict(format!(
            "Department '{name}' already exists"
        )));
    }

    let id: i64 = sqlx::query_scalar("INSERT INTO departments (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(Department {
        id,
        name: name.to_string(),
    }))
}

/// Rename department
#[utoipa::path(
    put,
    path = "/departments/{id}",
    params(("id", Path, description = "Department ID")),
    request_body = DepartmentPayload,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Name already exists")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<DepartmentPayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();
    let name = validated_name(&payload.name)?;

    let mut tx = pool.begin().await?;

    let current: String = sqlx::query_scalar("SELECT name FROM departments WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Department"))?;

    // Keeping the current name is not a conflict.
    if current != name {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE name = ?)")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            return Err(ApiError::Conflict(format!(
                "Department '{name}' already exists"
            )));
        }
    }

    sqlx::query("UPDATE departments SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(Department {
        id,
        name: name.to_string(),
    }))
}

/// Delete department
#[utoipa::path(
    delete,
    path = "/departments/{id}",
    params(("id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 404, description = "Department not found")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Department"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Department deleted successfully" })))
}
