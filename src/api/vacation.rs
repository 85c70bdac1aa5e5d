use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use utoipa::ToSchema;

use crate::api::PageQuery;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::vacation::VacationPeriod;

/// Color used on calendars when the employee has none configured.
const DEFAULT_DISPLAY_COLOR: &str = "#ffffff";

#[derive(Deserialize, ToSchema)]
pub struct VacationPayload {
    #[schema(example = 12)]
    pub employee_id: i64,
    #[schema(example = "2025-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-06-14", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 14)]
    pub main_vacation_days: i64,
}

/// Calendar row for the supervisor view: one vacation period joined with
/// the subordinate it belongs to.
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct VacationWithEmployee {
    pub id: i64,
    pub employee_id: i64,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub main_vacation_days: i64,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub department_name: Option<String>,
    #[schema(example = "#ffffff")]
    pub display_color: String,
}

/// Department view row: adds staffing columns; anything missing on the
/// employee surfaces as null instead of failing the row.
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct VacationWithStaffing {
    pub id: i64,
    pub employee_id: i64,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub main_vacation_days: i64,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub department_name: Option<String>,
    pub rank_name: Option<String>,
    pub position_name: Option<String>,
    pub display_color: Option<String>,
}

/// Overlapping periods for one employee are allowed: this is a schedule,
/// not an allocator.
async fn validate_period(conn: &mut SqliteConnection, p: &VacationPayload) -> ApiResult<()> {
    if p.end_date < p.start_date {
        return Err(ApiError::Validation(
            "end_date cannot precede start_date".to_string(),
        ));
    }
    if p.main_vacation_days < 0 {
        return Err(ApiError::Validation(
            "main_vacation_days cannot be negative".to_string(),
        ));
    }

    let employee_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
            .bind(p.employee_id)
            .fetch_one(conn)
            .await?;
    if !employee_exists {
        return Err(ApiError::InvalidReference(format!(
            "Employee {} not found",
            p.employee_id
        )));
    }
    Ok(())
}

/// List vacation periods
#[utoipa::path(
    get,
    path = "/vacations",
    params(PageQuery),
    responses((status = 200, description = "Vacation period list", body = [VacationPeriod])),
    tag = "Vacations",
    security(("bearer_auth" = []))
)]
pub async fn list_vacations(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let (skip, limit) = query.bounds();

    let rows = sqlx::query_as::<_, VacationPeriod>(
        "SELECT * FROM vacation_periods ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Get vacation period by ID
#[utoipa::path(
    get,
    path = "/vacations/{id}",
    params(("id", Path, description = "Vacation period ID")),
    responses(
        (status = 200, description = "Vacation period found", body = VacationPeriod),
        (status = 404, description = "Vacation period not found")
    ),
    tag = "Vacations",
    security(("bearer_auth" = []))
)]
pub async fn get_vacation(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();

    let row = sqlx::query_as::<_, VacationPeriod>("SELECT * FROM vacation_periods WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Vacation period"))?;

    Ok(HttpResponse::Ok().json(row))
}

/// List vacation periods of one employee
#[utoipa::path(
    get,
    path = "/vacations/employee/{id}",
    params(("id", Path, description = "Employee ID")),
    responses((status = 200, description = "Vacation periods", body = [VacationPeriod])),
    tag = "Vacations",
    security(("bearer_auth" = []))
)]
pub async fn list_by_employee(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let employee_id = path.into_inner();

    let rows = sqlx::query_as::<_, VacationPeriod>(
        "SELECT * FROM vacation_periods WHERE employee_id = ? ORDER BY start_date, id",
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Vacation periods of a supervisor's direct reports (one level only)
#[utoipa::path(
    get,
    path = "/vacations/boss/{id}",
    params(("id", Path, description = "Supervisor employee ID")),
    responses((status = 200, description = "Denormalized calendar rows", body = [VacationWithEmployee])),
    tag = "Vacations",
    security(("bearer_auth" = []))
)]
pub async fn list_by_boss(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let boss_id = path.into_inner();

    let rows = sqlx::query_as::<_, VacationWithEmployee>(
        r#"
        SELECT v.id, v.employee_id, v.start_date, v.end_date, v.main_vacation_days,
               e.last_name, e.first_name, e.middle_name,
               d.name AS department_name,
               COALESCE(e.display_color, ?) AS display_color
        FROM vacation_periods v
        JOIN employees e ON e.id = v.employee_id
        LEFT JOIN departments d ON d.id = e.department_id
        WHERE e.supervisor_id = ?
        ORDER BY v.start_date, v.id
        "#,
    )
    .bind(DEFAULT_DISPLAY_COLOR)
    .bind(boss_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Vacation periods of a department's employees
#[utoipa::path(
    get,
    path = "/vacations/department/{id}",
    params(("id", Path, description = "Department ID")),
    responses((status = 200, description = "Denormalized staffing rows", body = [VacationWithStaffing])),
    tag = "Vacations",
    security(("bearer_auth" = []))
)]
pub async fn list_by_department(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let department_id = path.into_inner();

    let rows = sqlx::query_as::<_, VacationWithStaffing>(
        r#"
        SELECT v.id, v.employee_id, v.start_date, v.end_date, v.main_vacation_days,
               e.last_name, e.first_name, e.middle_name,
               d.name AS department_name,
               r.name AS rank_name,
               p.name AS position_name,
               e.display_color
        FROM vacation_periods v
        JOIN employees e ON e.id = v.employee_id
        LEFT JOIN departments d ON d.id = e.department_id
        LEFT JOIN ranks r ON r.id = e.rank_id
        LEFT JOIN positions p ON p.id = e.position_id
        WHERE e.department_id = ?
        ORDER BY v.start_date, v.id
        "#,
    )
    .bind(department_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Book vacation period
#[utoipa::path(
    post,
    path = "/vacations",
    request_body = VacationPayload,
    responses(
        (status = 201, description = "Vacation period created", body = VacationPeriod),
        (status = 400, description = "Invalid range, negative days or unknown employee")
    ),
    tag = "Vacations",
    security(("bearer_auth" = []))
)]
pub async fn create_vacation(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<VacationPayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let mut tx = pool.begin().await?;
    validate_period(&mut *tx, &payload).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO vacation_periods (employee_id, start_date, end_date, main_vacation_days)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.main_vacation_days)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(VacationPeriod {
        id,
        employee_id: payload.employee_id,
        start_date: payload.start_date,
        end_date: payload.end_date,
        main_vacation_days: payload.main_vacation_days,
    }))
}

/// Replace vacation period (full document)
#[utoipa::path(
    put,
    path = "/vacations/{id}",
    params(("id", Path, description = "Vacation period ID")),
    request_body = VacationPayload,
    responses(
        (status = 200, description = "Vacation period updated", body = VacationPeriod),
        (status = 404, description = "Vacation period not found"),
        (status = 400, description = "Invalid range, negative days or unknown employee")
    ),
    tag = "Vacations",
    security(("bearer_auth" = []))
)]
pub async fn update_vacation(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<VacationPayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let mut tx = pool.begin().await?;
    validate_period(&mut *tx, &payload).await?;

    let result = sqlx::query(
        r#"
        UPDATE vacation_periods
        SET employee_id = ?, start_date = ?, end_date = ?, main_vacation_days = ?
        WHERE id = ?
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.main_vacation_days)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Vacation period"));
    }

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(VacationPeriod {
        id,
        employee_id: payload.employee_id,
        start_date: payload.start_date,
        end_date: payload.end_date,
        main_vacation_days: payload.main_vacation_days,
    }))
}

/// Delete vacation period
#[utoipa::path(
    delete,
    path = "/vacations/{id}",
    params(("id", Path, description = "Vacation period ID")),
    responses(
        (status = 200, description = "Vacation period deleted"),
        (status = 404, description = "Vacation period not found")
    ),
    tag = "Vacations",
    security(("bearer_auth" = []))
)]
pub async fn delete_vacation(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM vacation_periods WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Vacation period"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Vacation period deleted successfully" })))
}
