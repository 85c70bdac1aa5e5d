use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::api::PageQuery;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::position::Position;
use crate::model::rank::Rank;
use crate::utils::login_cache;

/// Full-document payload, used for both create and replace.
#[derive(Deserialize, ToSchema)]
pub struct EmployeePayload {
    #[schema(example = "Petrova")]
    pub last_name: String,
    #[schema(example = "Anna")]
    pub first_name: String,
    pub middle_name: Option<String>,
    #[schema(example = "2021-03-15", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(format = "date", value_type = Option<String>)]
    pub dismissal_date: Option<NaiveDate>,
    #[schema(example = "#4f86c6")]
    pub display_color: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub department_id: Option<i64>,
    pub position_id: Option<i64>,
    pub rank_id: Option<i64>,
    pub supervisor_id: Option<i64>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExpandQuery {
    /// Comma-separated set of relations to embed:
    /// department, position, rank, supervisor, subordinates
    pub expand: Option<String>,
}

#[derive(Debug, Default)]
struct ExpandSet {
    department: bool,
    position: bool,
    rank: bool,
    supervisor: bool,
    subordinates: bool,
}

impl ExpandSet {
    fn parse(raw: Option<&str>) -> ApiResult<Self> {
        let mut set = Self::default();
        let Some(raw) = raw else {
            return Ok(set);
        };
        for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            match key {
                "department" => set.department = true,
                "position" => set.position = true,
                "rank" => set.rank = true,
                "supervisor" => set.supervisor = true,
                "subordinates" => set.subordinates = true,
                other => {
                    return Err(ApiError::Validation(format!(
                        "Unknown expand key '{other}' \
                         (allowed: department, position, rank, supervisor, subordinates)"
                    )))
                }
            }
        }
        Ok(set)
    }
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: Employee,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<Employee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subordinates: Option<Vec<Employee>>,
}

async fn ensure_exists(
    conn: &mut SqliteConnection,
    table: &str,
    id: i64,
    what: &str,
) -> ApiResult<()> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)");
    let exists: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(conn).await?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::InvalidReference(format!("{what} {id} not found")))
    }
}

/// Reject a `supervisor_id` whose chain would lead back to the employee.
/// Stored data is acyclic, so the walk terminates at a root.
async fn ensure_no_supervisor_cycle(
    conn: &mut SqliteConnection,
    employee_id: i64,
    supervisor_id: i64,
) -> ApiResult<()> {
    let mut cursor = Some(supervisor_id);
    while let Some(current) = cursor {
        if current == employee_id {
            return Err(ApiError::Validation(
                "Employee cannot be supervised by itself or a subordinate".to_string(),
            ));
        }
        cursor = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT supervisor_id FROM employees WHERE id = ?",
        )
        .bind(current)
        .fetch_optional(&mut *conn)
        .await?
        .flatten();
    }
    Ok(())
}

/// Every reference on the payload must resolve before any write.
async fn validate_references(
    conn: &mut SqliteConnection,
    payload: &EmployeePayload,
    employee_id: Option<i64>,
) -> ApiResult<()> {
    if let Some(id) = payload.department_id {
        ensure_exists(conn, "departments", id, "Department").await?;
    }
    if let Some(id) = payload.position_id {
        ensure_exists(conn, "positions", id, "Position").await?;
    }
    if let Some(id) = payload.rank_id {
        ensure_exists(conn, "ranks", id, "Rank").await?;
    }
    if let Some(id) = payload.supervisor_id {
        ensure_exists(conn, "employees", id, "Supervisor").await?;
        if let Some(employee_id) = employee_id {
            ensure_no_supervisor_cycle(conn, employee_id, id).await?;
        }
    }
    if payload.end_before_start() {
        return Err(ApiError::Validation(
            "dismissal_date cannot precede hire_date".to_string(),
        ));
    }
    Ok(())
}

impl EmployeePayload {
    fn end_before_start(&self) -> bool {
        matches!(self.dismissal_date, Some(d) if d < self.hire_date)
    }
}

async fn fetch_employee(conn: &mut SqliteConnection, id: i64) -> ApiResult<Option<Employee>> {
    let row = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// List employees
#[utoipa::path(
    get,
    path = "/employees",
    params(PageQuery),
    responses((status = 200, description = "Employee list", body = [Employee])),
    tag = "Employees",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let (skip, limit) = query.bounds();

    let rows = sqlx::query_as::<_, Employee>(
        "SELECT * FROM employees ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Get employee by ID, optionally embedding related records
#[utoipa::path(
    get,
    path = "/employees/{id}",
    params(("id", Path, description = "Employee ID"), ExpandQuery),
    responses(
        (status = 200, description = "Employee found", body = EmployeeDetail),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employees",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    query: web::Query<ExpandQuery>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let expand = ExpandSet::parse(query.expand.as_deref())?;

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Employee"))?;

    let mut detail = EmployeeDetail {
        department: None,
        position: None,
        rank: None,
        supervisor: None,
        subordinates: None,
        employee,
    };

    if expand.department {
        if let Some(dep_id) = detail.employee.department_id {
            detail.department =
                sqlx::query_as::<_, Department>("SELECT id, name FROM departments WHERE id = ?")
                    .bind(dep_id)
                    .fetch_optional(pool.get_ref())
                    .await?;
        }
    }
    if expand.position {
        if let Some(pos_id) = detail.employee.position_id {
            detail.position =
                sqlx::query_as::<_, Position>("SELECT id, name FROM positions WHERE id = ?")
                    .bind(pos_id)
                    .fetch_optional(pool.get_ref())
                    .await?;
        }
    }
    if expand.rank {
        if let Some(rank_id) = detail.employee.rank_id {
            detail.rank = sqlx::query_as::<_, Rank>("SELECT id, name FROM ranks WHERE id = ?")
                .bind(rank_id)
                .fetch_optional(pool.get_ref())
                .await?;
        }
    }
    if expand.supervisor {
        if let Some(sup_id) = detail.employee.supervisor_id {
            detail.supervisor =
                sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
                    .bind(sup_id)
                    .fetch_optional(pool.get_ref())
                    .await?;
        }
    }
    if expand.subordinates {
        let rows = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE supervisor_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(pool.get_ref())
        .await?;
        detail.subordinates = Some(rows);
    }

    Ok(HttpResponse::Ok().json(detail))
}

/// List direct reports of a supervisor (one level, never transitive)
#[utoipa::path(
    get,
    path = "/employees/supervisor/{id}",
    params(("id", Path, description = "Supervisor employee ID")),
    responses((status = 200, description = "Direct reports", body = [Employee])),
    tag = "Employees",
    security(("bearer_auth" = []))
)]
pub async fn list_by_supervisor(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let supervisor_id = path.into_inner();

    let rows = sqlx::query_as::<_, Employee>(
        "SELECT * FROM employees WHERE supervisor_id = ? ORDER BY id",
    )
    .bind(supervisor_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Create employee
#[utoipa::path(
    post,
    path = "/employees",
    request_body = EmployeePayload,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Related entity not found or invalid dates")
    ),
    tag = "Employees",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<EmployeePayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let mut tx = pool.begin().await?;
    validate_references(&mut *tx, &payload, None).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO employees
            (last_name, first_name, middle_name, hire_date, dismissal_date,
             display_color, is_active, department_id, position_id, rank_id, supervisor_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&payload.last_name)
    .bind(&payload.first_name)
    .bind(&payload.middle_name)
    .bind(payload.hire_date)
    .bind(payload.dismissal_date)
    .bind(&payload.display_color)
    .bind(payload.is_active)
    .bind(payload.department_id)
    .bind(payload.position_id)
    .bind(payload.rank_id)
    .bind(payload.supervisor_id)
    .fetch_one(&mut *tx)
    .await?;

    let created = fetch_employee(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::Internal("Employee vanished after insert".to_string()))?;

    tx.commit().await?;

    debug!(employee_id = id, "Employee created");
    Ok(HttpResponse::Created().json(created))
}

/// Replace employee (full document)
#[utoipa::path(
    put,
    path = "/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    request_body = EmployeePayload,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 400, description = "Related entity not found or supervisor cycle")
    ),
    tag = "Employees",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<EmployeePayload>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let mut tx = pool.begin().await?;

    if fetch_employee(&mut *tx, id).await?.is_none() {
        return Err(ApiError::not_found("Employee"));
    }
    validate_references(&mut *tx, &payload, Some(id)).await?;

    sqlx::query(
        r#"
        UPDATE employees SET
            last_name = ?, first_name = ?, middle_name = ?, hire_date = ?,
            dismissal_date = ?, display_color = ?, is_active = ?,
            department_id = ?, position_id = ?, rank_id = ?, supervisor_id = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.last_name)
    .bind(&payload.first_name)
    .bind(&payload.middle_name)
    .bind(payload.hire_date)
    .bind(payload.dismissal_date)
    .bind(&payload.display_color)
    .bind(payload.is_active)
    .bind(payload.department_id)
    .bind(payload.position_id)
    .bind(payload.rank_id)
    .bind(payload.supervisor_id)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let updated = fetch_employee(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee"))?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete employee, cascading to its user account and detaching
/// direct reports
#[utoipa::path(
    delete,
    path = "/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deleted"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employees",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let mut tx = pool.begin().await?;

    // Bound account goes with the employee; remember the login for
    // cache eviction after commit.
    let bound_login: Option<String> =
        sqlx::query_scalar("SELECT login FROM users WHERE employee_id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

    sqlx::query("DELETE FROM users WHERE employee_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    // Ledger rows are meaningless without their employee.
    sqlx::query("DELETE FROM vacation_periods WHERE employee_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    // Policy: direct reports are detached, never left dangling.
    sqlx::query("UPDATE employees SET supervisor_id = NULL WHERE supervisor_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Employee"));
    }

    tx.commit().await?;

    if let Some(login) = bound_login {
        login_cache::forget(&login).await;
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deleted successfully" })))
}
