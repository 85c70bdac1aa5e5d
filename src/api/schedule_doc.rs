use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ScheduleQuery {
    /// Department to export
    pub department_id: i64,
    /// Calendar year the schedule covers
    pub year: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct YearQuery {
    /// Calendar year the schedule covers
    pub year: i32,
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    position_name: Option<String>,
    last_name: String,
    first_name: String,
    middle_name: Option<String>,
    main_vacation_days: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

fn year_bounds(year: i32) -> ApiResult<(NaiveDate, NaiveDate)> {
    let from = NaiveDate::from_ymd_opt(year, 1, 1);
    let to = NaiveDate::from_ymd_opt(year, 12, 31);
    match (from, to) {
        (Some(from), Some(to)) => Ok((from, to)),
        _ => Err(ApiError::Validation(format!("Invalid year {year}"))),
    }
}

async fn department_rows(
    pool: &SqlitePool,
    department_id: i64,
    year: i32,
) -> ApiResult<Vec<ScheduleRow>> {
    let (from, to) = year_bounds(year)?;

    let rows = sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT p.name AS position_name, e.last_name, e.first_name, e.middle_name,
               v.main_vacation_days, v.start_date, v.end_date
        FROM vacation_periods v
        JOIN employees e ON e.id = v.employee_id
        LEFT JOIN positions p ON p.id = e.position_id
        WHERE e.department_id = ? AND v.start_date >= ? AND v.end_date <= ?
        ORDER BY e.last_name, e.first_name, v.start_date
        "#,
    )
    .bind(department_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::Export(e.to_string()))?;

    Ok(rows)
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Keep generated filenames portable across user agents.
fn filename_fragment(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

fn push_section(doc: &mut String, department: &str, rows: &[ScheduleRow]) {
    doc.push_str(&format!(
        "<h3 style=\"text-align:center\">Department: {}</h3>\n",
        escape(department)
    ));

    if rows.is_empty() {
        doc.push_str("<p>No vacation data.</p>\n");
        return;
    }

    doc.push_str("<table border=\"1\" cellspacing=\"0\" cellpadding=\"4\" style=\"border-collapse:collapse\">\n");
    doc.push_str(
        "<tr><th>Position</th><th>Last name</th><th>First name</th>\
         <th>Middle name</th><th>Days</th><th>Period</th></tr>\n",
    );
    for row in rows {
        let period = format!(
            "{} - {}",
            row.start_date.format("%d.%m.%Y"),
            row.end_date.format("%d.%m.%Y")
        );
        doc.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(row.position_name.as_deref().unwrap_or("Not specified")),
            escape(&row.last_name),
            escape(&row.first_name),
            escape(row.middle_name.as_deref().unwrap_or("")),
            row.main_vacation_days,
            period,
        ));
    }
    doc.push_str("</table>\n");
}

/// Word-compatible HTML document. The word processor integration is
/// interface-only: a binary stream served as an attachment.
fn render_schedule_doc(year: i32, sections: &[(String, Vec<ScheduleRow>)]) -> String {
    let mut doc = String::new();
    doc.push_str(
        "<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" \
         xmlns:w=\"urn:schemas-microsoft-com:office:word\">\n\
         <head><meta charset=\"utf-8\"><title>Vacation schedule</title></head>\n<body>\n",
    );
    doc.push_str(&format!(
        "<h2 style=\"text-align:center\">Vacation schedule for {year}</h2>\n"
    ));

    for (i, (department, rows)) in sections.iter().enumerate() {
        if i > 0 {
            doc.push_str("<br style=\"page-break-before:always\">\n");
        }
        push_section(&mut doc, department, rows);
    }

    doc.push_str("<p>&nbsp;</p>\n<p>Head of department: _____________________________</p>\n");
    doc.push_str("</body></html>\n");
    doc
}

fn doc_response(filename: &str, body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/msword")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(body)
}

/// Export one department's vacation schedule as a printable document
#[utoipa::path(
    post,
    path = "/generate/vacation-schedule",
    params(ScheduleQuery),
    responses(
        (status = 200, description = "Document stream", content_type = "application/msword"),
        (status = 404, description = "Department missing or no data for the year"),
        (status = 500, description = "Export failed")
    ),
    tag = "Generate",
    security(("bearer_auth" = []))
)]
pub async fn generate_department_schedule(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<ScheduleQuery>,
) -> ApiResult<HttpResponse> {
    let department: String = sqlx::query_scalar("SELECT name FROM departments WHERE id = ?")
        .bind(query.department_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| ApiError::Export(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Department"))?;

    let rows = department_rows(pool.get_ref(), query.department_id, query.year).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound(
            "No vacation data for the selected department and year".to_string(),
        ));
    }

    let filename = format!(
        "vacation_schedule_{}_{}.doc",
        query.year,
        filename_fragment(&department)
    );
    let body = render_schedule_doc(query.year, &[(department, rows)]);

    Ok(doc_response(&filename, body))
}

/// Export every department's vacation schedule in one document
#[utoipa::path(
    post,
    path = "/generate/vacation-schedule/all",
    params(YearQuery),
    responses(
        (status = 200, description = "Document stream", content_type = "application/msword"),
        (status = 404, description = "No departments exist"),
        (status = 500, description = "Export failed")
    ),
    tag = "Generate",
    security(("bearer_auth" = []))
)]
pub async fn generate_full_schedule(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<YearQuery>,
) -> ApiResult<HttpResponse> {
    let departments =
        sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM departments ORDER BY name")
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| ApiError::Export(e.to_string()))?;
    if departments.is_empty() {
        return Err(ApiError::NotFound("No departments exist".to_string()));
    }

    let mut sections = Vec::with_capacity(departments.len());
    for (id, name) in departments {
        let rows = department_rows(pool.get_ref(), id, query.year).await?;
        sections.push((name, rows));
    }

    let filename = format!("vacation_schedule_{}_all_departments.doc", query.year);
    let body = render_schedule_doc(query.year, &sections);

    Ok(doc_response(&filename, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> ScheduleRow {
        ScheduleRow {
            position_name: Some("Lead engineer".to_string()),
            last_name: "Petrova".to_string(),
            first_name: "Anna".to_string(),
            middle_name: None,
            main_vacation_days: 14,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
        }
    }

    #[test]
    fn renders_rows_and_period_format() {
        let doc = render_schedule_doc(2025, &[("Engineering".to_string(), vec![sample_row()])]);
        assert!(doc.contains("Vacation schedule for 2025"));
        assert!(doc.contains("Department: Engineering"));
        assert!(doc.contains("<td>Petrova</td>"));
        assert!(doc.contains("01.06.2025 - 14.06.2025"));
        assert!(doc.contains("<td>14</td>"));
    }

    #[test]
    fn empty_section_renders_placeholder() {
        let doc = render_schedule_doc(2025, &[("Archive".to_string(), vec![])]);
        assert!(doc.contains("No vacation data."));
        assert!(!doc.contains("<table"));
    }

    #[test]
    fn markup_in_names_is_escaped() {
        let mut row = sample_row();
        row.last_name = "<b>Petrova</b>".to_string();
        let doc = render_schedule_doc(2025, &[("R&D".to_string(), vec![row])]);
        assert!(doc.contains("&lt;b&gt;Petrova&lt;/b&gt;"));
        assert!(doc.contains("R&amp;D"));
    }

    #[test]
    fn filenames_stay_portable() {
        assert_eq!(filename_fragment("R&D / Design"), "R_D___Design");
        assert_eq!(filename_fragment("Engineering"), "Engineering");
    }

    #[test]
    fn year_bounds_cover_the_whole_year() {
        let (from, to) = year_bounds(2025).unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert!(year_bounds(i32::MAX).is_err());
    }
}
