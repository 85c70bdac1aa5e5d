use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct VacationPeriod {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = 12)]
    pub employee_id: i64,

    #[schema(example = "2025-06-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(example = "2025-06-14", value_type = String, format = "date")]
    pub end_date: NaiveDate,

    /// Days drawn from the main vacation allowance.
    #[schema(example = 14)]
    pub main_vacation_days: i64,
}
