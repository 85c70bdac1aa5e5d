use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "last_name": "Petrova",
        "first_name": "Anna",
        "middle_name": null,
        "hire_date": "2021-03-15",
        "dismissal_date": null,
        "display_color": "#4f86c6",
        "is_active": true,
        "department_id": 2,
        "position_id": 3,
        "rank_id": null,
        "supervisor_id": 7
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "Petrova")]
    pub last_name: String,

    #[schema(example = "Anna")]
    pub first_name: String,

    #[schema(nullable = true)]
    pub middle_name: Option<String>,

    #[schema(example = "2021-03-15", value_type = String, format = "date")]
    pub hire_date: NaiveDate,

    #[schema(value_type = Option<String>, format = "date", nullable = true)]
    pub dismissal_date: Option<NaiveDate>,

    /// Calendar color for schedule rendering.
    #[schema(example = "#4f86c6", nullable = true)]
    pub display_color: Option<String>,

    pub is_active: bool,

    pub department_id: Option<i64>,
    pub position_id: Option<i64>,
    pub rank_id: Option<i64>,

    /// Direct supervisor; resolved by indexed lookup, never embedded
    /// as an object reference.
    pub supervisor_id: Option<i64>,
}
