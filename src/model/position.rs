use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Position {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Lead engineer")]
    pub name: String,
}
