use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Rank {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Senior")]
    pub name: String,
}
