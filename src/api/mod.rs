use serde::Deserialize;
use utoipa::IntoParams;

pub mod department;
pub mod employee;
pub mod position;
pub mod rank;
pub mod role;
pub mod schedule_doc;
pub mod user;
pub mod vacation;

/// Offset pagination shared by every list endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Rows to skip
    pub skip: Option<i64>,
    /// Max rows to return
    pub limit: Option<i64>,
}

impl PageQuery {
    /// `(skip, limit)` with defaults applied and the limit clamped.
    pub fn bounds(&self) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(100).clamp(1, 500);
        (skip, limit)
    }
}
