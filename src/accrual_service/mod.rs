pub mod client;
pub mod mapper;

use serde::{Deserialize, Serialize};
use crate::types::points::Points;

pub use client::AccrualClient;
pub use mapper::map_status;

/// Body of a 200 answer from `GET /api/orders/{number}`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: String,
    /// Absent until the accrual service has awarded points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

impl AccrualResponse {
    pub fn awarded(&self) -> Points {
        self.accrual.unwrap_or_else(Points::zero)
    }
}
