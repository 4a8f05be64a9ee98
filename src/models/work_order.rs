use chrono::{DateTime, Utc};
use serde::Serialize;

/// Parent repair job. Tasks and their accrued labor roll up here.
#[derive(Debug, Clone, Serialize)]
pub struct WorkOrder {
    pub id: String,
    pub workshop_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
