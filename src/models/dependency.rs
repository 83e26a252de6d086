use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// `task_id` waits on `depends_on_task_id`.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskDependency {
    #[serde(rename = "id")]
    pub dependency_id: String,
    pub task_id: String,
    pub depends_on_task_id: String,
    pub dependency_type: String,
    pub created_at: DateTime<Utc>,
}
