use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, MySqlPool};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "id")]
    pub project_id: String,
    #[serde(skip_serializing)]
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub order_number: Option<String>,
    pub customer_name: Option<String>,
    pub sachbearbeiter: Option<String>,
    pub installation_location: Option<String>,
    pub contact_name: Option<String>,
    pub color: Option<String>,
    pub worker_count: Option<i32>,
    pub needs_callback: bool,
    pub remarks: Option<String>,
    pub include_weekends: bool,
    pub workday_start: NaiveTime,
    pub workday_end: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Length of one working day; falls back to 8 hours for an inverted window.
    pub fn workday_minutes(&self) -> i64 {
        let minutes = (self.workday_end - self.workday_start).num_minutes();
        if minutes > 0 {
            minutes
        } else {
            8 * 60
        }
    }
}

impl Project {
    pub async fn find_owned(pool: &MySqlPool, owner_id: &str, project_id: &str) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            "SELECT * FROM Projects_ WHERE project_id = ? AND owner_id = ? AND deleted_at IS NULL",
        )
        .bind(project_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }
}
