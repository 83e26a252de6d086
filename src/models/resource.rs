use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, MySqlPool};

/// A person, machine or vehicle that can be booked onto tasks.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "id")]
    pub resource_id: String,
    #[serde(skip_serializing)]
    pub owner_id: String,
    pub name: String,
    pub resource_type: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub availability_enabled: bool,
    pub department: Option<String>,
    pub employee_type: Option<String>,
    pub short_code: Option<String>,
    pub default_location: Option<String>,
    pub weekly_hours: Option<f64>,
    pub skills: Option<Json<Vec<String>>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub async fn find_owned(pool: &MySqlPool, owner_id: &str, resource_id: &str) -> Result<Option<Resource>, sqlx::Error> {
        sqlx::query_as::<_, Resource>("SELECT * FROM Resources_ WHERE resource_id = ? AND owner_id = ?")
            .bind(resource_id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Active people of one owner in board order: department, short code, name.
    pub async fn active_people(pool: &MySqlPool, owner_id: &str) -> Result<Vec<Resource>, sqlx::Error> {
        sqlx::query_as::<_, Resource>(
            "SELECT * FROM Resources_
             WHERE owner_id = ? AND is_active = TRUE AND resource_type = 'person'
             ORDER BY department IS NULL, department, short_code IS NULL, short_code, name",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }
}
