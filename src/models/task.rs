use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use sqlx::{FromRow, MySqlPool};

/// Unfinished live prerequisites of the task aliased `t`.
const OPEN_DEPENDENCIES: &str = "(SELECT CAST(COUNT(*) AS SIGNED)
      FROM TaskDependencies_ d
      JOIN Tasks_ dep ON dep.task_id = d.depends_on_task_id
      WHERE d.task_id = t.task_id AND dep.deleted_at IS NULL AND dep.status <> 'done') AS open_dependencies";

fn blocked<S: Serializer>(open_dependencies: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(*open_dependencies > 0)
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "id")]
    pub task_id: String,
    pub project_id: String,
    #[serde(skip_serializing)]
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub phase: Option<String>,
    pub duration_minutes: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    #[serde(rename = "isBlocked", serialize_with = "blocked")]
    pub open_dependencies: i64,
}

/// A task on the weekly board together with the project fields the board shows.
#[derive(Debug, Clone, FromRow)]
pub struct BoardTask {
    pub task_id: String,
    pub task_title: String,
    pub project_id: String,
    pub order_number: Option<String>,
    pub sachbearbeiter: Option<String>,
    pub customer_name: Option<String>,
    pub installation_location: Option<String>,
    pub worker_count: Option<i32>,
    pub color: Option<String>,
    pub contact_name: Option<String>,
    pub needs_callback: bool,
    pub remarks: Option<String>,
}

/// One phase schedule row joined with its task and project.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledTask {
    pub task_id: String,
    pub task_title: String,
    pub order_number: Option<String>,
    pub customer_name: Option<String>,
    pub installation_location: Option<String>,
    pub phase: String,
    pub planned_year: i32,
    pub planned_kw: i32,
}

impl Task {
    /// A live task of a live project owned by `owner_id`.
    pub async fn find_owned(pool: &MySqlPool, owner_id: &str, task_id: &str) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT t.*, {} FROM Tasks_ t
             JOIN Projects_ p ON p.project_id = t.project_id
             WHERE t.task_id = ? AND t.owner_id = ? AND t.deleted_at IS NULL AND p.deleted_at IS NULL",
            OPEN_DEPENDENCIES
        ))
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn of_project(pool: &MySqlPool, project_id: &str) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT t.*, {} FROM Tasks_ t WHERE t.project_id = ? AND t.deleted_at IS NULL
             ORDER BY t.start_date IS NULL, t.start_date, t.created_at",
            OPEN_DEPENDENCIES
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn task(open_dependencies: i64) -> Task {
        let stamp = Utc.with_ymd_and_hms(2026, 2, 2, 7, 0, 0).unwrap();
        Task {
            task_id: "t1".into(),
            project_id: "p1".into(),
            owner_id: "u1".into(),
            title: "Montage Küche".into(),
            description: None,
            status: "planned".into(),
            phase: Some("montage".into()),
            duration_minutes: Some(480),
            start_date: None,
            due_date: None,
            created_at: stamp,
            updated_at: stamp,
            open_dependencies,
        }
    }

    #[test]
    fn open_prerequisites_block_the_task() {
        let json = serde_json::to_value(task(2)).unwrap();
        assert_eq!(json["isBlocked"], true);
        assert!(json.get("openDependencies").is_none());
        assert!(json.get("ownerId").is_none());

        let json = serde_json::to_value(task(0)).unwrap();
        assert_eq!(json["isBlocked"], false);
    }
}
