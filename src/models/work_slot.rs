use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, MySql, MySqlPool, QueryBuilder};

/// A concrete working window booked for a task, finer than its date range.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkSlot {
    #[serde(rename = "id")]
    pub slot_id: String,
    pub task_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_fixed: bool,
    pub is_all_day: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkSlot {
    pub async fn of_task(pool: &MySqlPool, task_id: &str) -> Result<Vec<WorkSlot>, sqlx::Error> {
        sqlx::query_as::<_, WorkSlot>("SELECT * FROM TaskWorkSlots_ WHERE task_id = ? ORDER BY start_time")
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find(pool: &MySqlPool, slot_id: &str) -> Result<Option<WorkSlot>, sqlx::Error> {
        sqlx::query_as::<_, WorkSlot>("SELECT * FROM TaskWorkSlots_ WHERE slot_id = ?")
            .bind(slot_id)
            .fetch_optional(pool)
            .await
    }
}

/// Moves the slots of the given tasks by `delta_days`.
pub async fn shift_for_tasks<'e, E>(executor: E, task_ids: &[String], delta_days: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    if task_ids.is_empty() || delta_days == 0 {
        return Ok(0);
    }
    let mut qb = QueryBuilder::<MySql>::new("UPDATE TaskWorkSlots_ SET start_time = DATE_ADD(start_time, INTERVAL ");
    qb.push_bind(delta_days);
    qb.push(" DAY), end_time = DATE_ADD(end_time, INTERVAL ");
    qb.push_bind(delta_days);
    qb.push(" DAY), updated_at = CURRENT_TIMESTAMP WHERE task_id IN (");
    let mut ids = qb.separated(", ");
    for id in task_ids {
        ids.push_bind(id);
    }
    ids.push_unseparated(")");
    Ok(qb.build().execute(executor).await?.rows_affected())
}
