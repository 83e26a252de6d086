use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::{Executor, FromRow, MySql, MySqlPool, QueryBuilder};
use uuid::Uuid;

use super::enums::{Choice, HalfDay, StatusCode};

/// A live assignment joined with its task, project and resource.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetail {
    #[serde(rename = "id")]
    pub assignment_id: String,
    pub task_id: String,
    pub resource_id: String,
    pub assignment_date: NaiveDate,
    pub half_day: String,
    pub status_code: String,
    pub is_fixed: bool,
    pub notes: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub task_title: String,
    pub project_id: String,
    pub project_name: String,
    pub project_order_number: Option<String>,
    pub customer_name: Option<String>,
    pub installation_location: Option<String>,
    pub resource_name: String,
    pub resource_short_code: Option<String>,
}

impl AssignmentDetail {
    pub fn resource_display(&self) -> &str {
        match self.resource_short_code.as_deref() {
            Some(code) if !code.is_empty() => code,
            _ => &self.resource_name,
        }
    }
}

/// Live assignments with everything the boards show; callers append `AND ...` filters.
pub const DETAIL_SELECT: &str = "
    SELECT ta.assignment_id, ta.task_id, ta.resource_id, ta.assignment_date, ta.half_day,
           ta.status_code, ta.is_fixed, ta.notes, ta.start_time,
           t.title AS task_title, p.project_id, p.name AS project_name,
           p.order_number AS project_order_number, p.customer_name, p.installation_location,
           r.name AS resource_name, r.short_code AS resource_short_code
    FROM TaskAssignments_ ta
    JOIN Tasks_ t ON t.task_id = ta.task_id
    JOIN Projects_ p ON p.project_id = t.project_id
    JOIN Resources_ r ON r.resource_id = ta.resource_id
    WHERE ta.deleted_at IS NULL
      AND t.deleted_at IS NULL
      AND p.deleted_at IS NULL
";

/// Row count over the same joins as [`DETAIL_SELECT`].
pub const DETAIL_COUNT: &str = "
    SELECT CAST(COUNT(*) AS SIGNED)
    FROM TaskAssignments_ ta
    JOIN Tasks_ t ON t.task_id = ta.task_id
    JOIN Projects_ p ON p.project_id = t.project_id
    JOIN Resources_ r ON r.resource_id = ta.resource_id
    WHERE ta.deleted_at IS NULL
      AND t.deleted_at IS NULL
      AND p.deleted_at IS NULL
";

pub const DETAIL_ORDER: &str = " ORDER BY ta.assignment_date, ta.half_day, r.name";

impl AssignmentDetail {
    /// Live assignments on the owner's resources inside `[from, to]`.
    pub async fn owned_between(
        pool: &MySqlPool,
        owner_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AssignmentDetail>, sqlx::Error> {
        let mut qb = QueryBuilder::<MySql>::new(DETAIL_SELECT);
        qb.push(" AND r.owner_id = ").push_bind(owner_id);
        qb.push(" AND ta.assignment_date BETWEEN ").push_bind(from).push(" AND ").push_bind(to);
        qb.push(DETAIL_ORDER);
        qb.build_query_as().fetch_all(pool).await
    }

    pub async fn of_resource_between(
        pool: &MySqlPool,
        resource_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AssignmentDetail>, sqlx::Error> {
        let mut qb = QueryBuilder::<MySql>::new(DETAIL_SELECT);
        qb.push(" AND ta.resource_id = ").push_bind(resource_id);
        qb.push(" AND ta.assignment_date BETWEEN ").push_bind(from).push(" AND ").push_bind(to);
        qb.push(DETAIL_ORDER);
        qb.build_query_as().fetch_all(pool).await
    }

    pub async fn of_task(pool: &MySqlPool, task_id: &str) -> Result<Vec<AssignmentDetail>, sqlx::Error> {
        let mut qb = QueryBuilder::<MySql>::new(DETAIL_SELECT);
        qb.push(" AND ta.task_id = ").push_bind(task_id);
        qb.push(DETAIL_ORDER);
        qb.build_query_as().fetch_all(pool).await
    }

    pub async fn find_owned(
        pool: &MySqlPool,
        owner_id: &str,
        assignment_id: &str,
    ) -> Result<Option<AssignmentDetail>, sqlx::Error> {
        let mut qb = QueryBuilder::<MySql>::new(DETAIL_SELECT);
        qb.push(" AND r.owner_id = ").push_bind(owner_id);
        qb.push(" AND ta.assignment_id = ").push_bind(assignment_id);
        qb.build_query_as().fetch_optional(pool).await
    }
}

/// A validated booking ready to be written.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub task_id: String,
    pub resource_id: String,
    pub assignment_date: NaiveDate,
    pub half_day: HalfDay,
    pub status_code: StatusCode,
    pub is_fixed: bool,
    pub notes: Option<String>,
    pub start_time: Option<NaiveTime>,
}

impl NewAssignment {
    /// Inserts the row and returns its new id.
    pub async fn insert<'e, E>(&self, executor: E) -> Result<String, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let assignment_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO TaskAssignments_
                (assignment_id, task_id, resource_id, assignment_date, half_day, status_code, is_fixed, notes, start_time)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&assignment_id)
        .bind(&self.task_id)
        .bind(&self.resource_id)
        .bind(self.assignment_date)
        .bind(self.half_day.as_str())
        .bind(self.status_code.as_str())
        .bind(self.is_fixed)
        .bind(&self.notes)
        .bind(self.start_time)
        .execute(executor)
        .await?;
        Ok(assignment_id)
    }
}

/// Soft-deletes the live assignments of a task so its slots free up.
pub async fn retire_for_task<'e, E>(executor: E, task_id: &str) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        "UPDATE TaskAssignments_ SET deleted_at = CURRENT_TIMESTAMP
         WHERE task_id = ? AND deleted_at IS NULL",
    )
    .bind(task_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Same as [`retire_for_task`] for every task of a project.
pub async fn retire_for_project<'e, E>(executor: E, project_id: &str) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        "UPDATE TaskAssignments_ ta
         JOIN Tasks_ t ON t.task_id = ta.task_id
         SET ta.deleted_at = CURRENT_TIMESTAMP
         WHERE t.project_id = ? AND ta.deleted_at IS NULL",
    )
    .bind(project_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
