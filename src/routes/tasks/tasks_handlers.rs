use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};
use uuid::Uuid;

use super::tasks_models::{
    CreateDependencyRequest, CreateTaskRequest, CreateWorkSlotRequest, PhaseScheduleItem,
    PhaseSchedulesRequest, TaskShiftRequest, TaskShiftResult, UpdateTaskRequest,
};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::dependency::TaskDependency;
use crate::models::enums::{Choice, Department, DependencyType, TaskStatus};
use crate::models::phase_schedule::PhaseSchedule;
use crate::models::project::Project;
use crate::models::task::Task;
use crate::models::task_assignment;
use crate::models::work_slot::{self, WorkSlot};
use crate::planning::calendar::weeks_in_year;
use crate::planning::schedule::{
    cascade_shifts, connected_tasks, creates_cycle, DependencyEdge, TaskShift, TaskWindow,
};
use crate::routes::projects::projects_handlers::shift_days;
use crate::routes::response;
use crate::validation::{path_uuid, Validator, MAX_YEAR, MIN_YEAR};

const MAX_DURATION_MINUTES: i64 = 100_000;
const MAX_PHASE_SCHEDULES: usize = 50;

fn production_phase(v: &mut Validator, field: &str, raw: Option<&str>) -> Option<Department> {
    let phase: Option<Department> = v.optional_choice(field, raw);
    match phase {
        Some(phase) if !phase.is_phase() => {
            v.push(field, format!("{} must be a production phase", field));
            None
        }
        other => other,
    }
}

fn check_dates(v: &mut Validator, start: Option<NaiveDate>, due: Option<NaiveDate>) {
    if let (Some(start), Some(due)) = (start, due) {
        v.check(due >= start, "dueDate", "dueDate must be on or after startDate");
    }
}

async fn owned_task(pool: &MySqlPool, owner_id: &str, task_id: &str) -> Result<Task, ApiError> {
    Task::find_owned(pool, owner_id, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))
}

pub async fn list_project_tasks(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let project_id = path_uuid("projectId", &path)?;
    if Project::find_owned(pool.get_ref(), &auth.user_id, &project_id).await?.is_none() {
        return Err(ApiError::not_found("Project"));
    }
    let tasks = Task::of_project(pool.get_ref(), &project_id).await?;
    Ok(response::ok(tasks))
}

pub async fn create_task(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let project_id = path_uuid("projectId", &path)?;

    let mut v = Validator::new();
    let title = v.required_text("title", req.title.as_deref(), 255);
    let description = v.optional_text("description", req.description.as_deref(), 5000);
    let status: Option<TaskStatus> = v.optional_choice("status", req.status.as_deref());
    let phase = production_phase(&mut v, "phase", req.phase.as_deref());
    let duration = v.int_in_range("durationMinutes", req.duration_minutes, 0, MAX_DURATION_MINUTES);
    let start_date = v.optional_date("startDate", req.start_date.as_deref());
    let due_date = v.optional_date("dueDate", req.due_date.as_deref());
    check_dates(&mut v, start_date, due_date);
    v.finish()?;
    let title = title.ok_or_else(|| ApiError::BadRequest("title is required".into()))?;

    if Project::find_owned(pool.get_ref(), &auth.user_id, &project_id).await?.is_none() {
        return Err(ApiError::not_found("Project"));
    }

    let task_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO Tasks_
            (task_id, project_id, owner_id, title, description, status, phase, duration_minutes, start_date, due_date)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&task_id)
    .bind(&project_id)
    .bind(&auth.user_id)
    .bind(&title)
    .bind(description)
    .bind(status.unwrap_or(TaskStatus::Planned).as_str())
    .bind(phase.map(|p| p.as_str()))
    .bind(duration)
    .bind(start_date)
    .bind(due_date)
    .execute(pool.get_ref())
    .await?;

    let task = owned_task(pool.get_ref(), &auth.user_id, &task_id).await?;
    info!("Task {} created in project {} by {}", task.title, project_id, auth.user_name);
    Ok(response::created(task))
}

pub async fn get_task(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let task = owned_task(pool.get_ref(), &auth.user_id, &id).await?;
    Ok(response::ok(task))
}

pub async fn update_task(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let req = req.into_inner();

    let mut v = Validator::new();
    let title = v.non_blank_text("title", req.title.as_deref(), 255);
    let description = req
        .description
        .map(|d| v.optional_text("description", d.as_deref(), 5000));
    let status: Option<TaskStatus> = v.optional_choice("status", req.status.as_deref());
    let phase = req
        .phase
        .map(|p| production_phase(&mut v, "phase", p.as_deref()).map(|p| p.as_str()));
    let duration = req
        .duration_minutes
        .map(|d| v.int_in_range("durationMinutes", d, 0, MAX_DURATION_MINUTES));
    let start_date = req.start_date.map(|d| v.optional_date("startDate", d.as_deref()));
    let due_date = req.due_date.map(|d| v.optional_date("dueDate", d.as_deref()));
    v.finish()?;

    let current = owned_task(pool.get_ref(), &auth.user_id, &id).await?;
    let mut v = Validator::new();
    check_dates(
        &mut v,
        start_date.unwrap_or(current.start_date),
        due_date.unwrap_or(current.due_date),
    );
    v.finish()?;

    let mut qb = QueryBuilder::<MySql>::new("UPDATE Tasks_ SET updated_at = CURRENT_TIMESTAMP");
    if let Some(title) = title {
        qb.push(", title = ").push_bind(title);
    }
    if let Some(description) = description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(status) = status {
        qb.push(", status = ").push_bind(status.as_str());
    }
    if let Some(phase) = phase {
        qb.push(", phase = ").push_bind(phase);
    }
    if let Some(duration) = duration {
        qb.push(", duration_minutes = ").push_bind(duration);
    }
    if let Some(start_date) = start_date {
        qb.push(", start_date = ").push_bind(start_date);
    }
    if let Some(due_date) = due_date {
        qb.push(", due_date = ").push_bind(due_date);
    }
    qb.push(" WHERE task_id = ").push_bind(&id);
    qb.build().execute(pool.get_ref()).await?;

    let task = owned_task(pool.get_ref(), &auth.user_id, &id).await?;
    info!("Task {} updated by {}", id, auth.user_name);
    Ok(response::ok(task))
}

pub async fn delete_task(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;

    // step: task and its bookings together, so the slots free up
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE Tasks_ SET deleted_at = CURRENT_TIMESTAMP
         WHERE task_id = ? AND owner_id = ? AND deleted_at IS NULL",
    )
    .bind(&id)
    .bind(&auth.user_id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Task"));
    }
    let retired = task_assignment::retire_for_task(&mut *tx, &id).await?;
    tx.commit().await?;
    debug!("Task {} released {} assignments", id, retired);
    info!("Task {} deleted by {}", id, auth.user_name);
    Ok(response::message("Task deleted"))
}

async fn schedules_of(pool: &MySqlPool, task_id: &str) -> Result<Vec<PhaseSchedule>, sqlx::Error> {
    sqlx::query_as::<_, PhaseSchedule>(
        "SELECT schedule_id, task_id, phase, planned_year, planned_kw
         FROM TaskPhaseSchedules_ WHERE task_id = ?
         ORDER BY planned_year, planned_kw",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await
}

pub async fn get_phase_schedules(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    owned_task(pool.get_ref(), &auth.user_id, &id).await?;
    Ok(response::ok(schedules_of(pool.get_ref(), &id).await?))
}

/// Phase weeks of one task; the KW must exist in its ISO year and may appear once per phase.
fn check_schedules(v: &mut Validator, items: &[PhaseScheduleItem]) -> Vec<(Department, i32, u32)> {
    if items.len() > MAX_PHASE_SCHEDULES {
        v.push("schedules", "schedules must not contain more than 50 entries");
        return Vec::new();
    }
    let mut rows: Vec<(Department, i32, u32)> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let field = |name: &str| format!("schedules[{}].{}", i, name);
        let phase = match item.phase.as_deref() {
            None | Some("") => {
                v.push(&field("phase"), format!("{} is required", field("phase")));
                None
            }
            raw => production_phase(v, &field("phase"), raw),
        };
        let year = v.int_in_range(&field("plannedYear"), item.planned_year, MIN_YEAR, MAX_YEAR);
        let kw = v.int_in_range(&field("plannedKw"), item.planned_kw, 1, 53);
        if item.planned_year.is_none() {
            v.push(&field("plannedYear"), format!("{} is required", field("plannedYear")));
        }
        if item.planned_kw.is_none() {
            v.push(&field("plannedKw"), format!("{} is required", field("plannedKw")));
        }

        if let (Some(phase), Some(year), Some(kw)) = (phase, year, kw) {
            let (year, kw) = (year as i32, kw as u32);
            if kw > weeks_in_year(year) {
                v.push(&field("plannedKw"), format!("KW {} does not exist in {}", kw, year));
            } else if rows.contains(&(phase, year, kw)) {
                v.push(&field("plannedKw"), "duplicate phase schedule");
            } else {
                rows.push((phase, year, kw));
            }
        }
    }
    rows
}

/// Replaces the whole set of phase weeks of a task.
pub async fn put_phase_schedules(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<PhaseSchedulesRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let mut v = Validator::new();
    let rows = check_schedules(&mut v, &req.schedules);
    v.finish()?;
    owned_task(pool.get_ref(), &auth.user_id, &id).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM TaskPhaseSchedules_ WHERE task_id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    for (phase, year, kw) in &rows {
        sqlx::query(
            "INSERT INTO TaskPhaseSchedules_ (schedule_id, task_id, phase, planned_year, planned_kw)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(phase.as_str())
        .bind(year)
        .bind(kw)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("Task {} now has {} phase schedules", id, rows.len());
    Ok(response::ok(schedules_of(pool.get_ref(), &id).await?))
}

/// Every dependency between the owner's live tasks.
async fn owner_edges(pool: &MySqlPool, owner_id: &str) -> Result<Vec<DependencyEdge>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TaskDependency>(
        "SELECT d.* FROM TaskDependencies_ d
         JOIN Tasks_ t ON t.task_id = d.task_id
         JOIN Tasks_ parent ON parent.task_id = d.depends_on_task_id
         WHERE t.owner_id = ? AND t.deleted_at IS NULL AND parent.deleted_at IS NULL",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|d| {
            let dependency_type = d.dependency_type.parse::<DependencyType>().ok()?;
            Some(DependencyEdge {
                task_id: d.task_id,
                depends_on_task_id: d.depends_on_task_id,
                dependency_type,
            })
        })
        .collect())
}

pub async fn list_dependencies(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    owned_task(pool.get_ref(), &auth.user_id, &id).await?;
    let deps = sqlx::query_as::<_, TaskDependency>(
        "SELECT * FROM TaskDependencies_ WHERE task_id = ? ORDER BY created_at",
    )
    .bind(&id)
    .fetch_all(pool.get_ref())
    .await?;
    Ok(response::ok(deps))
}

pub async fn create_dependency(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<CreateDependencyRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let mut v = Validator::new();
    let depends_on = v.required_uuid("dependsOnTaskId", req.depends_on_task_id.as_deref());
    let kind: Option<DependencyType> = v.optional_choice("dependencyType", req.dependency_type.as_deref());
    v.finish()?;
    let depends_on = depends_on.ok_or_else(|| ApiError::BadRequest("dependsOnTaskId is required".into()))?;

    if depends_on == id {
        return Err(ApiError::BadRequest("A task cannot depend on itself".into()));
    }
    owned_task(pool.get_ref(), &auth.user_id, &id).await?;
    owned_task(pool.get_ref(), &auth.user_id, &depends_on).await?;

    let edges = owner_edges(pool.get_ref(), &auth.user_id).await?;
    if creates_cycle(&id, &depends_on, &edges) {
        warn!("Rejected dependency {} -> {}: cycle", id, depends_on);
        return Err(ApiError::BadRequest("Dependency would create a cycle".into()));
    }

    let dependency_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO TaskDependencies_ (dependency_id, task_id, depends_on_task_id, dependency_type)
         VALUES (?, ?, ?, ?)",
    )
    .bind(&dependency_id)
    .bind(&id)
    .bind(&depends_on)
    .bind(kind.unwrap_or(DependencyType::FinishStart).as_str())
    .execute(pool.get_ref())
    .await?;

    let dependency = sqlx::query_as::<_, TaskDependency>("SELECT * FROM TaskDependencies_ WHERE dependency_id = ?")
        .bind(&dependency_id)
        .fetch_one(pool.get_ref())
        .await?;
    info!("Task {} now depends on {}", id, depends_on);
    Ok(response::created(dependency))
}

pub async fn delete_dependency(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (raw_task, raw_dep) = path.into_inner();
    let id = path_uuid("id", &raw_task)?;
    let dependency_id = path_uuid("depId", &raw_dep)?;
    owned_task(pool.get_ref(), &auth.user_id, &id).await?;

    let result = sqlx::query("DELETE FROM TaskDependencies_ WHERE dependency_id = ? AND task_id = ?")
        .bind(&dependency_id)
        .bind(&id)
        .execute(pool.get_ref())
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Dependency"));
    }
    Ok(response::message("Dependency deleted"))
}

#[derive(FromRow)]
struct TaskDates {
    task_id: String,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
}

/// Date windows of the owner's live tasks. Booked work slots take precedence over the plain dates.
async fn owner_windows(pool: &MySqlPool, owner_id: &str) -> Result<HashMap<String, TaskWindow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TaskDates>(
        "SELECT t.task_id,
                COALESCE(DATE(MIN(ws.start_time)), t.start_date) AS start_date,
                COALESCE(DATE(MAX(ws.end_time)), t.due_date) AS due_date
         FROM Tasks_ t
         LEFT JOIN TaskWorkSlots_ ws ON ws.task_id = t.task_id
         WHERE t.owner_id = ? AND t.deleted_at IS NULL
         GROUP BY t.task_id, t.start_date, t.due_date",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|t| {
            (
                t.task_id,
                TaskWindow {
                    start: t.start_date,
                    end: t.due_date,
                },
            )
        })
        .collect())
}

/// Which tasks move and by how much. `shiftBlock` wins over `cascade`.
fn plan_shift(
    root: &str,
    delta: i64,
    req: &TaskShiftRequest,
    edges: &[DependencyEdge],
    windows: &HashMap<String, TaskWindow>,
) -> Vec<TaskShift> {
    if req.shift_block {
        connected_tasks(root, edges)
            .into_iter()
            .map(|task_id| TaskShift {
                task_id,
                delta_days: delta,
            })
            .collect()
    } else if req.cascade {
        cascade_shifts(root, delta, edges, windows)
    } else {
        vec![TaskShift {
            task_id: root.to_string(),
            delta_days: delta,
        }]
    }
}

/// Moves a task and its work slots. With `cascade`, dependents follow as far as their
/// constraints need; with `shiftBlock`, the whole dependency-connected block moves.
pub async fn shift_task(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<TaskShiftRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let mut v = Validator::new();
    let delta = shift_days(&mut v, req.delta_days);
    v.finish()?;
    let delta = delta.ok_or_else(|| ApiError::BadRequest("deltaDays is required".into()))?;

    owned_task(pool.get_ref(), &auth.user_id, &id).await?;
    if delta == 0 {
        return Ok(response::ok(TaskShiftResult {
            shifted_task_ids: Vec::new(),
            delta_days: 0,
            shifted_tasks: Vec::new(),
        }));
    }

    let (edges, windows) = if req.shift_block || req.cascade {
        (
            owner_edges(pool.get_ref(), &auth.user_id).await?,
            owner_windows(pool.get_ref(), &auth.user_id).await?,
        )
    } else {
        (Vec::new(), HashMap::new())
    };
    let shifts = plan_shift(&id, delta, &req, &edges, &windows);

    let mut tx = pool.begin().await?;
    for shift in &shifts {
        sqlx::query(
            "UPDATE Tasks_
             SET start_date = DATE_ADD(start_date, INTERVAL ? DAY),
                 due_date = DATE_ADD(due_date, INTERVAL ? DAY),
                 updated_at = CURRENT_TIMESTAMP
             WHERE task_id = ?",
        )
        .bind(shift.delta_days)
        .bind(shift.delta_days)
        .bind(&shift.task_id)
        .execute(&mut *tx)
        .await?;
        work_slot::shift_for_tasks(&mut *tx, std::slice::from_ref(&shift.task_id), shift.delta_days).await?;
    }
    tx.commit().await?;

    info!("Task {} shifted by {} days, {} tasks moved", id, delta, shifts.len());
    Ok(response::ok(TaskShiftResult {
        shifted_task_ids: shifts.iter().map(|s| s.task_id.clone()).collect(),
        delta_days: delta,
        shifted_tasks: shifts,
    }))
}

fn slot_window(v: &mut Validator, req: &CreateWorkSlotRequest) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = v.required_datetime("startTime", req.start_time.as_deref());
    let end = v.required_datetime("endTime", req.end_time.as_deref());
    let (start, end) = (start?, end?);
    v.check(end > start, "endTime", "endTime must be after startTime");
    (end > start).then_some((start, end))
}

pub async fn list_work_slots(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    owned_task(pool.get_ref(), &auth.user_id, &id).await?;
    Ok(response::ok(WorkSlot::of_task(pool.get_ref(), &id).await?))
}

pub async fn create_work_slot(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<CreateWorkSlotRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let mut v = Validator::new();
    let window = slot_window(&mut v, &req);
    v.finish()?;
    let (start, end) = window.ok_or_else(|| ApiError::BadRequest("startTime and endTime are required".into()))?;

    owned_task(pool.get_ref(), &auth.user_id, &id).await?;

    let slot_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO TaskWorkSlots_ (slot_id, task_id, start_time, end_time, is_fixed, is_all_day)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&slot_id)
    .bind(&id)
    .bind(start)
    .bind(end)
    .bind(req.is_fixed.unwrap_or(false))
    .bind(req.is_all_day.unwrap_or(false))
    .execute(pool.get_ref())
    .await?;

    let slot = WorkSlot::find(pool.get_ref(), &slot_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Work slot"))?;
    info!("Work slot {} booked on task {} by {}", slot_id, id, auth.user_name);
    Ok(response::created(slot))
}

pub async fn delete_work_slot(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (raw_id, raw_slot) = path.into_inner();
    let id = path_uuid("id", &raw_id)?;
    let slot_id = path_uuid("slotId", &raw_slot)?;
    owned_task(pool.get_ref(), &auth.user_id, &id).await?;

    let result = sqlx::query("DELETE FROM TaskWorkSlots_ WHERE slot_id = ? AND task_id = ?")
        .bind(&slot_id)
        .bind(&id)
        .execute(pool.get_ref())
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Work slot"));
    }
    info!("Work slot {} removed from task {} by {}", slot_id, id, auth.user_name);
    Ok(response::message("Work slot deleted"))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::json;

    use super::*;
    use crate::db::{lazy_pool, test_database};
    use crate::models::test_support::{seed_dependency, seed_owner, seed_project, seed_resource, seed_task};
    use crate::routes::routes::tasks_configure;

    fn shift_request(cascade: bool, shift_block: bool) -> TaskShiftRequest {
        TaskShiftRequest {
            delta_days: Some(7),
            cascade,
            shift_block,
        }
    }

    fn link(child: &str, parent: &str) -> DependencyEdge {
        DependencyEdge {
            task_id: child.to_string(),
            depends_on_task_id: parent.to_string(),
            dependency_type: DependencyType::FinishStart,
        }
    }

    fn item(phase: &str, year: i64, kw: i64) -> PhaseScheduleItem {
        PhaseScheduleItem {
            phase: Some(phase.to_string()),
            planned_year: Some(year),
            planned_kw: Some(kw),
        }
    }

    #[::core::prelude::v1::test]
    fn schedules_must_name_a_production_phase() {
        let mut v = Validator::new();
        let rows = check_schedules(&mut v, &[item("cnc", 2026, 6), item("buero", 2026, 6)]);

        assert_eq!(rows, vec![(Department::Cnc, 2026, 6)]);
        assert!(v.has_error("schedules[1].phase"));
    }

    #[::core::prelude::v1::test]
    fn schedules_reject_weeks_missing_from_the_year() {
        let mut v = Validator::new();
        let rows = check_schedules(&mut v, &[item("montage", 2026, 53), item("montage", 2027, 53)]);

        assert_eq!(rows, vec![(Department::Montage, 2026, 53)]);
        assert!(v.has_error("schedules[1].plannedKw"));
    }

    #[::core::prelude::v1::test]
    fn schedules_reject_duplicates() {
        let mut v = Validator::new();
        let rows = check_schedules(&mut v, &[item("zuschnitt", 2026, 10), item("zuschnitt", 2026, 10)]);

        assert_eq!(rows.len(), 1);
        assert!(v.has_error("schedules[1].plannedKw"));
    }

    #[::core::prelude::v1::test]
    fn due_date_cannot_precede_start() {
        let mut v = Validator::new();
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        check_dates(&mut v, d("2026-02-02"), d("2026-02-02"));
        assert!(!v.has_error("dueDate"));
        check_dates(&mut v, d("2026-02-03"), d("2026-02-02"));
        assert!(v.has_error("dueDate"));
    }

    #[actix_web::test]
    async fn shifting_requires_a_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .configure(tasks_configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tasks/not-a-uuid/shift")
            .set_json(json!({ "deltaDays": 3, "cascade": true }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[::core::prelude::v1::test]
    fn block_shift_moves_parents_too() {
        let edges = vec![link("b", "a"), link("c", "b")];
        let windows = HashMap::from([
            ("a".to_string(), TaskWindow { start: NaiveDate::from_ymd_opt(2026, 2, 2), end: NaiveDate::from_ymd_opt(2026, 2, 3) }),
            ("b".to_string(), TaskWindow { start: NaiveDate::from_ymd_opt(2026, 2, 20), end: NaiveDate::from_ymd_opt(2026, 2, 21) }),
            ("c".to_string(), TaskWindow { start: NaiveDate::from_ymd_opt(2026, 3, 2), end: NaiveDate::from_ymd_opt(2026, 3, 3) }),
        ]);

        let block = plan_shift("b", 7, &shift_request(true, true), &edges, &windows);
        let ids: Vec<&str> = block.iter().map(|s| s.task_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(block.iter().all(|s| s.delta_days == 7));

        // a cascade leaves the parent and the roomy child alone
        let cascade = plan_shift("b", 7, &shift_request(true, false), &edges, &windows);
        assert_eq!(cascade, vec![TaskShift { task_id: "b".into(), delta_days: 7 }]);

        let single = plan_shift("b", 7, &shift_request(false, false), &edges, &windows);
        assert_eq!(single.len(), 1);
    }

    #[::core::prelude::v1::test]
    fn work_slots_must_end_after_they_start() {
        let request = |start: &str, end: &str| CreateWorkSlotRequest {
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            is_fixed: None,
            is_all_day: None,
        };

        let mut v = Validator::new();
        let window = slot_window(&mut v, &request("2026-02-02T07:00:00Z", "2026-02-02T11:45:00Z"));
        assert!(window.is_some());
        assert!(!v.has_error("endTime"));

        assert!(slot_window(&mut v, &request("2026-02-02T12:00", "2026-02-02T12:00")).is_none());
        assert!(v.has_error("endTime"));

        let mut v = Validator::new();
        assert!(slot_window(&mut v, &request("morgen", "2026-02-02T12:00")).is_none());
        assert!(v.has_error("startTime"));
    }

    #[actix_web::test]
    async fn work_slots_require_a_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .configure(tasks_configure),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/api/tasks/6f9619ff-8b86-4d11-b42d-00c04fc964ff/work-slots/0b6f3a1e-2c44-4f0e-9d1a-6d2f5b7c8e90")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    // Needs TEST_DATABASE_URL; skipped otherwise.
    #[actix_web::test]
    async fn deleting_a_task_frees_its_booked_slots() {
        let Some(pool) = test_database().await else {
            return;
        };
        let (owner, bearer) = seed_owner(&pool).await;
        let project = seed_project(&pool, &owner).await;
        let first = seed_task(&pool, &owner, &project, "2026-02-02", "2026-02-06").await;
        let second = seed_task(&pool, &owner, &project, "2026-02-02", "2026-02-06").await;
        let resource = seed_resource(&pool, &owner).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .configure(tasks_configure),
        )
        .await;
        let booking = json!({ "resourceId": resource, "assignmentDate": "2026-02-04", "halfDay": "morning" });

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/assignments", first))
            .insert_header(("Authorization", bearer.as_str()))
            .set_json(&booking)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/tasks/{}", first))
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/assignments", second))
            .insert_header(("Authorization", bearer.as_str()))
            .set_json(&booking)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let live: i64 = sqlx::query_scalar(
            "SELECT CAST(COUNT(*) AS SIGNED) FROM TaskAssignments_ WHERE task_id = ? AND deleted_at IS NULL",
        )
        .bind(&first)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(live, 0);
    }

    // Needs TEST_DATABASE_URL; skipped otherwise.
    #[actix_web::test]
    async fn block_shift_carries_work_slots_and_blocked_flag() {
        let Some(pool) = test_database().await else {
            return;
        };
        let (owner, bearer) = seed_owner(&pool).await;
        let project = seed_project(&pool, &owner).await;
        let parent = seed_task(&pool, &owner, &project, "2026-02-02", "2026-02-03").await;
        let child = seed_task(&pool, &owner, &project, "2026-02-04", "2026-02-05").await;
        seed_dependency(&pool, &child, &parent).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .configure(tasks_configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/tasks/{}", child))
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["isBlocked"], true);

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/work-slots", parent))
            .insert_header(("Authorization", bearer.as_str()))
            .set_json(json!({ "startTime": "2026-02-02T07:00:00Z", "endTime": "2026-02-02T11:45:00Z" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/shift", child))
            .insert_header(("Authorization", bearer.as_str()))
            .set_json(json!({ "deltaDays": 7, "shiftBlock": true }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["shiftedTaskIds"], json!([child, parent]));

        let req = test::TestRequest::get()
            .uri(&format!("/api/tasks/{}/work-slots", parent))
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["startTime"], "2026-02-09T07:00:00Z");
    }
}
