use actix_web::{web, HttpResponse};
use chrono::NaiveTime;
use log::{info, warn};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use uuid::Uuid;

use super::projects_models::{
    AutoScheduleRequest, AutoScheduleResult, CreateProjectRequest, ProjectShiftRequest,
    ProjectShiftResult, UpdateProjectRequest,
};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::enums::Choice;
use crate::models::project::Project;
use crate::models::task::Task;
use crate::models::task_assignment;
use crate::models::work_slot;
use crate::planning::schedule::{backward_schedule, AutoScheduleTask, WorkCalendar};
use crate::routes::response;
use crate::validation::{path_uuid, Validator};

pub const MAX_SHIFT_DAYS: i64 = 3650;
const MAX_AUTO_SCHEDULE_TASKS: usize = 200;
const MAX_WORKERS: i64 = 100;

/// Required `deltaDays` within ±10 years.
pub fn shift_days(v: &mut Validator, delta_days: Option<i64>) -> Option<i64> {
    match delta_days {
        None => {
            v.push("deltaDays", "deltaDays is required");
            None
        }
        Some(delta) => v.int_in_range("deltaDays", Some(delta), -MAX_SHIFT_DAYS, MAX_SHIFT_DAYS),
    }
}

fn check_workday(v: &mut Validator, start: Option<NaiveTime>, end: Option<NaiveTime>) {
    if let (Some(start), Some(end)) = (start, end) {
        v.check(end > start, "workdayEnd", "workdayEnd must be after workdayStart");
    }
}

pub async fn list_projects(pool: web::Data<MySqlPool>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let projects = sqlx::query_as::<_, Project>(
        "SELECT * FROM Projects_ WHERE owner_id = ? AND deleted_at IS NULL ORDER BY created_at DESC",
    )
    .bind(&auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;
    Ok(response::ok(projects))
}

pub async fn create_project(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    req: web::Json<CreateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let name = v.required_text("name", req.name.as_deref(), 255);
    let description = v.optional_text("description", req.description.as_deref(), 5000);
    let order_number = v.optional_text("orderNumber", req.order_number.as_deref(), 50);
    let customer_name = v.optional_text("customerName", req.customer_name.as_deref(), 255);
    let sachbearbeiter = v.optional_text("sachbearbeiter", req.sachbearbeiter.as_deref(), 100);
    let location = v.optional_text("installationLocation", req.installation_location.as_deref(), 255);
    let contact_name = v.optional_text("contactName", req.contact_name.as_deref(), 255);
    let color = v.optional_text("color", req.color.as_deref(), 20);
    let worker_count = v.int_in_range("workerCount", req.worker_count, 0, MAX_WORKERS);
    let remarks = v.optional_text("remarks", req.remarks.as_deref(), 5000);
    let workday_start = v.optional_time("workdayStart", req.workday_start.as_deref());
    let workday_end = v.optional_time("workdayEnd", req.workday_end.as_deref());
    let start = workday_start.or(NaiveTime::from_hms_opt(8, 0, 0));
    let end = workday_end.or(NaiveTime::from_hms_opt(17, 0, 0));
    check_workday(&mut v, start, end);
    v.finish()?;
    let name = name.ok_or_else(|| ApiError::BadRequest("name is required".into()))?;

    let project_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO Projects_
            (project_id, owner_id, name, description, order_number, customer_name, sachbearbeiter,
             installation_location, contact_name, color, worker_count, needs_callback, remarks,
             include_weekends, workday_start, workday_end)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&project_id)
    .bind(&auth.user_id)
    .bind(&name)
    .bind(description)
    .bind(order_number)
    .bind(customer_name)
    .bind(sachbearbeiter)
    .bind(location)
    .bind(contact_name)
    .bind(color)
    .bind(worker_count)
    .bind(req.needs_callback.unwrap_or(false))
    .bind(remarks)
    .bind(req.include_weekends.unwrap_or(false))
    .bind(start)
    .bind(end)
    .execute(pool.get_ref())
    .await?;

    let project = Project::find_owned(pool.get_ref(), &auth.user_id, &project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;
    info!("Project {} created by {}", project.name, auth.user_name);
    Ok(response::created(project))
}

pub async fn get_project(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let project = Project::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;
    Ok(response::ok(project))
}

pub async fn update_project(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<UpdateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let req = req.into_inner();

    let mut v = Validator::new();
    let name = v.non_blank_text("name", req.name.as_deref(), 255);
    let texts: Vec<(&str, Option<Option<String>>)> = vec![
        ("description", req.description.map(|t| v.optional_text("description", t.as_deref(), 5000))),
        ("order_number", req.order_number.map(|t| v.optional_text("orderNumber", t.as_deref(), 50))),
        ("customer_name", req.customer_name.map(|t| v.optional_text("customerName", t.as_deref(), 255))),
        ("sachbearbeiter", req.sachbearbeiter.map(|t| v.optional_text("sachbearbeiter", t.as_deref(), 100))),
        (
            "installation_location",
            req.installation_location
                .map(|t| v.optional_text("installationLocation", t.as_deref(), 255)),
        ),
        ("contact_name", req.contact_name.map(|t| v.optional_text("contactName", t.as_deref(), 255))),
        ("color", req.color.map(|t| v.optional_text("color", t.as_deref(), 20))),
        ("remarks", req.remarks.map(|t| v.optional_text("remarks", t.as_deref(), 5000))),
    ];
    let worker_count = req
        .worker_count
        .map(|n| v.int_in_range("workerCount", n, 0, MAX_WORKERS));
    let workday_start = v.optional_time("workdayStart", req.workday_start.as_deref());
    let workday_end = v.optional_time("workdayEnd", req.workday_end.as_deref());
    v.finish()?;

    let current = Project::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;

    let mut v = Validator::new();
    check_workday(
        &mut v,
        Some(workday_start.unwrap_or(current.workday_start)),
        Some(workday_end.unwrap_or(current.workday_end)),
    );
    v.finish()?;

    let mut qb = QueryBuilder::<MySql>::new("UPDATE Projects_ SET updated_at = CURRENT_TIMESTAMP");
    if let Some(name) = name {
        qb.push(", name = ").push_bind(name);
    }
    for (column, value) in texts {
        if let Some(value) = value {
            qb.push(format!(", {} = ", column)).push_bind(value);
        }
    }
    if let Some(worker_count) = worker_count {
        qb.push(", worker_count = ").push_bind(worker_count);
    }
    if let Some(needs_callback) = req.needs_callback {
        qb.push(", needs_callback = ").push_bind(needs_callback);
    }
    if let Some(include_weekends) = req.include_weekends {
        qb.push(", include_weekends = ").push_bind(include_weekends);
    }
    if let Some(start) = workday_start {
        qb.push(", workday_start = ").push_bind(start);
    }
    if let Some(end) = workday_end {
        qb.push(", workday_end = ").push_bind(end);
    }
    qb.push(" WHERE project_id = ").push_bind(&id);
    qb.build().execute(pool.get_ref()).await?;

    let project = Project::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;
    info!("Project {} updated by {}", id, auth.user_name);
    Ok(response::ok(project))
}

/// Moves the project and its live tasks to the trash. Their bookings are released.
pub async fn delete_project(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;

    // step: project, tasks and bookings in one transaction
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE Projects_ SET deleted_at = CURRENT_TIMESTAMP
         WHERE project_id = ? AND owner_id = ? AND deleted_at IS NULL",
    )
    .bind(&id)
    .bind(&auth.user_id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Project"));
    }
    // tasks take the project's stamp so a restore can tell them apart from earlier deletes
    sqlx::query(
        "UPDATE Tasks_ t
         JOIN Projects_ p ON p.project_id = t.project_id
         SET t.deleted_at = p.deleted_at
         WHERE t.project_id = ? AND t.deleted_at IS NULL",
    )
    .bind(&id)
    .execute(&mut *tx)
    .await?;
    let retired = task_assignment::retire_for_project(&mut *tx, &id).await?;
    tx.commit().await?;

    info!("Project {} moved to trash by {}, {} assignments released", id, auth.user_name, retired);
    Ok(response::message("Project deleted"))
}

pub async fn list_trash(pool: web::Data<MySqlPool>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let projects = sqlx::query_as::<_, Project>(
        "SELECT * FROM Projects_ WHERE owner_id = ? AND deleted_at IS NOT NULL ORDER BY deleted_at DESC",
    )
    .bind(&auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;
    Ok(response::ok(projects))
}

/// Brings a trashed project back with the tasks trashed alongside it.
/// Released bookings stay released.
pub async fn restore_project(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;

    let mut tx = pool.begin().await?;
    let restored_tasks = sqlx::query(
        "UPDATE Tasks_ t
         JOIN Projects_ p ON p.project_id = t.project_id
         SET t.deleted_at = NULL
         WHERE p.project_id = ? AND p.owner_id = ? AND p.deleted_at IS NOT NULL
           AND t.deleted_at = p.deleted_at",
    )
    .bind(&id)
    .bind(&auth.user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    let result = sqlx::query(
        "UPDATE Projects_ SET deleted_at = NULL, updated_at = CURRENT_TIMESTAMP
         WHERE project_id = ? AND owner_id = ? AND deleted_at IS NOT NULL",
    )
    .bind(&id)
    .bind(&auth.user_id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Project"));
    }
    tx.commit().await?;

    let project = Project::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;
    info!("Project {} restored by {} with {} tasks", id, auth.user_name, restored_tasks);
    Ok(response::ok(project))
}

/// Only trashed projects can be removed for good; rows below cascade.
pub async fn purge_project(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let result = sqlx::query("DELETE FROM Projects_ WHERE project_id = ? AND owner_id = ? AND deleted_at IS NOT NULL")
        .bind(&id)
        .bind(&auth.user_id)
        .execute(pool.get_ref())
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Project"));
    }
    info!("Project {} permanently deleted by {}", id, auth.user_name);
    Ok(response::message("Project permanently deleted"))
}

/// Moves every dated task of the project by the same number of days.
pub async fn shift_project(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<ProjectShiftRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let mut v = Validator::new();
    let delta = shift_days(&mut v, req.delta_days);
    v.finish()?;
    let delta = delta.ok_or_else(|| ApiError::BadRequest("deltaDays is required".into()))?;

    if Project::find_owned(pool.get_ref(), &auth.user_id, &id).await?.is_none() {
        return Err(ApiError::not_found("Project"));
    }
    if delta == 0 {
        return Ok(response::ok(ProjectShiftResult {
            shifted_task_ids: Vec::new(),
            delta_days: 0,
        }));
    }

    let mut tx = pool.begin().await?;
    let shifted: Vec<String> = sqlx::query_scalar(
        "SELECT t.task_id FROM Tasks_ t
         WHERE t.project_id = ? AND t.deleted_at IS NULL
           AND (t.start_date IS NOT NULL OR t.due_date IS NOT NULL
                OR EXISTS (SELECT 1 FROM TaskWorkSlots_ ws WHERE ws.task_id = t.task_id))",
    )
    .bind(&id)
    .fetch_all(&mut *tx)
    .await?;
    sqlx::query(
        "UPDATE Tasks_
         SET start_date = DATE_ADD(start_date, INTERVAL ? DAY),
             due_date = DATE_ADD(due_date, INTERVAL ? DAY),
             updated_at = CURRENT_TIMESTAMP
         WHERE project_id = ? AND deleted_at IS NULL
           AND (start_date IS NOT NULL OR due_date IS NOT NULL)",
    )
    .bind(delta)
    .bind(delta)
    .bind(&id)
    .execute(&mut *tx)
    .await?;
    work_slot::shift_for_tasks(&mut *tx, &shifted, delta).await?;
    tx.commit().await?;

    info!("Project {} shifted by {} days ({} tasks)", id, delta, shifted.len());
    Ok(response::ok(ProjectShiftResult {
        shifted_task_ids: shifted,
        delta_days: delta,
    }))
}

/// Backward scheduling: the listed tasks end on `endDate`, laid out back to back.
pub async fn auto_schedule(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<AutoScheduleRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let mut v = Validator::new();
    v.check(
        !req.task_ids.is_empty() && req.task_ids.len() <= MAX_AUTO_SCHEDULE_TASKS,
        "taskIds",
        "taskIds must contain between 1 and 200 entries",
    );
    let task_ids: Vec<String> = req
        .task_ids
        .iter()
        .filter_map(|raw| v.optional_uuid("taskIds", Some(raw.as_str())))
        .collect();
    let end_date = v.required_date("endDate", req.end_date.as_deref());
    v.finish()?;
    let end_date = end_date.ok_or_else(|| ApiError::BadRequest("endDate is required".into()))?;

    let project = Project::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;
    let tasks = Task::of_project(pool.get_ref(), &project.project_id).await?;

    // step: keep the requested order, drop ids from elsewhere
    let mut ordered = Vec::with_capacity(task_ids.len());
    let mut skipped = Vec::new();
    for task_id in &task_ids {
        match tasks.iter().find(|t| &t.task_id == task_id) {
            Some(task) if !ordered.iter().any(|o: &AutoScheduleTask| &o.task_id == task_id) => {
                ordered.push(AutoScheduleTask {
                    task_id: task.task_id.clone(),
                    title: task.title.clone(),
                    duration_minutes: task.duration_minutes,
                    phase: task.phase.clone(),
                })
            }
            Some(_) => {}
            None => skipped.push(task_id.clone()),
        }
    }
    if ordered.is_empty() {
        return Err(ApiError::BadRequest("None of the given tasks belong to this project".into()));
    }

    let calendar = WorkCalendar {
        include_weekends: project.include_weekends,
        workday_minutes: project.workday_minutes(),
    };
    let plan = backward_schedule(&ordered, end_date, calendar);

    // step: write dates and phase weeks together
    let mut tx = pool.begin().await?;
    for planned in &plan.planned {
        sqlx::query(
            "UPDATE Tasks_ SET start_date = ?, due_date = ?, updated_at = CURRENT_TIMESTAMP WHERE task_id = ?",
        )
        .bind(planned.start_date)
        .bind(planned.due_date)
        .bind(&planned.task_id)
        .execute(&mut *tx)
        .await?;

        if let Some(phase) = planned.phase {
            sqlx::query("DELETE FROM TaskPhaseSchedules_ WHERE task_id = ? AND phase = ?")
                .bind(&planned.task_id)
                .bind(phase.as_str())
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO TaskPhaseSchedules_ (schedule_id, task_id, phase, planned_year, planned_kw)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&planned.task_id)
            .bind(phase.as_str())
            .bind(planned.year)
            .bind(planned.kw)
            .execute(&mut *tx)
            .await?;
        }
    }
    tx.commit().await?;

    for warning in &plan.warnings {
        warn!("Auto-schedule of project {}: {}", id, warning);
    }
    info!("Auto-scheduled {} tasks of project {}", plan.planned.len(), id);
    Ok(response::ok(AutoScheduleResult {
        scheduled_task_ids: plan.planned.into_iter().map(|p| p.task_id).collect(),
        skipped_task_ids: skipped,
        warnings: plan.warnings,
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::json;

    use super::*;
    use crate::db::{lazy_pool, test_database};
    use crate::models::test_support::{seed_owner, seed_project, seed_resource, seed_task};
    use crate::routes::routes::{projects_configure, tasks_configure};

    #[::core::prelude::v1::test]
    fn shift_days_is_required_and_bounded() {
        let mut v = Validator::new();
        assert_eq!(shift_days(&mut v, Some(-14)), Some(-14));
        assert_eq!(shift_days(&mut v, Some(0)), Some(0));
        assert!(!v.has_error("deltaDays"));

        assert_eq!(shift_days(&mut v, Some(3651)), None);
        assert!(v.has_error("deltaDays"));

        let mut v = Validator::new();
        assert_eq!(shift_days(&mut v, None), None);
        assert!(v.has_error("deltaDays"));
    }

    #[::core::prelude::v1::test]
    fn workday_must_not_be_inverted() {
        let mut v = Validator::new();
        check_workday(&mut v, NaiveTime::from_hms_opt(7, 0, 0), NaiveTime::from_hms_opt(16, 30, 0));
        assert!(!v.has_error("workdayEnd"));

        check_workday(&mut v, NaiveTime::from_hms_opt(17, 0, 0), NaiveTime::from_hms_opt(8, 0, 0));
        assert!(v.has_error("workdayEnd"));
    }

    #[actix_web::test]
    async fn shifting_requires_a_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .configure(projects_configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/projects/6f9619ff-8b86-4d11-b42d-00c04fc964ff/shift")
            .set_json(json!({ "deltaDays": 7 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn trash_and_restore_require_a_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .configure(projects_configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/projects/trash").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
        let req = test::TestRequest::post()
            .uri("/api/projects/6f9619ff-8b86-4d11-b42d-00c04fc964ff/restore")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    // Needs TEST_DATABASE_URL; skipped otherwise.
    #[actix_web::test]
    async fn trashing_a_project_frees_its_slots_and_restore_brings_tasks_back() {
        let Some(pool) = test_database().await else {
            return;
        };
        let (owner, bearer) = seed_owner(&pool).await;
        let project = seed_project(&pool, &owner).await;
        let task = seed_task(&pool, &owner, &project, "2026-02-02", "2026-02-06").await;
        let other_project = seed_project(&pool, &owner).await;
        let other_task = seed_task(&pool, &owner, &other_project, "2026-02-02", "2026-02-06").await;
        let resource = seed_resource(&pool, &owner).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .configure(projects_configure)
                .configure(tasks_configure),
        )
        .await;
        let booking = json!({ "resourceId": resource, "assignmentDate": "2026-02-04", "halfDay": "full_day" });

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/assignments", task))
            .insert_header(("Authorization", bearer.as_str()))
            .set_json(&booking)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/projects/{}", project))
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri(&format!("/api/tasks/{}/assignments", other_task))
            .insert_header(("Authorization", bearer.as_str()))
            .set_json(&booking)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri("/api/projects/trash")
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let trashed: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["id"].as_str())
            .collect();
        assert_eq!(trashed, vec![project.as_str()]);

        let req = test::TestRequest::post()
            .uri(&format!("/api/projects/{}/restore", project))
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/tasks/{}", task))
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/tasks/{}/assignments", task))
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);

        let req = test::TestRequest::post()
            .uri(&format!("/api/projects/{}/restore", project))
            .insert_header(("Authorization", bearer.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
