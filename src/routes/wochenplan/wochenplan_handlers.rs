use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDate};
use log::{info, warn};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use uuid::Uuid;

use super::wochenplan_models::{
    AssignBatchRequest, BatchCreated, BatchItem, CopyWeekRequest, CopyWeekResult, PhaseMatrixQuery,
    ResourcesWeekQuery, WeekQuery,
};
use crate::auth::AuthUser;
use crate::error::{ApiError, FieldError};
use crate::models::enums::{Choice, Department, HalfDay, StatusCode};
use crate::models::phase_schedule::PhaseSchedule;
use crate::models::resource::Resource;
use crate::models::task::{BoardTask, ScheduledTask};
use crate::models::task_assignment::{AssignmentDetail, NewAssignment};
use crate::planning::calendar::{current_week, kw_span, week_dates, weeks_in_year};
use crate::planning::slots::{build_resource_schedule, build_resources_overview, find_week_conflicts, shift_week};
use crate::planning::week_plan::{build_phase_matrix, compose_week_plan, group_unassigned, WeekPlanInput};
use crate::routes::assignments::assignments_handlers::{book_batch, MAX_BATCH_ITEMS};
use crate::routes::response;
use crate::validation::{path_uuid, Validator, MAX_YEAR, MIN_YEAR};

const MAX_MATRIX_WEEKS: usize = 27;

const SCHEDULED_SELECT: &str = "
    SELECT t.task_id, t.title AS task_title, p.order_number, p.customer_name, p.installation_location,
           s.phase, s.planned_year, s.planned_kw
    FROM TaskPhaseSchedules_ s
    JOIN Tasks_ t ON t.task_id = s.task_id
    JOIN Projects_ p ON p.project_id = t.project_id
    WHERE t.deleted_at IS NULL AND p.deleted_at IS NULL AND t.owner_id = ";

/// `kw`/`year` query pair; an absent value falls back to the week of `today`.
fn resolve_week(v: &mut Validator, kw: Option<&str>, year: Option<&str>, today: NaiveDate) -> Option<(u32, i32)> {
    let (current_kw, current_year) = current_week(today);
    let kw = match kw {
        None | Some("") => Some(i64::from(current_kw)),
        raw => v.query_int("kw", raw, 1, 53),
    };
    let year = match year {
        None | Some("") => Some(i64::from(current_year)),
        raw => v.query_int("year", raw, MIN_YEAR, MAX_YEAR),
    };
    Some((kw? as u32, year? as i32))
}

fn missing_week(field: &str, kw: u32, year: i32) -> ApiError {
    ApiError::Validation(vec![FieldError {
        field: field.to_string(),
        message: format!("KW {} does not exist in {}", kw, year),
    }])
}

fn requested_week(kw: Option<&str>, year: Option<&str>) -> Result<(u32, i32, [NaiveDate; 5]), ApiError> {
    let mut v = Validator::new();
    let week = resolve_week(&mut v, kw, year, Local::now().date_naive());
    v.finish()?;
    let (kw, year) = week.ok_or_else(|| ApiError::BadRequest("kw and year are required".into()))?;
    let dates = week_dates(kw, year).ok_or_else(|| missing_week("kw", kw, year))?;
    Ok((kw, year, dates))
}

async fn board_tasks(
    pool: &MySqlPool,
    owner_id: &str,
    kw: u32,
    year: i32,
    dates: &[NaiveDate; 5],
) -> Result<Vec<BoardTask>, sqlx::Error> {
    sqlx::query_as::<_, BoardTask>(
        "SELECT t.task_id, t.title AS task_title, p.project_id, p.order_number, p.sachbearbeiter,
                p.customer_name, p.installation_location, p.worker_count, p.color, p.contact_name,
                p.needs_callback, p.remarks
         FROM Tasks_ t
         JOIN Projects_ p ON p.project_id = t.project_id
         WHERE t.owner_id = ? AND t.deleted_at IS NULL AND p.deleted_at IS NULL
           AND (EXISTS (SELECT 1 FROM TaskPhaseSchedules_ s
                        WHERE s.task_id = t.task_id AND s.planned_year = ? AND s.planned_kw = ?)
             OR EXISTS (SELECT 1 FROM TaskAssignments_ ta
                        WHERE ta.task_id = t.task_id AND ta.deleted_at IS NULL
                          AND ta.assignment_date BETWEEN ? AND ?))
         ORDER BY p.order_number IS NULL, p.order_number, t.title",
    )
    .bind(owner_id)
    .bind(year)
    .bind(kw)
    .bind(dates[0])
    .bind(dates[4])
    .fetch_all(pool)
    .await
}

async fn schedules_of_tasks(pool: &MySqlPool, tasks: &[BoardTask]) -> Result<Vec<PhaseSchedule>, sqlx::Error> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb = QueryBuilder::<MySql>::new(
        "SELECT schedule_id, task_id, phase, planned_year, planned_kw FROM TaskPhaseSchedules_ WHERE task_id IN (",
    );
    let mut separated = qb.separated(", ");
    for task in tasks {
        separated.push_bind(task.task_id.clone());
    }
    separated.push_unseparated(") ORDER BY planned_year, planned_kw");
    qb.build_query_as().fetch_all(pool).await
}

/// The department-grouped board of one ISO week.
pub async fn week_plan(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    query: web::Query<WeekQuery>,
) -> Result<HttpResponse, ApiError> {
    let (kw, year, dates) = requested_week(query.kw.as_deref(), query.year.as_deref())?;

    // step: load the week
    let tasks = board_tasks(pool.get_ref(), &auth.user_id, kw, year, &dates).await?;
    let schedules = schedules_of_tasks(pool.get_ref(), &tasks).await?;
    let assignments = AssignmentDetail::owned_between(pool.get_ref(), &auth.user_id, dates[0], dates[4]).await?;
    let resources = Resource::active_people(pool.get_ref(), &auth.user_id).await?;

    // step: compose
    let plan = compose_week_plan(WeekPlanInput {
        kw,
        year,
        dates,
        tasks: &tasks,
        schedules: &schedules,
        assignments: &assignments,
        resources: &resources,
    });
    info!("Wochenplan KW {}/{} for {}: {} tasks", kw, year, auth.user_name, tasks.len());
    Ok(response::ok(plan))
}

pub async fn conflicts(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    query: web::Query<WeekQuery>,
) -> Result<HttpResponse, ApiError> {
    let (kw, year, dates) = requested_week(query.kw.as_deref(), query.year.as_deref())?;
    let assignments = AssignmentDetail::owned_between(pool.get_ref(), &auth.user_id, dates[0], dates[4]).await?;
    let found = find_week_conflicts(kw, year, &assignments);
    if !found.conflicts.is_empty() {
        warn!("KW {}/{} has {} double bookings", kw, year, found.conflicts.len());
    }
    Ok(response::ok(found))
}

fn batch_rows(v: &mut Validator, items: &[BatchItem]) -> Vec<NewAssignment> {
    let mut rows = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let field = |name: &str| format!("assignments[{}].{}", i, name);
        let task_id = v.required_uuid(&field("taskId"), item.task_id.as_deref());
        let resource_id = v.required_uuid(&field("resourceId"), item.resource_id.as_deref());
        let date = v.required_date(&field("date"), item.date.as_deref());
        let half_day: Option<HalfDay> = v.required_choice(&field("halfDay"), item.half_day.as_deref());
        let status_code: Option<StatusCode> = v.optional_choice(&field("statusCode"), item.status_code.as_deref());
        let notes = v.optional_text(&field("notes"), item.notes.as_deref(), 2000);

        if let (Some(task_id), Some(resource_id), Some(date), Some(half_day)) = (task_id, resource_id, date, half_day) {
            rows.push(NewAssignment {
                task_id,
                resource_id,
                assignment_date: date,
                half_day,
                status_code: status_code.unwrap_or(StatusCode::Assigned),
                is_fixed: item.is_fixed.unwrap_or(false),
                notes,
                start_time: None,
            });
        }
    }
    rows
}

/// Quick-assign from the board: all or nothing.
pub async fn assign_batch(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    req: web::Json<AssignBatchRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    v.check(
        !req.assignments.is_empty() && req.assignments.len() <= MAX_BATCH_ITEMS,
        "assignments",
        "assignments must contain between 1 and 100 entries",
    );
    let rows = batch_rows(&mut v, &req.assignments);
    v.finish()?;

    let created = book_batch(pool.get_ref(), &auth.user_id, &rows).await?;
    info!("Quick-assigned {} slots for {}", created.len(), auth.user_name);
    Ok(response::created(BatchCreated {
        created: created.len(),
        assignments: created,
        conflicts: Vec::new(),
    }))
}

/// Validated source and target weeks of a copy; they must differ and exist.
fn copy_weeks(v: &mut Validator, req: &CopyWeekRequest) -> Option<((u32, i32), (u32, i32))> {
    let source_kw = v.int_in_range("sourceKw", req.source_kw, 1, 53);
    let source_year = v.int_in_range("sourceYear", req.source_year, MIN_YEAR, MAX_YEAR);
    let target_kw = v.int_in_range("targetKw", req.target_kw, 1, 53);
    let target_year = v.int_in_range("targetYear", req.target_year, MIN_YEAR, MAX_YEAR);
    for (field, value) in [
        ("sourceKw", req.source_kw),
        ("sourceYear", req.source_year),
        ("targetKw", req.target_kw),
        ("targetYear", req.target_year),
    ] {
        if value.is_none() {
            v.push(field, format!("{} is required", field));
        }
    }

    let source = (source_kw? as u32, source_year? as i32);
    let target = (target_kw? as u32, target_year? as i32);
    if source.0 > weeks_in_year(source.1) {
        v.push("sourceKw", format!("KW {} does not exist in {}", source.0, source.1));
        return None;
    }
    if target.0 > weeks_in_year(target.1) {
        v.push("targetKw", format!("KW {} does not exist in {}", target.0, target.1));
        return None;
    }
    if source == target {
        v.push("targetKw", "Source and target week must differ");
        return None;
    }
    Some((source, target))
}

/// Copies phase schedules (and by default bookings) of one week into an empty week.
pub async fn copy_week(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    req: web::Json<CopyWeekRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let weeks = copy_weeks(&mut v, &req);
    v.finish()?;
    let ((source_kw, source_year), (target_kw, target_year)) =
        weeks.ok_or_else(|| ApiError::BadRequest("source and target week are required".into()))?;
    let include_assignments = req.options.include_assignments.unwrap_or(true);

    let source_dates = week_dates(source_kw, source_year).ok_or_else(|| missing_week("sourceKw", source_kw, source_year))?;
    let target_dates = week_dates(target_kw, target_year).ok_or_else(|| missing_week("targetKw", target_kw, target_year))?;

    // step: target must be empty
    let mut count = QueryBuilder::<MySql>::new(
        "SELECT CAST(COUNT(*) AS SIGNED) FROM TaskPhaseSchedules_ s
         JOIN Tasks_ t ON t.task_id = s.task_id
         WHERE t.deleted_at IS NULL AND t.owner_id = ",
    );
    count.push_bind(&auth.user_id);
    count.push(" AND s.planned_year = ").push_bind(target_year);
    count.push(" AND s.planned_kw = ").push_bind(target_kw);
    let existing: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;
    if existing > 0 {
        return Err(ApiError::conflict("Target week already has phase schedules"));
    }
    if include_assignments {
        let booked =
            AssignmentDetail::owned_between(pool.get_ref(), &auth.user_id, target_dates[0], target_dates[4]).await?;
        if !booked.is_empty() {
            return Err(ApiError::conflict("Target week already has assignments"));
        }
    }

    // step: load the source week
    let mut qb = QueryBuilder::<MySql>::new(SCHEDULED_SELECT);
    qb.push_bind(&auth.user_id);
    qb.push(" AND s.planned_year = ").push_bind(source_year);
    qb.push(" AND s.planned_kw = ").push_bind(source_kw);
    let schedules: Vec<ScheduledTask> = qb.build_query_as().fetch_all(pool.get_ref()).await?;
    let assignments = if include_assignments {
        AssignmentDetail::owned_between(pool.get_ref(), &auth.user_id, source_dates[0], source_dates[4]).await?
    } else {
        Vec::new()
    };

    // step: copy in one transaction
    let mut tx = pool.begin().await?;
    for s in &schedules {
        sqlx::query(
            "INSERT INTO TaskPhaseSchedules_ (schedule_id, task_id, phase, planned_year, planned_kw)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&s.task_id)
        .bind(&s.phase)
        .bind(target_year)
        .bind(target_kw)
        .execute(&mut *tx)
        .await?;
    }
    let copies = shift_week(&assignments, (source_kw, source_year), (target_kw, target_year)).unwrap_or_default();
    for copy in &copies {
        copy.insert(&mut *tx).await?;
    }
    tx.commit().await?;

    info!(
        "Copied KW {}/{} to KW {}/{}: {} schedules, {} assignments",
        source_kw, source_year, target_kw, target_year, schedules.len(), copies.len()
    );
    Ok(response::created(CopyWeekResult {
        source_kw,
        source_year,
        target_kw,
        target_year,
        copied_phase_schedules: schedules.len(),
        copied_assignments: copies.len(),
    }))
}

/// Tasks planned for the week that nobody is booked on yet.
pub async fn unassigned(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    query: web::Query<WeekQuery>,
) -> Result<HttpResponse, ApiError> {
    let (kw, year, dates) = requested_week(query.kw.as_deref(), query.year.as_deref())?;

    let mut qb = QueryBuilder::<MySql>::new(SCHEDULED_SELECT);
    qb.push_bind(&auth.user_id);
    qb.push(" AND s.planned_year = ").push_bind(year);
    qb.push(" AND s.planned_kw = ").push_bind(kw);
    qb.push(
        " AND NOT EXISTS (SELECT 1 FROM TaskAssignments_ ta
            WHERE ta.task_id = t.task_id AND ta.deleted_at IS NULL AND ta.assignment_date BETWEEN ",
    );
    qb.push_bind(dates[0]).push(" AND ").push_bind(dates[4]).push(")");
    qb.push(" ORDER BY p.order_number IS NULL, p.order_number, t.title");
    let rows: Vec<ScheduledTask> = qb.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(response::ok(group_unassigned(kw, year, &rows)))
}

/// The (year, kw) weeks a matrix request spans.
fn matrix_span(query: &PhaseMatrixQuery) -> Result<Vec<(i32, u32)>, ApiError> {
    let mut v = Validator::new();
    let from_kw = v.required_query_int("from_kw", query.from_kw.as_deref(), 1, 53);
    let to_kw = v.required_query_int("to_kw", query.to_kw.as_deref(), 1, 53);
    let year = v.required_query_int("year", query.year.as_deref(), MIN_YEAR, MAX_YEAR);
    let from_year = v.query_int("from_year", query.from_year.as_deref(), MIN_YEAR, MAX_YEAR);
    let to_year = v.query_int("to_year", query.to_year.as_deref(), MIN_YEAR, MAX_YEAR);
    v.finish()?;

    let (from_kw, to_kw, year) = match (from_kw, to_kw, year) {
        (Some(f), Some(t), Some(y)) => (f as u32, t as u32, y as i32),
        _ => return Err(ApiError::BadRequest("from_kw, to_kw and year are required".into())),
    };
    let from_year = from_year.map(|y| y as i32).unwrap_or(year);
    let to_year = to_year.map(|y| y as i32).unwrap_or(from_year);

    let mut v = Validator::new();
    if from_kw > weeks_in_year(from_year) {
        v.push("from_kw", format!("KW {} does not exist in {}", from_kw, from_year));
    }
    if to_kw > weeks_in_year(to_year) {
        v.push("to_kw", format!("KW {} does not exist in {}", to_kw, to_year));
    }
    v.finish()?;

    let span = kw_span(from_kw, from_year, to_kw, to_year);
    let mut v = Validator::new();
    if span.is_empty() {
        v.push("to_kw", "to_kw must be >= from_kw");
    } else if span.len() > MAX_MATRIX_WEEKS {
        v.push("to_kw", "KW range must not exceed 27 weeks");
    }
    v.finish()?;
    Ok(span)
}

pub async fn phase_matrix(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    query: web::Query<PhaseMatrixQuery>,
) -> Result<HttpResponse, ApiError> {
    let span = matrix_span(&query)?;
    let (first_year, first_kw) = span[0];
    let (last_year, last_kw) = span[span.len() - 1];

    let mut qb = QueryBuilder::<MySql>::new(SCHEDULED_SELECT);
    qb.push_bind(&auth.user_id);
    qb.push(" AND s.planned_year * 100 + s.planned_kw BETWEEN ")
        .push_bind(first_year * 100 + first_kw as i32)
        .push(" AND ")
        .push_bind(last_year * 100 + last_kw as i32);
    qb.push(" ORDER BY p.order_number IS NULL, p.order_number, t.title, s.planned_year, s.planned_kw");
    let rows: Vec<ScheduledTask> = qb.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(response::ok(build_phase_matrix(&span, &rows)))
}

pub async fn resource_schedule(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    query: web::Query<WeekQuery>,
) -> Result<HttpResponse, ApiError> {
    let resource_id = path_uuid("resourceId", &path)?;
    let (kw, year, dates) = requested_week(query.kw.as_deref(), query.year.as_deref())?;

    let resource = Resource::find_owned(pool.get_ref(), &auth.user_id, &resource_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource"))?;
    let assignments = AssignmentDetail::of_resource_between(pool.get_ref(), &resource_id, dates[0], dates[4]).await?;
    Ok(response::ok(build_resource_schedule(&resource, kw, year, &dates, &assignments)))
}

pub async fn resources_overview(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    query: web::Query<ResourcesWeekQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let department: Option<Department> = v.optional_choice("department", query.department.as_deref());
    v.finish()?;
    let (kw, year, dates) = requested_week(query.kw.as_deref(), query.year.as_deref())?;

    let mut resources = Resource::active_people(pool.get_ref(), &auth.user_id).await?;
    if let Some(department) = department {
        resources.retain(|r| r.department.as_deref() == Some(department.as_str()));
    }
    let assignments = AssignmentDetail::owned_between(pool.get_ref(), &auth.user_id, dates[0], dates[4]).await?;
    Ok(response::ok(build_resources_overview(kw, year, &dates, &resources, &assignments)))
}

#[cfg(test)]
mod tests {
    use actix_web::{http, test, web, App};
    use serde_json::json;

    use super::*;
    use crate::db::lazy_pool;
    use crate::routes::routes::wochenplan_configure;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn matrix(from_kw: &str, to_kw: &str, year: &str, to_year: Option<&str>) -> PhaseMatrixQuery {
        PhaseMatrixQuery {
            from_kw: Some(from_kw.to_string()),
            to_kw: Some(to_kw.to_string()),
            year: Some(year.to_string()),
            from_year: None,
            to_year: to_year.map(str::to_string),
        }
    }

    #[::core::prelude::v1::test]
    fn missing_week_defaults_to_today() {
        let mut v = Validator::new();
        assert_eq!(resolve_week(&mut v, None, None, d("2026-02-04")), Some((6, 2026)));
        // 2027-01-01 still belongs to the last ISO week of 2026
        assert_eq!(resolve_week(&mut v, None, None, d("2027-01-01")), Some((53, 2026)));
        assert_eq!(resolve_week(&mut v, Some("10"), None, d("2026-02-04")), Some((10, 2026)));
        assert!(v.finish().is_ok());
    }

    #[::core::prelude::v1::test]
    fn week_bounds_are_validated() {
        let mut v = Validator::new();
        assert_eq!(resolve_week(&mut v, Some("0"), Some("2026"), d("2026-02-04")), None);
        assert!(v.has_error("kw"));
    }

    #[::core::prelude::v1::test]
    fn matrix_wraps_over_the_year_end() {
        let span = matrix_span(&matrix("52", "2", "2026", Some("2027"))).unwrap();
        assert_eq!(span, vec![(2026, 52), (2026, 53), (2027, 1), (2027, 2)]);
    }

    #[::core::prelude::v1::test]
    fn matrix_rejects_reversed_and_long_ranges() {
        assert!(matches!(
            matrix_span(&matrix("10", "5", "2026", None)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            matrix_span(&matrix("1", "28", "2026", None)),
            Err(ApiError::Validation(_))
        ));
        assert_eq!(matrix_span(&matrix("1", "27", "2026", None)).unwrap().len(), 27);
    }

    #[::core::prelude::v1::test]
    fn copy_requires_two_distinct_existing_weeks() {
        let request = |sk: i64, sy: i64, tk: i64, ty: i64| CopyWeekRequest {
            source_kw: Some(sk),
            source_year: Some(sy),
            target_kw: Some(tk),
            target_year: Some(ty),
            options: Default::default(),
        };

        let mut v = Validator::new();
        assert_eq!(copy_weeks(&mut v, &request(6, 2026, 7, 2026)), Some(((6, 2026), (7, 2026))));
        assert!(copy_weeks(&mut v, &request(6, 2026, 6, 2026)).is_none());
        assert!(copy_weeks(&mut v, &request(6, 2026, 53, 2027)).is_none());
        assert!(v.has_error("targetKw"));
    }

    #[::core::prelude::v1::test]
    fn batch_rows_keep_notes_and_defaults() {
        let items = vec![BatchItem {
            task_id: Some("6f9619ff-8b86-4d11-b42d-00c04fc964ff".into()),
            resource_id: Some("0b6f3a1e-2c44-4f0e-9d1a-6d2f5b7c8e90".into()),
            date: Some("2026-02-03".into()),
            half_day: Some("afternoon".into()),
            is_fixed: None,
            status_code: None,
            notes: Some(" Lieferung ".into()),
        }];

        let mut v = Validator::new();
        let rows = batch_rows(&mut v, &items);
        assert!(v.finish().is_ok());
        assert_eq!(rows[0].half_day, HalfDay::Afternoon);
        assert_eq!(rows[0].status_code, StatusCode::Assigned);
        assert_eq!(rows[0].notes.as_deref(), Some("Lieferung"));
        assert!(!rows[0].is_fixed);
    }

    #[actix_web::test]
    async fn board_requires_a_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .configure(wochenplan_configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/wochenplan/copy-week")
            .set_json(json!({ "sourceKw": 6, "sourceYear": 2026, "targetKw": 7, "targetYear": 2026 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
    }
}
