use std::collections::HashSet;

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use log::{info, warn};
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::assignments_models::{
    AssignmentListQuery, BulkAssignmentRequest, BulkCreated, BulkItem, ConflictList,
    CreateAssignmentRequest, RangeQuery, UpdateAssignmentRequest,
};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::enums::{Choice, HalfDay, StatusCode};
use crate::models::resource::Resource;
use crate::models::task::Task;
use crate::models::task_assignment::{
    AssignmentDetail, NewAssignment, DETAIL_COUNT, DETAIL_ORDER, DETAIL_SELECT,
};
use crate::planning::slots::{find_batch_conflicts, slot_conflicts, SlotRequest};
use crate::routes::response::{self, Pagination};
use crate::validation::{path_uuid, Validator};

pub const MAX_BATCH_ITEMS: usize = 100;
const MAX_BULK_DATES: usize = 31;
const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

pub const SLOT_TAKEN: &str = "Resource is already assigned in this time slot";
pub const BATCH_REJECTED: &str = "Conflicts detected. No assignments were created.";

const OWNED_TASKS: &str = "SELECT t.task_id FROM Tasks_ t
    JOIN Projects_ p ON p.project_id = t.project_id
    WHERE t.deleted_at IS NULL AND p.deleted_at IS NULL AND t.owner_id = ";
const OWNED_RESOURCES: &str = "SELECT resource_id FROM Resources_ WHERE owner_id = ";

async fn owned_ids(
    pool: &MySqlPool,
    select: &str,
    column: &str,
    owner_id: &str,
    ids: &[String],
) -> Result<HashSet<String>, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new(select);
    qb.push_bind(owner_id.to_string());
    qb.push(format!(" AND {} IN (", column));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
    let rows: Vec<String> = qb.build_query_scalar().fetch_all(pool).await?;
    Ok(rows.into_iter().collect())
}

/// Checks ownership and slot conflicts for a whole batch, then writes it in one transaction.
/// Nothing is written when any row conflicts.
pub async fn book_batch(
    pool: &MySqlPool,
    owner_id: &str,
    batch: &[NewAssignment],
) -> Result<Vec<AssignmentDetail>, ApiError> {
    let (from, to) = match (
        batch.iter().map(|b| b.assignment_date).min(),
        batch.iter().map(|b| b.assignment_date).max(),
    ) {
        (Some(from), Some(to)) => (from, to),
        _ => return Ok(Vec::new()),
    };

    let task_ids: Vec<String> = batch.iter().map(|b| b.task_id.clone()).collect();
    let known_tasks = owned_ids(pool, OWNED_TASKS, "t.task_id", owner_id, &task_ids).await?;
    if let Some(missing) = task_ids.iter().find(|id| !known_tasks.contains(*id)) {
        return Err(ApiError::NotFound(format!("Task {} not found", missing)));
    }
    let resource_ids: Vec<String> = batch.iter().map(|b| b.resource_id.clone()).collect();
    let known_resources = owned_ids(pool, OWNED_RESOURCES, "resource_id", owner_id, &resource_ids).await?;
    if let Some(missing) = resource_ids.iter().find(|id| !known_resources.contains(*id)) {
        return Err(ApiError::BadRequest(format!("Resource {} not found", missing)));
    }

    let existing = AssignmentDetail::owned_between(pool, owner_id, from, to).await?;
    let requests: Vec<SlotRequest> = batch
        .iter()
        .map(|b| SlotRequest {
            task_id: b.task_id.clone(),
            resource_id: b.resource_id.clone(),
            date: b.assignment_date,
            half_day: b.half_day,
        })
        .collect();
    let conflicts = find_batch_conflicts(&requests, &existing);
    if !conflicts.is_empty() {
        warn!("Rejected batch of {} assignments with {} conflicts", batch.len(), conflicts.len());
        return Err(ApiError::conflict_with(BATCH_REJECTED, &ConflictList { conflicts }));
    }

    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(batch.len());
    for item in batch {
        ids.push(item.insert(&mut *tx).await?);
    }
    tx.commit().await?;

    let mut created = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(detail) = AssignmentDetail::find_owned(pool, owner_id, &id).await? {
            created.push(detail);
        }
    }
    Ok(created)
}

/// Expands bulk items (one row per date) and records every invalid field.
fn expand_bulk(v: &mut Validator, items: &[BulkItem]) -> Vec<NewAssignment> {
    let mut rows = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let field = |name: &str| format!("assignments[{}].{}", i, name);
        let task_id = v.required_uuid(&field("taskId"), item.task_id.as_deref());
        let resource_id = v.required_uuid(&field("resourceId"), item.resource_id.as_deref());
        let half_day: Option<HalfDay> = v.required_choice(&field("halfDay"), item.half_day.as_deref());
        let status_code: Option<StatusCode> = v.optional_choice(&field("statusCode"), item.status_code.as_deref());
        if item.dates.is_empty() || item.dates.len() > MAX_BULK_DATES {
            v.push(&field("dates"), "dates must contain between 1 and 31 entries");
            continue;
        }
        let dates: Vec<Option<NaiveDate>> = item
            .dates
            .iter()
            .map(|d| v.required_date(&field("dates"), Some(d.as_str())))
            .collect();

        if let (Some(task_id), Some(resource_id), Some(half_day)) = (task_id, resource_id, half_day) {
            for date in dates.into_iter().flatten() {
                rows.push(NewAssignment {
                    task_id: task_id.clone(),
                    resource_id: resource_id.clone(),
                    assignment_date: date,
                    half_day,
                    status_code: status_code.unwrap_or(StatusCode::Assigned),
                    is_fixed: item.is_fixed.unwrap_or(false),
                    notes: None,
                    start_time: None,
                });
            }
        }
    }
    rows
}

pub async fn create_assignment(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<CreateAssignmentRequest>,
) -> Result<HttpResponse, ApiError> {
    let task_id = path_uuid("taskId", &path)?;

    let mut v = Validator::new();
    let resource_id = v.required_uuid("resourceId", req.resource_id.as_deref());
    let date = v.required_date("assignmentDate", req.assignment_date.as_deref());
    let half_day: Option<HalfDay> = v.required_choice("halfDay", req.half_day.as_deref());
    let status_code: Option<StatusCode> = v.optional_choice("statusCode", req.status_code.as_deref());
    let notes = v.optional_text("notes", req.notes.as_deref(), 2000);
    let start_time = v.optional_time("startTime", req.start_time.as_deref());
    v.finish()?;
    let (resource_id, date, half_day) = match (resource_id, date, half_day) {
        (Some(r), Some(d), Some(h)) => (r, d, h),
        _ => return Err(ApiError::BadRequest("resourceId, assignmentDate and halfDay are required".into())),
    };

    if Task::find_owned(pool.get_ref(), &auth.user_id, &task_id).await?.is_none() {
        return Err(ApiError::not_found("Task"));
    }
    if Resource::find_owned(pool.get_ref(), &auth.user_id, &resource_id).await?.is_none() {
        return Err(ApiError::BadRequest("Resource not found".into()));
    }

    // step: slot check
    let booked = AssignmentDetail::of_resource_between(pool.get_ref(), &resource_id, date, date).await?;
    let conflicts: Vec<AssignmentDetail> = slot_conflicts(&resource_id, date, half_day, &booked, None)
        .into_iter()
        .cloned()
        .collect();
    if !conflicts.is_empty() {
        return Err(ApiError::conflict_with(SLOT_TAKEN, &ConflictList { conflicts }));
    }

    // step: insert
    let new = NewAssignment {
        task_id,
        resource_id,
        assignment_date: date,
        half_day,
        status_code: status_code.unwrap_or(StatusCode::Assigned),
        is_fixed: req.is_fixed.unwrap_or(false),
        notes,
        start_time,
    };
    let id = new.insert(pool.get_ref()).await?;
    let detail = AssignmentDetail::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment"))?;

    info!("Assignment {} created by {}", id, auth.user_name);
    Ok(response::created(detail))
}

pub async fn task_assignments(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task_id = path_uuid("taskId", &path)?;
    if Task::find_owned(pool.get_ref(), &auth.user_id, &task_id).await?.is_none() {
        return Err(ApiError::not_found("Task"));
    }
    let rows = AssignmentDetail::of_task(pool.get_ref(), &task_id).await?;
    Ok(response::ok(rows))
}

pub async fn resource_assignments(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, ApiError> {
    let resource_id = path_uuid("id", &path)?;
    let mut v = Validator::new();
    let range = v.date_range(query.from.as_deref(), query.to.as_deref());
    v.finish()?;
    let (from, to) = range.ok_or_else(|| ApiError::BadRequest("from and to are required".into()))?;

    if Resource::find_owned(pool.get_ref(), &auth.user_id, &resource_id).await?.is_none() {
        return Err(ApiError::not_found("Resource"));
    }
    let rows = AssignmentDetail::of_resource_between(pool.get_ref(), &resource_id, from, to).await?;
    Ok(response::ok(rows))
}

struct ListFilter {
    owner_id: String,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    resource_id: Option<String>,
    task_id: Option<String>,
    status_code: Option<StatusCode>,
}

impl ListFilter {
    fn apply(&self, qb: &mut QueryBuilder<'_, MySql>) {
        qb.push(" AND r.owner_id = ").push_bind(self.owner_id.clone());
        if let Some(from) = self.from {
            qb.push(" AND ta.assignment_date >= ").push_bind(from);
        }
        if let Some(to) = self.to {
            qb.push(" AND ta.assignment_date <= ").push_bind(to);
        }
        if let Some(resource_id) = &self.resource_id {
            qb.push(" AND ta.resource_id = ").push_bind(resource_id.clone());
        }
        if let Some(task_id) = &self.task_id {
            qb.push(" AND ta.task_id = ").push_bind(task_id.clone());
        }
        if let Some(status_code) = self.status_code {
            qb.push(" AND ta.status_code = ").push_bind(status_code.as_str());
        }
    }
}

pub async fn list_assignments(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    query: web::Query<AssignmentListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let from = v.optional_date("from", query.from.as_deref());
    let to = v.optional_date("to", query.to.as_deref());
    if let (Some(from), Some(to)) = (from, to) {
        v.check(to >= from, "to", "to must be on or after from");
    }
    let filter = ListFilter {
        owner_id: auth.user_id.clone(),
        from,
        to,
        resource_id: v.optional_uuid("resource_id", query.resource_id.as_deref()),
        task_id: v.optional_uuid("task_id", query.task_id.as_deref()),
        status_code: v.optional_choice("status_code", query.status_code.as_deref()),
    };
    let limit = v.query_int("limit", query.limit.as_deref(), 1, MAX_LIMIT).unwrap_or(DEFAULT_LIMIT);
    let offset = v.query_int("offset", query.offset.as_deref(), 0, i64::MAX).unwrap_or(0);
    v.finish()?;

    let mut count = QueryBuilder::<MySql>::new(DETAIL_COUNT);
    filter.apply(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut qb = QueryBuilder::<MySql>::new(DETAIL_SELECT);
    filter.apply(&mut qb);
    qb.push(DETAIL_ORDER);
    qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    let rows: Vec<AssignmentDetail> = qb.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(response::paged(rows, Pagination { total, limit, offset }))
}

pub async fn bulk_create(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    req: web::Json<BulkAssignmentRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    v.check(
        !req.assignments.is_empty() && req.assignments.len() <= MAX_BATCH_ITEMS,
        "assignments",
        "assignments must contain between 1 and 100 entries",
    );
    let rows = expand_bulk(&mut v, &req.assignments);
    v.finish()?;

    let created = book_batch(pool.get_ref(), &auth.user_id, &rows).await?;
    info!("Bulk created {} assignments for {}", created.len(), auth.user_name);
    Ok(response::created(BulkCreated {
        created: created.len(),
        assignments: created,
    }))
}

pub async fn get_assignment(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let detail = AssignmentDetail::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment"))?;
    Ok(response::ok(detail))
}

pub async fn update_assignment(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<UpdateAssignmentRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let req = req.into_inner();

    let mut v = Validator::new();
    let resource_id = v.optional_uuid("resourceId", req.resource_id.as_deref());
    let date = v.optional_date("assignmentDate", req.assignment_date.as_deref());
    let half_day: Option<HalfDay> = v.optional_choice("halfDay", req.half_day.as_deref());
    let status_code: Option<StatusCode> = v.optional_choice("statusCode", req.status_code.as_deref());
    let notes = req.notes.map(|n| v.optional_text("notes", n.as_deref(), 2000));
    let start_time = req.start_time.map(|t| v.optional_time("startTime", t.as_deref()));
    v.finish()?;

    let current = AssignmentDetail::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment"))?;

    // step: re-check the slot when it moves
    if resource_id.is_some() || date.is_some() || half_day.is_some() {
        let target_resource = resource_id.clone().unwrap_or_else(|| current.resource_id.clone());
        let target_date = date.unwrap_or(current.assignment_date);
        let target_half = match half_day {
            Some(half) => half,
            None => current
                .half_day
                .parse::<HalfDay>()
                .map_err(|e| ApiError::Internal(format!("stored half_day: {}", e.0)))?,
        };
        if resource_id.is_some()
            && Resource::find_owned(pool.get_ref(), &auth.user_id, &target_resource).await?.is_none()
        {
            return Err(ApiError::BadRequest("Resource not found".into()));
        }
        let booked =
            AssignmentDetail::of_resource_between(pool.get_ref(), &target_resource, target_date, target_date).await?;
        let conflicts: Vec<AssignmentDetail> =
            slot_conflicts(&target_resource, target_date, target_half, &booked, Some(&id))
                .into_iter()
                .cloned()
                .collect();
        if !conflicts.is_empty() {
            return Err(ApiError::conflict_with(SLOT_TAKEN, &ConflictList { conflicts }));
        }
    }

    let mut qb = QueryBuilder::<MySql>::new("UPDATE TaskAssignments_ SET updated_at = CURRENT_TIMESTAMP");
    if let Some(resource_id) = resource_id {
        qb.push(", resource_id = ").push_bind(resource_id);
    }
    if let Some(date) = date {
        qb.push(", assignment_date = ").push_bind(date);
    }
    if let Some(half_day) = half_day {
        qb.push(", half_day = ").push_bind(half_day.as_str());
    }
    if let Some(status_code) = status_code {
        qb.push(", status_code = ").push_bind(status_code.as_str());
    }
    if let Some(is_fixed) = req.is_fixed {
        qb.push(", is_fixed = ").push_bind(is_fixed);
    }
    if let Some(notes) = notes {
        qb.push(", notes = ").push_bind(notes);
    }
    if let Some(start_time) = start_time {
        qb.push(", start_time = ").push_bind(start_time);
    }
    qb.push(" WHERE assignment_id = ").push_bind(&id);
    qb.build().execute(pool.get_ref()).await?;

    let detail = AssignmentDetail::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment"))?;
    info!("Assignment {} updated by {}", id, auth.user_name);
    Ok(response::ok(detail))
}

pub async fn delete_assignment(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let result = sqlx::query(
        "UPDATE TaskAssignments_ ta
         JOIN Resources_ r ON r.resource_id = ta.resource_id
         SET ta.deleted_at = CURRENT_TIMESTAMP
         WHERE ta.assignment_id = ? AND r.owner_id = ? AND ta.deleted_at IS NULL",
    )
    .bind(&id)
    .bind(&auth.user_id)
    .execute(pool.get_ref())
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Assignment"));
    }
    info!("Assignment {} deleted by {}", id, auth.user_name);
    Ok(response::message("Assignment deleted"))
}

#[cfg(test)]
mod tests {
    use actix_web::{http, test, web, App};
    use serde_json::json;

    use super::*;
    use crate::db::lazy_pool;
    use crate::routes::routes::assignments_configure;

    const TASK: &str = "6f9619ff-8b86-4d11-b42d-00c04fc964ff";
    const RESOURCE: &str = "0b6f3a1e-2c44-4f0e-9d1a-6d2f5b7c8e90";

    fn item(dates: &[&str], half_day: &str) -> BulkItem {
        BulkItem {
            task_id: Some(TASK.to_string()),
            resource_id: Some(RESOURCE.to_string()),
            dates: dates.iter().map(|d| d.to_string()).collect(),
            half_day: Some(half_day.to_string()),
            is_fixed: Some(true),
            status_code: None,
        }
    }

    #[::core::prelude::v1::test]
    fn bulk_items_expand_to_one_row_per_date() {
        let mut v = Validator::new();
        let rows = expand_bulk(&mut v, &[item(&["2026-02-02", "2026-02-03"], "morning")]);

        assert!(v.finish().is_ok());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].assignment_date, NaiveDate::from_ymd_opt(2026, 2, 3).unwrap());
        assert_eq!(rows[0].status_code, StatusCode::Assigned);
        assert!(rows[0].is_fixed);
    }

    #[::core::prelude::v1::test]
    fn bulk_errors_name_the_item() {
        let mut v = Validator::new();
        let rows = expand_bulk(
            &mut v,
            &[item(&["2026-02-02"], "morning"), item(&["2026-02-31"], "evening")],
        );

        assert_eq!(rows.len(), 1);
        assert!(v.has_error("assignments[1].halfDay"));
        assert!(v.has_error("assignments[1].dates"));
        assert!(!v.has_error("assignments[0].halfDay"));
    }

    #[::core::prelude::v1::test]
    fn bulk_items_need_dates() {
        let mut v = Validator::new();
        let rows = expand_bulk(&mut v, &[item(&[], "full_day")]);

        assert!(rows.is_empty());
        assert!(v.has_error("assignments[0].dates"));
    }

    #[actix_web::test]
    async fn bulk_create_requires_a_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .configure(assignments_configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/assignments/bulk")
            .set_json(json!({ "assignments": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
    }
}
