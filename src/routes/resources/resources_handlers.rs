use actix_web::{web, HttpResponse};
use log::info;
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use uuid::Uuid;

use super::resources_models::{
    AvailableQuery, AvailableResources, CreateResourceRequest, ResourceListQuery,
    UpdateResourceRequest,
};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::enums::{Choice, Department, EmployeeType, HalfDay, ResourceType};
use crate::models::resource::Resource;
use crate::models::task_assignment::AssignmentDetail;
use crate::planning::slots::slot_conflicts;
use crate::routes::response;
use crate::validation::{path_uuid, Validator};

const MAX_SKILLS: usize = 50;

fn check_weekly_hours(v: &mut Validator, hours: Option<f64>) {
    if let Some(hours) = hours {
        v.check(
            hours > 0.0 && hours <= 80.0,
            "weeklyHours",
            "weeklyHours must be greater than 0 and at most 80",
        );
    }
}

fn check_skills(v: &mut Validator, skills: Option<&Vec<String>>) -> Option<Vec<String>> {
    let skills = skills?;
    if skills.len() > MAX_SKILLS {
        v.push("skills", "skills must not contain more than 50 entries");
        return None;
    }
    let cleaned: Vec<String> = skills.iter().map(|s| s.trim().to_string()).collect();
    if cleaned.iter().any(|s| s.is_empty() || s.chars().count() > 100) {
        v.push("skills", "each skill must be between 1 and 100 characters");
        return None;
    }
    Some(cleaned)
}

pub async fn list_resources(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    query: web::Query<ResourceListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let department: Option<Department> = v.optional_choice("department", query.department.as_deref());
    let employee_type: Option<EmployeeType> =
        v.optional_choice("employee_type", query.employee_type.as_deref());
    let resource_type: Option<ResourceType> =
        v.optional_choice("resource_type", query.resource_type.as_deref());
    let is_active = v.optional_bool("is_active", query.is_active.as_deref());
    v.finish()?;

    let mut qb = QueryBuilder::<MySql>::new("SELECT * FROM Resources_ WHERE owner_id = ");
    qb.push_bind(&auth.user_id);
    if let Some(department) = department {
        qb.push(" AND department = ").push_bind(department.as_str());
    }
    if let Some(employee_type) = employee_type {
        qb.push(" AND employee_type = ").push_bind(employee_type.as_str());
    }
    if let Some(resource_type) = resource_type {
        qb.push(" AND resource_type = ").push_bind(resource_type.as_str());
    }
    if let Some(is_active) = is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    qb.push(" ORDER BY name");

    let resources: Vec<Resource> = qb.build_query_as().fetch_all(pool.get_ref()).await?;
    info!("Listed {} resources for user {}", resources.len(), auth.user_name);
    Ok(response::ok(resources))
}

pub async fn create_resource(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    req: web::Json<CreateResourceRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let name = v.required_text("name", req.name.as_deref(), 255);
    let resource_type: Option<ResourceType> = v.required_choice("resourceType", req.resource_type.as_deref());
    let description = v.optional_text("description", req.description.as_deref(), 5000);
    let department: Option<Department> = v.optional_choice("department", req.department.as_deref());
    let employee_type: Option<EmployeeType> =
        v.optional_choice("employeeType", req.employee_type.as_deref());
    let short_code = v.optional_text("shortCode", req.short_code.as_deref(), 20);
    let default_location = v.optional_text("defaultLocation", req.default_location.as_deref(), 255);
    check_weekly_hours(&mut v, req.weekly_hours);
    let skills = check_skills(&mut v, req.skills.as_ref());
    v.finish()?;

    let (name, resource_type) = match (name, resource_type) {
        (Some(name), Some(resource_type)) => (name, resource_type),
        _ => return Err(ApiError::BadRequest("name and resourceType are required".into())),
    };

    let resource_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO Resources_
            (resource_id, owner_id, name, resource_type, description, is_active, availability_enabled,
             department, employee_type, short_code, default_location, weekly_hours, skills)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&resource_id)
    .bind(&auth.user_id)
    .bind(&name)
    .bind(resource_type.as_str())
    .bind(description)
    .bind(req.is_active.unwrap_or(true))
    .bind(req.availability_enabled.unwrap_or(false))
    .bind(department.map(|d| d.as_str()))
    .bind(employee_type.map(|e| e.as_str()))
    .bind(short_code)
    .bind(default_location)
    .bind(req.weekly_hours)
    .bind(skills.map(Json))
    .execute(pool.get_ref())
    .await?;

    let resource = Resource::find_owned(pool.get_ref(), &auth.user_id, &resource_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource"))?;
    info!("Resource {} created by {}", resource.name, auth.user_name);
    Ok(response::created(resource))
}

pub async fn get_resource(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let resource = Resource::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource"))?;
    Ok(response::ok(resource))
}

pub async fn update_resource(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    req: web::Json<UpdateResourceRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let req = req.into_inner();

    let mut v = Validator::new();
    let name = v.non_blank_text("name", req.name.as_deref(), 255);
    let resource_type: Option<ResourceType> = v.optional_choice("resourceType", req.resource_type.as_deref());
    let description = req
        .description
        .map(|d| v.optional_text("description", d.as_deref(), 5000));
    let department = req.department.map(|d| {
        v.optional_choice::<Department>("department", d.as_deref())
            .map(|d| d.as_str())
    });
    let employee_type = req.employee_type.map(|e| {
        v.optional_choice::<EmployeeType>("employeeType", e.as_deref())
            .map(|e| e.as_str())
    });
    let short_code = req.short_code.map(|s| v.optional_text("shortCode", s.as_deref(), 20));
    let default_location = req
        .default_location
        .map(|l| v.optional_text("defaultLocation", l.as_deref(), 255));
    if let Some(hours) = req.weekly_hours {
        check_weekly_hours(&mut v, hours);
    }
    let skills = req.skills.map(|s| check_skills(&mut v, s.as_ref()));
    v.finish()?;

    if Resource::find_owned(pool.get_ref(), &auth.user_id, &id).await?.is_none() {
        return Err(ApiError::not_found("Resource"));
    }

    let mut qb = QueryBuilder::<MySql>::new("UPDATE Resources_ SET updated_at = CURRENT_TIMESTAMP");
    if let Some(name) = name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(resource_type) = resource_type {
        qb.push(", resource_type = ").push_bind(resource_type.as_str());
    }
    if let Some(description) = description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(is_active) = req.is_active {
        qb.push(", is_active = ").push_bind(is_active);
    }
    if let Some(enabled) = req.availability_enabled {
        qb.push(", availability_enabled = ").push_bind(enabled);
    }
    if let Some(department) = department {
        qb.push(", department = ").push_bind(department);
    }
    if let Some(employee_type) = employee_type {
        qb.push(", employee_type = ").push_bind(employee_type);
    }
    if let Some(short_code) = short_code {
        qb.push(", short_code = ").push_bind(short_code);
    }
    if let Some(location) = default_location {
        qb.push(", default_location = ").push_bind(location);
    }
    if let Some(hours) = req.weekly_hours {
        qb.push(", weekly_hours = ").push_bind(hours);
    }
    if let Some(skills) = skills {
        qb.push(", skills = ").push_bind(skills.map(Json));
    }
    qb.push(" WHERE resource_id = ").push_bind(&id);
    qb.push(" AND owner_id = ").push_bind(&auth.user_id);
    qb.build().execute(pool.get_ref()).await?;

    let resource = Resource::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource"))?;
    info!("Resource {} updated by {}", id, auth.user_name);
    Ok(response::ok(resource))
}

pub async fn delete_resource(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let result = sqlx::query("DELETE FROM Resources_ WHERE resource_id = ? AND owner_id = ?")
        .bind(&id)
        .bind(&auth.user_id)
        .execute(pool.get_ref())
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Resource"));
    }
    info!("Resource {} deleted by {}", id, auth.user_name);
    Ok(response::message("Resource deleted"))
}

/// Active people with no live booking overlapping the requested half-day.
pub async fn available_resources(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    query: web::Query<AvailableQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let date = v.required_date("date", query.date.as_deref());
    let half_day: Option<HalfDay> = v.required_choice("half_day", query.half_day.as_deref());
    v.finish()?;
    let (date, half_day) = match (date, half_day) {
        (Some(date), Some(half_day)) => (date, half_day),
        _ => return Err(ApiError::BadRequest("date and half_day are required".into())),
    };

    let people = Resource::active_people(pool.get_ref(), &auth.user_id).await?;
    let booked = AssignmentDetail::owned_between(pool.get_ref(), &auth.user_id, date, date).await?;

    let resources: Vec<Resource> = people
        .into_iter()
        .filter(|r| slot_conflicts(&r.resource_id, date, half_day, &booked, None).is_empty())
        .collect();

    Ok(response::ok(AvailableResources {
        date,
        half_day: half_day.as_str().to_string(),
        resources,
    }))
}
