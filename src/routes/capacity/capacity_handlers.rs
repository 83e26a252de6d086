use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use log::info;
use sqlx::MySqlPool;

use super::capacity_models::CapacityQuery;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::enums::Department;
use crate::models::resource::Resource;
use crate::models::task_assignment::AssignmentDetail;
use crate::planning::calendar::weekdays_between;
use crate::planning::capacity::{build_department, build_overview, build_resource_capacity};
use crate::routes::response;
use crate::validation::{path_uuid, Validator};

fn range(query: &CapacityQuery) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let mut v = Validator::new();
    let range = v.date_range(query.from.as_deref(), query.to.as_deref());
    v.finish()?;
    range.ok_or_else(|| ApiError::BadRequest("from and to are required".into()))
}

pub async fn overview(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    query: web::Query<CapacityQuery>,
) -> Result<HttpResponse, ApiError> {
    let (from, to) = range(&query)?;
    let resources = Resource::active_people(pool.get_ref(), &auth.user_id).await?;
    let assignments = AssignmentDetail::owned_between(pool.get_ref(), &auth.user_id, from, to).await?;

    let overview = build_overview(from, to, None, &resources, &assignments);
    info!(
        "Capacity {}..{} for {}: {} resources, {}% utilized",
        from,
        to,
        auth.user_name,
        resources.len(),
        overview.utilization_percent
    );
    Ok(response::ok(overview))
}

pub async fn department(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    query: web::Query<CapacityQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let dept: Option<Department> = v.required_choice("department", Some(path.as_str()));
    v.finish()?;
    let dept = dept.ok_or_else(|| ApiError::BadRequest("department is required".into()))?;
    let (from, to) = range(&query)?;

    let resources = Resource::active_people(pool.get_ref(), &auth.user_id).await?;
    let assignments = AssignmentDetail::owned_between(pool.get_ref(), &auth.user_id, from, to).await?;
    Ok(response::ok(build_department(dept, from, to, &resources, &assignments)))
}

pub async fn resource(
    pool: web::Data<MySqlPool>,
    auth: AuthUser,
    path: web::Path<String>,
    query: web::Query<CapacityQuery>,
) -> Result<HttpResponse, ApiError> {
    let id = path_uuid("id", &path)?;
    let (from, to) = range(&query)?;

    let resource = Resource::find_owned(pool.get_ref(), &auth.user_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource"))?;
    let dates = weekdays_between(from, to);
    if dates.is_empty() {
        return Err(ApiError::NotFound("No working days in the requested range".into()));
    }

    let assignments = AssignmentDetail::of_resource_between(pool.get_ref(), &id, from, to).await?;
    let refs: Vec<&AssignmentDetail> = assignments.iter().collect();
    Ok(response::ok(build_resource_capacity(&resource, &dates, &refs)))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};

    use super::*;
    use crate::db::lazy_pool;
    use crate::routes::routes::capacity_configure;

    fn query(from: Option<&str>, to: Option<&str>) -> CapacityQuery {
        CapacityQuery {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    #[::core::prelude::v1::test]
    fn range_is_limited_to_31_days() {
        assert!(range(&query(Some("2026-02-02"), Some("2026-03-04"))).is_ok());
        assert!(matches!(
            range(&query(Some("2026-02-02"), Some("2026-03-06"))),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(range(&query(None, None)), Err(ApiError::Validation(_))));
    }

    #[actix_web::test]
    async fn capacity_requires_a_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .configure(capacity_configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/capacity?from=2026-02-02&to=2026-02-06")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
