//! Row builders for unit tests of the planning code, and seed rows for
//! tests that run against `TEST_DATABASE_URL`.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

use super::resource::Resource;
use super::task_assignment::AssignmentDetail;

pub fn resource(id: &str, name: &str, department: Option<&str>, weekly_hours: Option<f64>) -> Resource {
    let stamp = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    Resource {
        resource_id: id.to_string(),
        owner_id: "owner".to_string(),
        name: name.to_string(),
        resource_type: "person".to_string(),
        description: None,
        is_active: true,
        availability_enabled: false,
        department: department.map(str::to_string),
        employee_type: Some("internal".to_string()),
        short_code: None,
        default_location: None,
        weekly_hours,
        skills: None,
        created_at: stamp,
        updated_at: stamp,
    }
}

pub fn assignment(id: &str, resource_id: &str, task_id: &str, date: &str, half_day: &str) -> AssignmentDetail {
    AssignmentDetail {
        assignment_id: id.to_string(),
        task_id: task_id.to_string(),
        resource_id: resource_id.to_string(),
        assignment_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        half_day: half_day.to_string(),
        status_code: "assigned".to_string(),
        is_fixed: false,
        notes: None,
        start_time: None,
        task_title: format!("Task {}", task_id),
        project_id: "p1".to_string(),
        project_name: "Küche Meier".to_string(),
        project_order_number: Some("A-100".to_string()),
        customer_name: Some("Meier".to_string()),
        installation_location: Some("Bern".to_string()),
        resource_name: format!("Resource {}", resource_id),
        resource_short_code: None,
    }
}

/// A user with a live session; returns `(user_id, bearer header value)`.
pub async fn seed_owner(pool: &MySqlPool) -> (String, String) {
    let user_id = Uuid::new_v4().to_string();
    let name = format!("planer-{}", &user_id[..8]);
    sqlx::query("INSERT INTO Users_ (user_id, user_name, user_email, password_hash) VALUES (?, ?, ?, 'x')")
        .bind(&user_id)
        .bind(&name)
        .bind(format!("{}@werkplan.test", name))
        .execute(pool)
        .await
        .unwrap();
    let session_id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO Sessions_ (session_id, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(&session_id)
        .bind(&user_id)
        .bind(Utc::now() + Duration::hours(1))
        .execute(pool)
        .await
        .unwrap();
    (user_id, format!("Bearer {}", session_id))
}

pub async fn seed_project(pool: &MySqlPool, owner_id: &str) -> String {
    let project_id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO Projects_ (project_id, owner_id, name) VALUES (?, ?, 'Küche Meier')")
        .bind(&project_id)
        .bind(owner_id)
        .execute(pool)
        .await
        .unwrap();
    project_id
}

pub async fn seed_task(pool: &MySqlPool, owner_id: &str, project_id: &str, start: &str, due: &str) -> String {
    let task_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO Tasks_ (task_id, project_id, owner_id, title, phase, start_date, due_date)
         VALUES (?, ?, ?, 'Montage', 'montage', ?, ?)",
    )
    .bind(&task_id)
    .bind(project_id)
    .bind(owner_id)
    .bind(NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap())
    .bind(NaiveDate::parse_from_str(due, "%Y-%m-%d").unwrap())
    .execute(pool)
    .await
    .unwrap();
    task_id
}

pub async fn seed_dependency(pool: &MySqlPool, task_id: &str, depends_on: &str) {
    sqlx::query("INSERT INTO TaskDependencies_ (dependency_id, task_id, depends_on_task_id) VALUES (?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(task_id)
        .bind(depends_on)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_resource(pool: &MySqlPool, owner_id: &str) -> String {
    let resource_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO Resources_ (resource_id, owner_id, name, resource_type, department, weekly_hours)
         VALUES (?, ?, 'Hans Muster', 'person', 'montage', 42.5)",
    )
    .bind(&resource_id)
    .bind(owner_id)
    .execute(pool)
    .await
    .unwrap();
    resource_id
}
