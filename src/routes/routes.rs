use actix_web::web;

use super::assignments::assignments_handlers;
use super::auth::auth_handlers;
use super::capacity::capacity_handlers;
use super::health::health_handlers;
use super::pendenzen::pendenzen_handlers;
use super::projects::projects_handlers;
use super::resources::resources_handlers;
use super::tasks::tasks_handlers;
use super::wochenplan::wochenplan_handlers;

pub fn health_configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_handlers::health));
}

pub fn auth_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(auth_handlers::register))
            .route("/login", web::post().to(auth_handlers::login))
            .route("/me", web::get().to(auth_handlers::me))
            .route("/logout", web::post().to(auth_handlers::logout))
    );
}

pub fn resources_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/resources")
            .route("", web::get().to(resources_handlers::list_resources))
            .route("", web::post().to(resources_handlers::create_resource))
            // before /{id}
            .route("/available", web::get().to(resources_handlers::available_resources))
            .route("/{id}", web::get().to(resources_handlers::get_resource))
            .route("/{id}", web::put().to(resources_handlers::update_resource))
            .route("/{id}", web::delete().to(resources_handlers::delete_resource))
            .route("/{id}/assignments", web::get().to(assignments_handlers::resource_assignments))
    );
}

pub fn projects_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/projects")
            .route("", web::get().to(projects_handlers::list_projects))
            .route("", web::post().to(projects_handlers::create_project))
            .route("/trash", web::get().to(projects_handlers::list_trash))
            .route("/{id}", web::get().to(projects_handlers::get_project))
            .route("/{id}", web::put().to(projects_handlers::update_project))
            .route("/{id}", web::delete().to(projects_handlers::delete_project))
            .route("/{id}/restore", web::post().to(projects_handlers::restore_project))
            .route("/{id}/permanent", web::delete().to(projects_handlers::purge_project))
            .route("/{id}/shift", web::post().to(projects_handlers::shift_project))
            .route("/{id}/auto-schedule", web::post().to(projects_handlers::auto_schedule))
            .route("/{projectId}/tasks", web::get().to(tasks_handlers::list_project_tasks))
            .route("/{projectId}/tasks", web::post().to(tasks_handlers::create_task))
            .route("/{projectId}/pendenzen", web::get().to(pendenzen_handlers::list_pendenzen))
            .route("/{projectId}/pendenzen", web::post().to(pendenzen_handlers::create_pendenz))
    );
}

pub fn tasks_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("/{id}", web::get().to(tasks_handlers::get_task))
            .route("/{id}", web::put().to(tasks_handlers::update_task))
            .route("/{id}", web::delete().to(tasks_handlers::delete_task))
            .route("/{id}/shift", web::post().to(tasks_handlers::shift_task))
            .route("/{id}/phase-schedules", web::get().to(tasks_handlers::get_phase_schedules))
            .route("/{id}/phase-schedules", web::put().to(tasks_handlers::put_phase_schedules))
            .route("/{id}/dependencies", web::get().to(tasks_handlers::list_dependencies))
            .route("/{id}/dependencies", web::post().to(tasks_handlers::create_dependency))
            .route("/{id}/dependencies/{depId}", web::delete().to(tasks_handlers::delete_dependency))
            .route("/{id}/work-slots", web::get().to(tasks_handlers::list_work_slots))
            .route("/{id}/work-slots", web::post().to(tasks_handlers::create_work_slot))
            .route("/{id}/work-slots/{slotId}", web::delete().to(tasks_handlers::delete_work_slot))
            .route("/{taskId}/assignments", web::get().to(assignments_handlers::task_assignments))
            .route("/{taskId}/assignments", web::post().to(assignments_handlers::create_assignment))
    );
}

pub fn assignments_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/assignments")
            .route("", web::get().to(assignments_handlers::list_assignments))
            .route("/bulk", web::post().to(assignments_handlers::bulk_create))
            .route("/{id}", web::get().to(assignments_handlers::get_assignment))
            .route("/{id}", web::put().to(assignments_handlers::update_assignment))
            .route("/{id}", web::delete().to(assignments_handlers::delete_assignment))
    );
}

pub fn capacity_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/capacity")
            .route("", web::get().to(capacity_handlers::overview))
            .route("/department/{dept}", web::get().to(capacity_handlers::department))
            .route("/resource/{id}", web::get().to(capacity_handlers::resource))
    );
}

pub fn wochenplan_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/wochenplan")
            .route("", web::get().to(wochenplan_handlers::week_plan))
            .route("/conflicts", web::get().to(wochenplan_handlers::conflicts))
            .route("/assign-batch", web::post().to(wochenplan_handlers::assign_batch))
            .route("/copy-week", web::post().to(wochenplan_handlers::copy_week))
            .route("/unassigned", web::get().to(wochenplan_handlers::unassigned))
            .route("/phase-matrix", web::get().to(wochenplan_handlers::phase_matrix))
            .route("/resources", web::get().to(wochenplan_handlers::resources_overview))
            .route("/resource/{resourceId}", web::get().to(wochenplan_handlers::resource_schedule))
    );
}

pub fn pendenzen_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/pendenzen")
            .route("/{id}", web::get().to(pendenzen_handlers::get_pendenz))
            .route("/{id}", web::patch().to(pendenzen_handlers::update_pendenz))
            .route("/{id}", web::delete().to(pendenzen_handlers::archive_pendenz))
            .route("/{id}/historie", web::get().to(pendenzen_handlers::historie))
    );
}
