// src/routes/mod.rs

pub mod response;
pub mod routes;

pub mod health {
    pub mod health_handlers;
    pub mod health_models;
}

pub mod auth {
    pub mod auth_handlers;
    pub mod auth_models;
}

pub mod resources {
    pub mod resources_handlers;
    pub mod resources_models;
}

pub mod projects {
    pub mod projects_handlers;
    pub mod projects_models;
}

pub mod tasks {
    pub mod tasks_handlers;
    pub mod tasks_models;
}

pub mod assignments {
    pub mod assignments_handlers;
    pub mod assignments_models;
}

pub mod capacity {
    pub mod capacity_handlers;
    pub mod capacity_models;
}

pub mod wochenplan {
    pub mod wochenplan_handlers;
    pub mod wochenplan_models;
}

pub mod pendenzen {
    pub mod pendenzen_handlers;
    pub mod pendenzen_models;
}
