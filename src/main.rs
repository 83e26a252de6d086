use actix_web::error::InternalError;
use actix_web::{middleware, web, App, HttpServer, ResponseError};
use dotenv::dotenv;
use log::{error, info};

mod auth;
mod config;
mod db;
mod error;
mod models;
mod planning;
mod routes;
mod validation;

use crate::config::Config;
use crate::error::ApiError;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid JSON body: {}", err);
        InternalError::from_response(err, ApiError::BadRequest(message).error_response()).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid query string: {}", err);
        InternalError::from_response(err, ApiError::BadRequest(message).error_response()).into()
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, err));
        }
    };

    let pool = db::connect(&config)
        .await
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    if config.run_migrations {
        db::migrate(&pool)
            .await
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    }

    let server_address = config.server_address.clone();
    info!("Server running at http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(json_config())
            .app_data(query_config())
            .configure(routes::routes::health_configure)
            .configure(routes::routes::auth_configure)
            .configure(routes::routes::resources_configure)
            .configure(routes::routes::projects_configure)
            .configure(routes::routes::tasks_configure)
            .configure(routes::routes::assignments_configure)
            .configure(routes::routes::capacity_configure)
            .configure(routes::routes::wochenplan_configure)
            .configure(routes::routes::pendenzen_configure)
    })
    .bind(server_address)?
    .run()
    .await
}
