use actix_web::{HttpResponse, Responder};
use chrono::Utc;
use log::info;

use super::health_models::HealthResponse;

pub async fn health() -> impl Responder {
    info!("Received request on /health endpoint");
    HttpResponse::Ok().json(HealthResponse {
        success: true,
        message: "Werkplan backend is running".into(),
        timestamp: Utc::now(),
    })
}
