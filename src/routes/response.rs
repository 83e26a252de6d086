use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
struct PagedEnvelope<T: Serialize> {
    success: bool,
    data: T,
    pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope { success: true, data })
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope { success: true, data })
}

pub fn paged<T: Serialize>(data: T, pagination: Pagination) -> HttpResponse {
    HttpResponse::Ok().json(PagedEnvelope {
        success: true,
        data,
        pagination,
    })
}

#[derive(Serialize)]
struct Message {
    success: bool,
    message: String,
}

pub fn message(text: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(Message {
        success: true,
        message: text.into(),
    })
}
