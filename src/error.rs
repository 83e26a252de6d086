use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::{error, warn};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Conflict { message: String, data: Option<Value> },
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            data: None,
        }
    }

    pub fn conflict_with<T: Serialize>(message: impl Into<String>, data: &T) -> Self {
        ApiError::Conflict {
            message: message.into(),
            data: serde_json::to_value(data).ok(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ApiError::conflict("A record with the same key already exists");
            }
            if db_err.is_foreign_key_violation() {
                return ApiError::BadRequest("Referenced record does not exist".into());
            }
        }
        ApiError::Database(err)
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(format!("password hashing failed: {}", err))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            ApiError::Validation(errors) => json!({ "success": false, "errors": errors }),
            ApiError::Conflict { message, data: Some(data) } => {
                json!({ "success": false, "error": message, "data": data })
            }
            ApiError::Database(_) | ApiError::Internal(_) => {
                error!("Request failed: {}", self);
                json!({ "success": false, "error": "Internal Server Error" })
            }
            other => {
                if status == StatusCode::CONFLICT {
                    warn!("Request rejected: {}", other);
                }
                json!({ "success": false, "error": other.to_string() })
            }
        };
        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn validation_errors_are_listed_per_field() {
        let (status, body) = body_of(ApiError::Validation(vec![FieldError {
            field: "kw".into(),
            message: "kw must be between 1 and 53".into(),
        }]))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["field"], "kw");
    }

    #[actix_web::test]
    async fn conflicts_carry_their_payload() {
        let (status, body) =
            body_of(ApiError::conflict_with("Slot taken", &json!({ "conflicts": [1, 2] }))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Slot taken");
        assert_eq!(body["data"]["conflicts"][1], 2);
    }

    #[actix_web::test]
    async fn internal_details_stay_in_the_log() {
        let (status, body) = body_of(ApiError::Internal("pool exhausted".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(ApiError::not_found("Resource").to_string(), "Resource not found");
    }
}
