use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use sqlx::MySqlPool;
use uuid::Uuid;

use super::auth_models::{LoginRequest, LoginResponse, RegisterRequest};
use crate::auth::{hash_password, session_expiry, verify_password, AuthUser};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::user::User;
use crate::routes::response;
use crate::validation::Validator;

const MIN_PASSWORD_LEN: usize = 8;

async fn find_user_by_name(pool: &MySqlPool, user_name: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM Users_ WHERE user_name = ?")
        .bind(user_name)
        .fetch_optional(pool)
        .await
}

// register user to DB
pub async fn register(
    pool: web::Data<MySqlPool>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();
    let mut v = Validator::new();
    let username = v.required_text("username", req.username.as_deref(), 100);
    let email = v.required_text("email", req.email.as_deref(), 255);
    if let Some(email) = &email {
        v.check(email.contains('@'), "email", "email must be a valid email address");
    }
    match req.password.as_deref() {
        Some(password) => v.check(
            password.chars().count() >= MIN_PASSWORD_LEN,
            "password",
            "password must be at least 8 characters",
        ),
        None => v.push("password", "password is required"),
    }
    v.finish()?;
    let (username, email) = match (username, email) {
        (Some(u), Some(e)) => (u, e),
        _ => return Err(ApiError::BadRequest("username and email are required".into())),
    };
    info!("Received request to register user: {}", username);

    // step 1: name and email must be unique
    let taken: (i64, i64) = sqlx::query_as(
        "SELECT
            CAST(COALESCE(SUM(user_name = ?), 0) AS SIGNED),
            CAST(COALESCE(SUM(user_email = ?), 0) AS SIGNED)
         FROM Users_",
    )
    .bind(&username)
    .bind(&email)
    .fetch_one(pool.get_ref())
    .await?;
    if taken.0 > 0 {
        return Err(ApiError::conflict("Username is already taken"));
    }
    if taken.1 > 0 {
        return Err(ApiError::conflict("Email is already registered"));
    }

    // step 2: hash password and insert
    let password_hash = hash_password(req.password.as_deref().unwrap_or_default())?;
    let user_id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO Users_ (user_id, user_name, user_email, password_hash) VALUES (?, ?, ?, ?)")
        .bind(&user_id)
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .execute(pool.get_ref())
        .await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM Users_ WHERE user_id = ?")
        .bind(&user_id)
        .fetch_one(pool.get_ref())
        .await?;

    info!("User {} registered successfully", username);
    Ok(response::created(user))
}

// login logic
pub async fn login(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut v = Validator::new();
    let username = v.required_text("username", req.username.as_deref(), 100);
    if req.password.as_deref().map_or(true, str::is_empty) {
        v.push("password", "password is required");
    }
    v.finish()?;
    let username = username.unwrap_or_default();
    info!("Received login request for user: {}", username);

    // step 1: look the user up and check the password
    let user = find_user_by_name(pool.get_ref(), &username).await?;
    let user = match user {
        Some(user) if verify_password(req.password.as_deref().unwrap_or_default(), &user.password_hash) => user,
        _ => {
            info!("Invalid credentials for user: {}", username);
            return Err(ApiError::Unauthorized("Invalid username or password".into()));
        }
    };

    // step 2: open a new session; a user may be logged in on several devices
    let token = Uuid::new_v4().to_string();
    let expires_at = session_expiry(&config, req.remember_me, Utc::now());
    sqlx::query("INSERT INTO Sessions_ (session_id, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(&user.user_id)
        .bind(expires_at)
        .execute(pool.get_ref())
        .await?;

    // step 3: drop this user's stale sessions
    sqlx::query("DELETE FROM Sessions_ WHERE user_id = ? AND expires_at <= ?")
        .bind(&user.user_id)
        .bind(Utc::now())
        .execute(pool.get_ref())
        .await?;

    info!("User {} logged in successfully", username);
    Ok(response::ok(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

pub async fn me(pool: web::Data<MySqlPool>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM Users_ WHERE user_id = ?")
        .bind(&auth.user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(response::ok(user))
}

pub async fn logout(pool: web::Data<MySqlPool>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    sqlx::query("DELETE FROM Sessions_ WHERE session_id = ?")
        .bind(&auth.session_id)
        .execute(pool.get_ref())
        .await?;
    info!("User {} logged out", auth.user_name);
    Ok(response::message("Logout successful"))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::json;

    use crate::config::Config;
    use crate::db::lazy_pool;
    use crate::routes::routes::auth_configure;

    #[actix_web::test]
    async fn me_without_token_is_unauthorized() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .configure(auth_configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/auth/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing authorization token");
    }

    #[actix_web::test]
    async fn register_reports_every_invalid_field() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(Config::for_tests()))
                .configure(auth_configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "username": " ", "email": "nobody", "password": "short" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["username", "email", "password"]);
    }
}
