use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    response::{ok, ApiError},
    state::AppState,
    users::{
        dto::{LoginRequest, RegisterRequest, UpdateUserRequest, ValidationError},
        services::ServiceError,
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/users/:id",
        get(get_user).put(update_user).delete(delete_user),
    )
}

fn validation_error(e: ValidationError) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.0)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(v)| v).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected request body");
        ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", rejection.body_text())
    })
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| {
        warn!(id = raw, "invalid user id");
        ApiError::new(StatusCode::BAD_REQUEST, "INVALID_ID", "invalid user id")
    })
}

/// Buckets every service failure of one endpoint under a single code.
/// Internal failures never expose their detail.
fn service_error(e: ServiceError, status: StatusCode, code: &'static str) -> ApiError {
    match e {
        ServiceError::Internal(inner) => {
            error!(error = %inner, "internal failure");
            ApiError::internal()
        }
        other => ApiError::new(status, code, other.to_string()),
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = body(payload)?;
    req.validate().map_err(validation_error)?;

    let user = state
        .users
        .register(&req.email, &req.password, &req.username)
        .await
        .map_err(|e| service_error(e, StatusCode::BAD_REQUEST, "REGISTER_FAILED"))?;

    Ok(ok(StatusCode::CREATED, Some("registration successful"), Some(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = body(payload)?;
    req.validate().map_err(validation_error)?;

    let resp = state
        .users
        .login(&req.email, &req.password)
        .await
        .map_err(|e| service_error(e, StatusCode::UNAUTHORIZED, "LOGIN_FAILED"))?;

    Ok(ok(StatusCode::OK, Some("login successful"), Some(resp)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&raw_id)?;
    let user = state
        .users
        .get_user_by_id(id)
        .await
        .map_err(|e| service_error(e, StatusCode::NOT_FOUND, "USER_NOT_FOUND"))?;

    Ok(ok(StatusCode::OK, None, Some(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&raw_id)?;
    let req = body(payload)?;
    req.validate().map_err(validation_error)?;

    let user = state
        .users
        .update_user(id, &req)
        .await
        .map_err(|e| service_error(e, StatusCode::BAD_REQUEST, "UPDATE_FAILED"))?;

    Ok(ok(StatusCode::OK, Some("update successful"), Some(user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&raw_id)?;
    state
        .users
        .delete_user(id)
        .await
        .map_err(|e| service_error(e, StatusCode::NOT_FOUND, "USER_NOT_FOUND"))?;

    Ok(ok::<()>(StatusCode::OK, Some("user deleted"), None))
}
