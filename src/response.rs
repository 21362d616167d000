use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Uniform envelope every endpoint answers with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Success envelope with status code.
pub fn ok<T: Serialize>(status: StatusCode, message: Option<&str>, data: Option<T>) -> Response {
    let body = ApiResponse {
        success: true,
        message: message.map(String::from),
        data,
        error: None,
    };
    (status, Json(body)).into_response()
}

/// Failure envelope; `success` is always false and `data` absent.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            message: None,
            data: None,
            error: Some(ErrorInfo {
                code: self.code,
                message: self.message,
                details: None,
            }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shape() {
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            message: None,
            data: None,
            error: Some(ErrorInfo {
                code: "INVALID_ID",
                message: "invalid user id".into(),
                details: None,
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": {"code": "INVALID_ID", "message": "invalid user id"}
            })
        );
    }

    #[test]
    fn api_error_status() {
        let resp = ApiError::internal().into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "user not found")
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
