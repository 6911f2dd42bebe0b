//! Web 层错误
//!
//! 两类错误严格区分：
//! 1. **配置错误** - 开发者把 load 标记用在了不合适的类型上，立即失败
//! 2. **数据缺失** - 请求参数或实体不存在，统一映射为 404，不属于错误

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::converter::ConversionError;
use crate::metadata::IdType;
use crate::persistence::PersistenceError;

/// 配置错误：实体类型或其主键类型不满足加载条件
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Entity {entity} is not registered for loading")]
    UnknownEntity { entity: String },

    #[error("Entity {entity} must have an id property for loading")]
    MissingIdentifier { entity: String },

    #[error("Entity {entity} id type {id_type} must have a converter")]
    MissingConverter { entity: String, id_type: IdType },

    #[error("Route {route} declares {expected} parameters but {found} names were resolved")]
    MismatchedParameterNames {
        route: String,
        expected: usize,
        found: usize,
    },
}

/// 拦截器执行结果
pub type InterceptorResult<T> = Result<T, InterceptorError>;

#[derive(Debug, Error)]
pub enum InterceptorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Interceptor execution failed: {0}")]
    ExecutionFailed(String),
}

impl InterceptorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Conversion(_) => StatusCode::BAD_REQUEST,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ExecutionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Web 层错误类型，直接作为 HTTP 响应返回
#[derive(Debug, Error)]
pub enum WebError {
    /// 404 Not Found
    #[error("Resource not found")]
    NotFound,

    /// 400 Bad Request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 500 - 加载配置错误
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// 500 Internal Server Error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 渲染为带请求路径的 JSON 错误响应
    pub fn into_response_at(self, path: &str) -> Response {
        ErrorResponse::from_error(&self, path).into_response()
    }
}

impl From<InterceptorError> for WebError {
    fn from(error: InterceptorError) -> Self {
        match error {
            InterceptorError::Configuration(e) => WebError::Configuration(e),
            InterceptorError::Conversion(e) => WebError::BadRequest(e.to_string()),
            InterceptorError::Persistence(e) => WebError::Internal(e.to_string()),
            InterceptorError::ExecutionFailed(msg) => WebError::Internal(msg),
        }
    }
}

/// 标准错误响应格式
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: String, path: String) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown Error").to_string(),
            message,
            path,
        }
    }

    pub fn from_error(error: &WebError, path: &str) -> Self {
        Self::new(error.status_code(), error.to_string(), path.to_string())
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
