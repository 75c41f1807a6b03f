use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// 存储层错误，唯一允许调用方带退避重试的类别
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("No active lottery drawing")]
    NoActiveDrawing,

    #[error("Entry cap exceeded: {0}")]
    CapExceeded(String),

    /// 幂等键冲突（同一到店记录重复兑换、本期打卡奖励已领等）
    #[error("Already awarded: {0}")]
    AlreadyAwarded(String),

    /// 防刷校验未通过（到店/消费记录不属于该用户或不在本期内）
    #[error("Unverified reference: {0}")]
    UnverifiedReference(String),

    /// 抽奖期不在 active 状态（已开奖/已取消），重复开奖落在这里
    #[error("Drawing not active: {0}")]
    NotActive(String),

    #[error("Drawing has no entries")]
    NoEntries,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::NoActiveDrawing => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NO_ACTIVE_DRAWING",
                self.to_string(),
            ),
            AppError::CapExceeded(msg) => {
                log::warn!("Entry cap exceeded: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "CAP_EXCEEDED",
                    msg.clone(),
                )
            }
            AppError::AlreadyAwarded(msg) => (
                actix_web::http::StatusCode::CONFLICT,
                "ALREADY_AWARDED",
                msg.clone(),
            ),
            AppError::UnverifiedReference(msg) => {
                log::warn!("Unverified reference rejected: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "UNVERIFIED_REFERENCE",
                    msg.clone(),
                )
            }
            AppError::NotActive(msg) => (
                actix_web::http::StatusCode::CONFLICT,
                "DRAWING_NOT_ACTIVE",
                msg.clone(),
            ),
            AppError::NoEntries => (
                actix_web::http::StatusCode::CONFLICT,
                "NO_ENTRIES",
                self.to_string(),
            ),
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    msg.clone(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}
