//! 规则服务错误类型定义

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rule_engine::RuleError;
use rules_shared::error::SharedError;
use serde_json::json;

/// 规则服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("规则解析失败: {0}")]
    RuleParse(String),

    // 资源不存在
    #[error("规则不存在: {0}")]
    RuleNotFound(i64),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("存储数据损坏: {0}")]
    CorruptData(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ServiceError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::RuleParse(_) => StatusCode::BAD_REQUEST,
            Self::RuleNotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::CorruptData(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RuleParse(_) => "RULE_PARSE_ERROR",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::CorruptData(_) => "CORRUPT_DATA",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::CorruptData(e) => {
                tracing::error!(error = %e, "存储数据损坏");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<RuleError> for ServiceError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::ParseError(msg) => Self::RuleParse(msg),
            RuleError::RuleNotFound(id) => Self::RuleNotFound(id),
        }
    }
}

impl From<SharedError> for ServiceError {
    fn from(err: SharedError) -> Self {
        match err {
            SharedError::Database(e) => Self::Database(e),
            SharedError::Migration(e) => Self::Internal(format!("数据库迁移失败: {}", e)),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ServiceError>;
