use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

#[cfg(feature = "axum")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};

/// 协作方返回的冲突码，原样透传给调用方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictCode {
    DuplicateName,
    LimitReached,
    GroupLevelLimitReach,
    Forbidden,
    UserAlreadyExisted,
    /// 未识别的冲突码：映射为通用失败，但不中断交互
    #[serde(untagged)]
    Unknown(String),
}

impl ConflictCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "DUPLICATE_NAME" => Self::DuplicateName,
            "LIMIT_REACHED" => Self::LimitReached,
            "GROUP_LEVEL_LIMIT_REACH" => Self::GroupLevelLimitReach,
            "FORBIDDEN" => Self::Forbidden,
            "USER_ALREADY_EXISTED" => Self::UserAlreadyExisted,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DuplicateName => "DUPLICATE_NAME",
            Self::LimitReached => "LIMIT_REACHED",
            Self::GroupLevelLimitReach => "GROUP_LEVEL_LIMIT_REACH",
            Self::Forbidden => "FORBIDDEN",
            Self::UserAlreadyExisted => "USER_ALREADY_EXISTED",
            Self::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for ConflictCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 系统统一错误类型
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum AclError {
    // === 业务错误 ===
    #[error("资源未找到: {resource}")]
    NotFound { resource: String },

    #[error("请求无效: {reason}")]
    InvalidRequest { reason: String },

    #[error("规则校验失败: {subject} 不支持 {action}")]
    Validation { subject: String, action: String },

    #[error("远端冲突: {code}")]
    RemoteConflict { code: ConflictCode },

    // === 技术错误 ===
    #[error("网络错误: {operation}")]
    Network { operation: String, message: String },

    #[error("超时错误: {operation} 超过 {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("序列化错误: {format}")]
    Serialization { format: String, message: String },

    // === 系统错误 ===
    #[error("配置错误: {key} - {reason}")]
    Configuration { key: String, reason: String },

    #[error("内部系统错误: {message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

/// 错误严重级别
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Low,      // 可预期的业务错误
    Medium,   // 技术错误但不影响核心功能
    High,     // 影响核心功能的错误
    Critical, // 系统级严重错误
}

impl AclError {
    pub fn conflict(code: &str) -> Self {
        AclError::RemoteConflict {
            code: ConflictCode::parse(code),
        }
    }

    /// 获取错误的严重级别
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AclError::NotFound { .. }
            | AclError::InvalidRequest { .. }
            | AclError::Validation { .. }
            | AclError::RemoteConflict { .. } => ErrorSeverity::Low,
            AclError::Network { .. } | AclError::Timeout { .. } => ErrorSeverity::Medium,
            AclError::Serialization { .. } => ErrorSeverity::High,
            AclError::Configuration { .. } | AclError::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, AclError::Network { .. } | AclError::Timeout { .. })
    }

    /// 获取重试延迟时间
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            AclError::Network { .. } => Some(std::time::Duration::from_millis(500)),
            AclError::Timeout { .. } => Some(std::time::Duration::from_millis(1000)),
            _ => None,
        }
    }

    /// 记录错误日志
    pub fn log(&self, component: &str, operation: &str) {
        match self.severity() {
            ErrorSeverity::Low => {
                warn!(component, operation, error = %self, "业务错误");
            }
            ErrorSeverity::Medium => {
                warn!(component, operation, error = %self, "技术错误");
            }
            ErrorSeverity::High | ErrorSeverity::Critical => {
                error!(component, operation, error = %self, severity = ?self.severity(), "严重错误");
            }
        }
    }

    /// 转换为 HTTP 状态码
    pub fn to_http_status(&self) -> u16 {
        match self {
            AclError::NotFound { .. } => 404,
            AclError::InvalidRequest { .. } => 400,
            AclError::Validation { .. } => 400,
            AclError::RemoteConflict {
                code: ConflictCode::Forbidden,
            } => 403,
            AclError::RemoteConflict { .. } => 409,
            AclError::Timeout { .. } => 408,
            _ => 500,
        }
    }

    /// 获取用户友好的错误消息
    pub fn user_message(&self) -> String {
        match self {
            AclError::NotFound { .. } => "请求的资源不存在".to_string(),
            AclError::InvalidRequest { .. } => "请求参数有误，请检查后重试".to_string(),
            AclError::Validation { .. } => "规则不在可授权范围内".to_string(),
            AclError::RemoteConflict { code } => match code {
                ConflictCode::DuplicateName => "名称已存在".to_string(),
                ConflictCode::LimitReached => "角色模板数量已达上限".to_string(),
                ConflictCode::GroupLevelLimitReach => "群组层级已达上限".to_string(),
                ConflictCode::Forbidden => "没有权限执行此操作".to_string(),
                ConflictCode::UserAlreadyExisted => "用户已存在".to_string(),
                ConflictCode::Unknown(_) => "操作失败，请稍后重试".to_string(),
            },
            AclError::Timeout { .. } => "请求超时，请重试".to_string(),
            _ => "系统内部错误，请联系管理员".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AclError>;

// === 转换实现 ===

impl From<serde_json::Error> for AclError {
    fn from(err: serde_json::Error) -> Self {
        AclError::Serialization {
            format: "json".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AclError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AclError::Timeout {
                operation: "http_request".to_string(),
                timeout_ms: 30000, // 默认超时时间
            }
        } else if err.is_connect() {
            AclError::Network {
                operation: "connect".to_string(),
                message: err.to_string(),
            }
        } else {
            AclError::Network {
                operation: "http_request".to_string(),
                message: err.to_string(),
            }
        }
    }
}

// Axum integration
#[cfg(feature = "axum")]
impl IntoResponse for AclError {
    fn into_response(self) -> axum::response::Response {
        let status_code = StatusCode::from_u16(self.to_http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::json!({
            "error": self.to_string(),
            "message": self.user_message()
        });

        (status_code, Json(body)).into_response()
    }
}
