//! 进度奖励服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

/// 进度奖励服务错误类型
#[derive(Debug, Error)]
pub enum RewardError {
    // === 业务错误 ===
    #[error("{entity} 不存在: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("参数校验失败: {0}")]
    Validation(String),

    /// 并发竞争失败，另一个请求已经完成了同一状态迁移
    #[error("并发冲突: {0}")]
    Conflict(String),

    /// 下游阶段（证书、成就、通知）失败，不回滚已提交的进度
    #[error("下游阶段失败: stage={stage}, {message}")]
    Dependency {
        stage: &'static str,
        message: String,
    },

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 进度奖励服务 Result 类型别名
pub type Result<T> = std::result::Result<T, RewardError>;

impl RewardError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn dependency(stage: &'static str, source: impl std::fmt::Display) -> Self {
        Self::Dependency {
            stage,
            message: source.to_string(),
        }
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Dependency { .. })
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_)
        )
    }

    /// 并发冲突对调用方而言等同于成功
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Dependency { .. } => "DEPENDENCY_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(RewardError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(RewardError::dependency("certificate", "timeout").is_retryable());
        assert!(!RewardError::Validation("bad lesson".to_string()).is_retryable());
        assert!(!RewardError::Conflict("edge taken".to_string()).is_retryable());
    }

    #[test]
    fn test_error_is_business_error() {
        assert!(RewardError::not_found("course", "x").is_business_error());
        assert!(RewardError::Conflict("edge taken".to_string()).is_business_error());
        assert!(!RewardError::Internal("panic".to_string()).is_business_error());
        assert!(!RewardError::Database(sqlx::Error::RowNotFound).is_business_error());
    }

    #[test]
    fn test_error_code() {
        assert_eq!(RewardError::not_found("certificate", "CERT-1").error_code(), "NOT_FOUND");
        assert_eq!(
            RewardError::dependency("notification", "down").error_code(),
            "DEPENDENCY_FAILED"
        );
        assert_eq!(
            RewardError::Validation("x".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_error_display() {
        let err = RewardError::not_found("achievement", "quiz-master");
        assert!(err.to_string().contains("achievement"));
        assert!(err.to_string().contains("quiz-master"));

        let err = RewardError::dependency("certificate", "insert failed");
        assert!(err.to_string().contains("certificate"));
        assert!(err.to_string().contains("insert failed"));
        assert!(RewardError::Conflict("x".to_string()).is_conflict());
    }
}
