//! 基础设施错误类型
//!
//! 连接池与迁移的失败统一为 [`SharedError`]，由服务层再映射为 HTTP 错误。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum SharedError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, SharedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_message() {
        let err: SharedError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, SharedError::Database(_)));
        assert!(err.to_string().starts_with("数据库错误"));
    }

    #[test]
    fn test_migration_error_message() {
        let err: SharedError = sqlx::migrate::MigrateError::VersionMissing(3).into();
        assert!(matches!(err, SharedError::Migration(_)));
        assert!(err.to_string().contains("迁移失败"));
    }
}
