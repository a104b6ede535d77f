//! PostgreSQL 连接池
//!
//! 规则与规则树节点存放在同一个库中，迁移脚本位于 `crates/shared/migrations`。

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;
use crate::error::Result;

/// 规则库连接池
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// 由配置构造连接池参数
fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}

impl Database {
    /// 建立连接池，失败时立即返回错误
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = pool_options(config).connect(&config.url).await?;
        info!("Rule database connected");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行一次 `SELECT 1`，用于 /ready 就绪探针
    pub async fn health_check(&self) -> Result<()> {
        let start = Instant::now();
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Database ping");
        Ok(())
    }

    /// 应用规则表与节点表的迁移
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Rule schema migrations applied");
        Ok(())
    }

    /// 等待在途查询结束后关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Rule database closed");
    }
}
