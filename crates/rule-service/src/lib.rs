//! 规则服务
//!
//! 通过 REST API 暴露规则表达式引擎：创建、列表、合并、删除规则，以及用上下文评估所有规则。
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `repository`: 规则仓储（PostgreSQL / 内存）
//! - `routes`: 路由配置
//! - `service`: 规则应用服务
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 持久化：sqlx (PostgreSQL)
//! - 序列化：serde (camelCase)

pub mod dto;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

pub use dto::{CreateRuleRequest, EvaluateResponse};
pub use error::{Result, ServiceError};
pub use repository::{MemoryRuleRepository, PgRuleRepository, RuleRepository};
pub use service::RuleService;
pub use state::AppState;
