//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use rule_engine::ParseMode;

use crate::repository::RuleRepository;
use crate::service::RuleService;

/// Axum 应用共享状态
///
/// 通过 Arc 在 handler 间共享规则服务
#[derive(Clone)]
pub struct AppState {
    pub rule_service: Arc<RuleService>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(repository: Arc<dyn RuleRepository>, mode: ParseMode) -> Self {
        Self {
            rule_service: Arc::new(RuleService::new(repository, mode)),
        }
    }
}
