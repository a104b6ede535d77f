//! 内存规则仓储

use async_trait::async_trait;
use rule_engine::{Node, Rule, RuleStore};

use super::traits::RuleRepository;
use crate::error::Result;

/// 内存规则仓储
///
/// 用于本地开发和测试，进程退出后数据丢失。
#[derive(Clone, Default)]
pub struct MemoryRuleRepository {
    store: RuleStore,
}

impl MemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleRepository for MemoryRuleRepository {
    async fn create(&self, rule_string: &str, root_node: Option<Node>) -> Result<Rule> {
        Ok(self.store.create(rule_string, root_node))
    }

    async fn list_all(&self) -> Result<Vec<Rule>> {
        Ok(self.store.list_all())
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        Ok(self.store.exists(id))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.store.delete(id).is_ok())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
