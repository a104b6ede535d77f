//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use rule_engine::{Node, Rule};

use crate::error::Result;

/// 规则仓储接口
///
/// 规则树由规则独占：删除规则必须同时删除其整棵节点树。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// 保存规则及其节点树，返回分配了 ID 的规则
    async fn create(&self, rule_string: &str, root_node: Option<Node>) -> Result<Rule>;

    /// 按创建顺序列出所有规则
    async fn list_all(&self) -> Result<Vec<Rule>>;

    async fn exists(&self, id: i64) -> Result<bool>;

    /// 删除规则，规则不存在时返回 false
    async fn delete(&self, id: i64) -> Result<bool>;

    /// 存储是否可用
    async fn health_check(&self) -> Result<()>;
}
