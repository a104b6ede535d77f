//! 规则仓储层
//!
//! - `traits`: 仓储接口，服务层只依赖该抽象
//! - `rule_repo`: PostgreSQL 实现，规则树按节点表存储
//! - `memory`: 基于 [`rule_engine::RuleStore`] 的进程内实现

mod memory;
mod rule_repo;
mod traits;

pub use memory::MemoryRuleRepository;
pub use rule_repo::PgRuleRepository;
pub use traits::RuleRepository;

#[cfg(test)]
pub use traits::MockRuleRepository;
