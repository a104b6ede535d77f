//! 规则表达式引擎
//!
//! 提供布尔资格规则的解析与求值能力，支持：
//! - 规则文本解析为二叉 AST（无优先级，最左操作符为根）
//! - 针对字段上下文的纯函数求值
//! - 多条规则的 OR 链合并与 AND 平铺合并
//! - 规则集短路求值与内存存储

pub mod combinator;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;
pub mod parser;
pub mod store;

pub use combinator::{combine_and_flat, combine_or, combine_rule_strings};
pub use context::{EvaluationContext, FieldValue, KnownField};
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use executor::{
    EvaluationResult, RuleExecutor, RuleSetEvaluator, RuleSetOutcome, evaluate, evaluate_rules,
};
pub use models::{ConditionNode, FlatGroup, Node, NodeIter, OperatorNode, Rule};
pub use operators::{Comparator, LogicalOperator};
pub use parser::{ParseMode, RuleParser, parse_rule};
pub use store::RuleStore;
