//! 规则引擎错误类型
//!
//! 求值路径不会产生错误：格式不正确的规则、无法解析的数字、缺失的字段都会就地降级为 false。
//! 这里的错误只出现在严格解析模式和规则存储操作中。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则解析失败: {0}")]
    ParseError(String),

    #[error("规则未找到: {0}")]
    RuleNotFound(i64),
}

pub type Result<T> = std::result::Result<T, RuleError>;
