//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件比较符
///
/// 规则文本中以符号形式出现（`>`、`>=`、`<`、`<=`、`=`、`!=`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl Comparator {
    /// 从规则文本中的符号解析比较符，无法识别时返回 None
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Neq),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Eq => "=",
            Self::Neq => "!=",
        }
    }

    /// 数值比较，`=`/`!=` 使用精确相等
    pub fn compare_numbers(&self, actual: f64, target: f64) -> bool {
        match self {
            Self::Gt => actual > target,
            Self::Gte => actual >= target,
            Self::Lt => actual < target,
            Self::Lte => actual <= target,
            Self::Eq => actual == target,
            Self::Neq => actual != target,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// 大小写不敏感地解析 AND / OR
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("AND") {
            Some(Self::And)
        } else if s.eq_ignore_ascii_case("OR") {
            Some(Self::Or)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// 规则文本中的分隔形式，如 `" AND "`
    pub(crate) fn delimiter(&self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }

    /// 合并左右子节点的求值结果
    pub fn apply(&self, left: bool, right: bool) -> bool {
        match self {
            Self::And => left && right,
            Self::Or => left || right,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparator_symbols() {
        for symbol in [">", ">=", "<", "<=", "=", "!="] {
            let cmp = Comparator::from_symbol(symbol).unwrap();
            assert_eq!(cmp.to_string(), symbol);
        }
        assert!(Comparator::from_symbol("==").is_none());
        assert!(Comparator::from_symbol("").is_none());
    }

    #[test]
    fn test_exact_float_equality() {
        assert!(Comparator::Eq.compare_numbers(0.5, 0.5));
        assert!(!Comparator::Eq.compare_numbers(0.1 + 0.2, 0.3));
        assert!(Comparator::Neq.compare_numbers(0.1 + 0.2, 0.3));
    }

    #[test]
    fn test_logical_operator_case_insensitive() {
        assert_eq!(LogicalOperator::parse("and"), Some(LogicalOperator::And));
        assert_eq!(LogicalOperator::parse("Or"), Some(LogicalOperator::Or));
        assert_eq!(LogicalOperator::parse("XOR"), None);
    }

    #[test]
    fn test_logical_operator_serde() {
        let json = serde_json::to_string(&LogicalOperator::And).unwrap();
        assert_eq!(json, "\"AND\"");
        let parsed: LogicalOperator = serde_json::from_str("\"OR\"").unwrap();
        assert_eq!(parsed, LogicalOperator::Or);
    }
}
