//! 条件评估器
//!
//! 实现单个条件节点的比较逻辑。所有异常情况（字段未知、上下文缺失、目标值无法解析、
//! 比较符不支持）都就地返回 false，不向上传播错误。

use crate::context::{EvaluationContext, FieldValue};
use crate::models::ConditionNode;
use crate::operators::Comparator;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `condition` - 条件节点
    /// * `context` - 求值上下文，只读
    pub fn evaluate(condition: &ConditionNode, context: &EvaluationContext) -> bool {
        let (Some(field), Some(target)) = (&condition.field, &condition.target_value) else {
            return false;
        };

        // 未知字段或上下文缺失时字段值为空
        let Some(actual) = context.resolve(field) else {
            return false;
        };

        // 比较符无法识别时，数值和字符串比较都返回 false
        let Some(comparator) = condition.comparator() else {
            return false;
        };

        Self::compare(&actual, target, comparator)
    }

    /// 按字段值类型比较
    pub fn compare(actual: &FieldValue, target: &str, comparator: Comparator) -> bool {
        match actual {
            FieldValue::Integer(value) => match target.parse::<i64>() {
                Ok(target) => comparator.compare_numbers(*value as f64, target as f64),
                Err(_) => false,
            },
            FieldValue::Float(value) => match target.parse::<f64>() {
                Ok(target) => comparator.compare_numbers(*value, target),
                Err(_) => false,
            },
            FieldValue::Text(value) => Self::compare_text(value, target, comparator),
        }
    }

    /// 字符串只支持 `=` 和 `!=`，去掉目标值中的引号后大小写不敏感比较
    fn compare_text(actual: &str, target: &str, comparator: Comparator) -> bool {
        let target = Self::strip_quotes(target);
        let equal = actual.to_lowercase() == target.to_lowercase();

        match comparator {
            Comparator::Eq => equal,
            Comparator::Neq => !equal,
            _ => false,
        }
    }

    fn strip_quotes(value: &str) -> String {
        value.chars().filter(|c| *c != '\'' && *c != '"').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(text: &str) -> ConditionNode {
        ConditionNode::from_text(text)
    }

    fn eval(text: &str, ctx: &EvaluationContext) -> bool {
        ConditionEvaluator::evaluate(&cond(text), ctx)
    }

    #[test]
    fn test_integer_comparisons() {
        let ctx = EvaluationContext::new().with("age", 35);

        assert!(eval("age > 30", &ctx));
        assert!(eval("age >= 35", &ctx));
        assert!(!eval("age < 35", &ctx));
        assert!(eval("age <= 35", &ctx));
        assert!(eval("age = 35", &ctx));
        assert!(eval("age != 36", &ctx));
    }

    #[test]
    fn test_integer_field_rejects_decimal_target() {
        let ctx = EvaluationContext::new().with("experience", 5);
        assert!(!eval("experience > 4.5", &ctx));
        assert!(!eval("experience < 4.5", &ctx));
    }

    #[test]
    fn test_float_comparisons() {
        let ctx = EvaluationContext::new().with("salary", 60000.5);

        assert!(eval("salary > 50000", &ctx));
        assert!(eval("salary = 60000.5", &ctx));
        assert!(!eval("salary != 60000.5", &ctx));
        assert!(eval("salary < 1e5", &ctx));
    }

    #[test]
    fn test_numeric_parse_failure_is_false() {
        let ctx = EvaluationContext::new().with("age", 35).with("salary", 10.0);
        assert!(!eval("age > thirty", &ctx));
        assert!(!eval("salary > 'abc'", &ctx));
        assert!(!eval("age != thirty", &ctx));
    }

    #[test]
    fn test_string_case_insensitive_match() {
        let ctx = EvaluationContext::new().with("department", "engineering");

        assert!(eval("department = 'Engineering'", &ctx));
        assert!(eval("department = \"ENGINEERING\"", &ctx));
        assert!(eval("department = Engineering", &ctx));
        assert!(!eval("department != 'Engineering'", &ctx));
        assert!(eval("department != 'Sales'", &ctx));
    }

    #[test]
    fn test_string_ordering_is_false() {
        let ctx = EvaluationContext::new().with("department", "b");
        assert!(!eval("department > 'a'", &ctx));
        assert!(!eval("department <= 'z'", &ctx));
    }

    #[test]
    fn test_missing_field() {
        let ctx = EvaluationContext::new();
        assert!(!eval("age > 30", &ctx));
        assert!(!eval("age != 30", &ctx));
    }

    #[test]
    fn test_unknown_field() {
        let ctx = EvaluationContext::new().with("height", 180);
        assert!(!eval("height > 100", &ctx));
    }

    #[test]
    fn test_unknown_comparator() {
        let ctx = EvaluationContext::new().with("age", 35).with("department", "HR");
        assert!(!eval("age == 35", &ctx));
        assert!(!eval("department == HR", &ctx));
    }

    #[test]
    fn test_malformed_condition() {
        let ctx = EvaluationContext::new().with("age", 35);
        assert!(!eval("age >", &ctx));
        assert!(!eval("age", &ctx));
    }

    #[test]
    fn test_field_name_case_insensitive() {
        let ctx = EvaluationContext::new().with("salary", 100.0);
        assert!(eval("SALARY >= 100", &ctx));
    }
}
