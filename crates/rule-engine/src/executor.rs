//! 规则执行器
//!
//! 用显式栈后序遍历规则树求值。树只以共享引用传入，求值过程中不修改任何节点，
//! 因此同一棵树可以被多个线程并发求值。

use crate::context::EvaluationContext;
use crate::evaluator::ConditionEvaluator;
use crate::models::{ConditionNode, Node, OperatorNode, Rule};
use crate::operators::LogicalOperator;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

/// 后序求值的步骤：访问子节点（缺失时为 None），或合并栈顶两个结果
enum Step<'a> {
    Visit(Option<&'a Node>),
    Combine(LogicalOperator),
}

/// 对一棵规则树求值
///
/// 缺失的子节点按 false 处理。左右子树都会求值，用显式栈遍历，树的深度不受线程栈限制。
pub fn evaluate(node: &Node, context: &EvaluationContext) -> bool {
    let mut steps = vec![Step::Visit(Some(node))];
    let mut values: Vec<bool> = Vec::new();

    while let Some(step) = steps.pop() {
        match step {
            Step::Visit(None) => values.push(false),
            Step::Visit(Some(Node::Condition(cond))) => {
                values.push(ConditionEvaluator::evaluate(cond, context));
            }
            Step::Visit(Some(Node::Operator(op))) => {
                steps.push(Step::Combine(op.operator));
                steps.push(Step::Visit(op.right()));
                steps.push(Step::Visit(op.left()));
            }
            Step::Combine(operator) => {
                let right = values.pop().unwrap_or(false);
                let left = values.pop().unwrap_or(false);
                values.push(operator.apply(left, right));
            }
        }
    }

    values.pop().unwrap_or(false)
}

/// 单条规则的评估结果
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub matched: bool,
    pub rule_id: i64,
    pub matched_conditions: Vec<String>,
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_us: u64,
}

impl EvaluationResult {
    pub fn new(rule_id: i64) -> Self {
        Self {
            matched: false,
            rule_id,
            matched_conditions: Vec::new(),
            evaluation_trace: Vec::new(),
            evaluation_time_us: 0,
        }
    }
}

/// 规则执行器
///
/// 与 [`evaluate`] 结果一致，额外收集命中的条件和可选的评估追踪。
pub struct RuleExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 执行规则评估
    pub fn execute(&self, rule: &Rule, context: &EvaluationContext) -> EvaluationResult {
        let start = Instant::now();
        let mut result = EvaluationResult::new(rule.id);

        result.matched = match &rule.root_node {
            Some(root) => self.evaluate_node(root, context, &mut result),
            None => {
                if self.trace_enabled {
                    result.evaluation_trace.push("root: 规则没有根节点".to_string());
                }
                false
            }
        };
        result.evaluation_time_us = start.elapsed().as_micros() as u64;

        result
    }

    /// 与 [`evaluate`] 相同的后序遍历，按路径记录命中条件和追踪
    fn evaluate_node(
        &self,
        root: &Node,
        context: &EvaluationContext,
        result: &mut EvaluationResult,
    ) -> bool {
        let mut steps = vec![TraceStep::Visit(Some(root), "root".to_string())];
        let mut values: Vec<bool> = Vec::new();

        while let Some(step) = steps.pop() {
            match step {
                TraceStep::Visit(None, _) => values.push(false),
                TraceStep::Visit(Some(Node::Condition(cond)), path) => {
                    values.push(self.evaluate_condition(cond, context, result, &path));
                }
                TraceStep::Visit(Some(Node::Operator(op)), path) => {
                    let left = format!("{}.left", path);
                    let right = format!("{}.right", path);
                    steps.push(TraceStep::Combine(op, path));
                    steps.push(TraceStep::Visit(op.right(), right));
                    steps.push(TraceStep::Visit(op.left(), left));
                }
                TraceStep::Combine(op, path) => {
                    let right = values.pop().unwrap_or(false);
                    let left = values.pop().unwrap_or(false);
                    let matched = op.operator.apply(left, right);

                    if self.trace_enabled {
                        result.evaluation_trace.push(format!(
                            "{}: {} ({}, {}) => {}",
                            path,
                            op.operator,
                            left,
                            right,
                            if matched { "MATCHED" } else { "NOT_MATCHED" }
                        ));
                    }
                    values.push(matched);
                }
            }
        }

        values.pop().unwrap_or(false)
    }

    fn evaluate_condition(
        &self,
        cond: &ConditionNode,
        context: &EvaluationContext,
        result: &mut EvaluationResult,
        path: &str,
    ) -> bool {
        let matched = ConditionEvaluator::evaluate(cond, context);

        if self.trace_enabled {
            let note = if cond.is_malformed() { " (格式错误)" } else { "" };
            result.evaluation_trace.push(format!(
                "{}: {}{} => {}",
                path,
                cond.value,
                note,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        if matched {
            result
                .matched_conditions
                .push(format!("{}: {}", path, cond.value));
        }

        matched
    }
}

/// 带路径的求值步骤
enum TraceStep<'a> {
    Visit(Option<&'a Node>, String),
    Combine(&'a OperatorNode, String),
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// 规则集评估结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSetOutcome {
    pub matched: bool,
    /// 第一条命中的规则
    pub matched_rule_id: Option<i64>,
    /// 实际参与求值的规则数（命中后不再继续）
    pub rules_evaluated: usize,
}

/// 规则集评估器
///
/// 按顺序逐条求值，遇到第一条命中的规则立即返回。
pub struct RuleSetEvaluator;

impl RuleSetEvaluator {
    pub fn evaluate<'a, I>(rules: I, context: &EvaluationContext) -> RuleSetOutcome
    where
        I: IntoIterator<Item = &'a Rule>,
    {
        let mut rules_evaluated = 0;

        for rule in rules {
            rules_evaluated += 1;
            if rule.evaluate(context) {
                debug!(rule_id = rule.id, rules_evaluated, "rule matched");
                return RuleSetOutcome {
                    matched: true,
                    matched_rule_id: Some(rule.id),
                    rules_evaluated,
                };
            }
        }

        RuleSetOutcome {
            matched: false,
            matched_rule_id: None,
            rules_evaluated,
        }
    }
}

/// 规则集中任一规则命中即为 true，空集为 false
pub fn evaluate_rules<'a, I>(rules: I, context: &EvaluationContext) -> bool
where
    I: IntoIterator<Item = &'a Rule>,
{
    RuleSetEvaluator::evaluate(rules, context).matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_rule;

    fn rule(id: i64, text: &str) -> Rule {
        Rule::new(id, text, Some(parse_rule(text)))
    }

    fn create_test_context() -> EvaluationContext {
        EvaluationContext::new()
            .with("age", 35)
            .with("salary", 60000.0)
            .with("department", "Engineering")
            .with("experience", 8)
    }

    #[test]
    fn test_and_tree() {
        let tree = parse_rule("age > 30 AND department = 'Engineering'");
        assert!(evaluate(&tree, &create_test_context()));

        let ctx = create_test_context().with("department", "Sales");
        assert!(!evaluate(&tree, &ctx));
    }

    #[test]
    fn test_or_tree() {
        let tree = parse_rule("age > 50 OR salary > 50000");
        assert!(evaluate(&tree, &create_test_context()));
    }

    #[test]
    fn test_missing_children_are_false() {
        let ctx = create_test_context();

        let or_half = Node::operator(LogicalOperator::Or, Some(parse_rule("age > 30")), None);
        assert!(evaluate(&or_half, &ctx));

        let and_half = Node::operator(LogicalOperator::And, Some(parse_rule("age > 30")), None);
        assert!(!evaluate(&and_half, &ctx));

        let empty = Node::operator(LogicalOperator::Or, None, None);
        assert!(!evaluate(&empty, &ctx));
    }

    #[test]
    fn test_evaluation_is_pure() {
        let tree = parse_rule("age > 30 AND (salary > 100 OR department = 'HR')");
        let snapshot = tree.clone();
        let ctx = create_test_context();

        let first = evaluate(&tree, &ctx);
        let second = evaluate(&tree, &ctx);

        assert_eq!(first, second);
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_executor_matches_evaluate() {
        let r = rule(1, "age > 30 AND salary > 50000 OR experience < 2");
        let ctx = create_test_context();

        let result = RuleExecutor::new().execute(&r, &ctx);
        assert_eq!(result.matched, evaluate(r.root_node.as_ref().unwrap(), &ctx));
        assert_eq!(result.rule_id, 1);
        assert_eq!(result.matched_conditions.len(), 2);
    }

    #[test]
    fn test_trace_output() {
        let r = rule(2, "age > 30 AND age >");
        let result = RuleExecutor::new()
            .with_trace()
            .execute(&r, &create_test_context());

        assert!(!result.matched);
        assert_eq!(result.evaluation_trace.len(), 3);
        assert!(result.evaluation_trace[0].contains("MATCHED"));
        assert!(result.evaluation_trace[1].contains("格式错误"));
        assert!(result.evaluation_trace[2].starts_with("root: AND"));
    }

    #[test]
    fn test_trace_for_rule_without_root() {
        let r = Rule::new(3, "", None);
        let result = RuleExecutor::new()
            .with_trace()
            .execute(&r, &create_test_context());

        assert!(!result.matched);
        assert_eq!(result.evaluation_trace.len(), 1);
    }

    #[test]
    fn test_rule_set_short_circuit() {
        let rules = vec![
            rule(1, "age > 60"),
            rule(2, "department = 'engineering'"),
            rule(3, "salary > 0"),
        ];

        let outcome = RuleSetEvaluator::evaluate(&rules, &create_test_context());
        assert!(outcome.matched);
        assert_eq!(outcome.matched_rule_id, Some(2));
        assert_eq!(outcome.rules_evaluated, 2);
    }

    #[test]
    fn test_rule_set_no_match() {
        let rules = vec![rule(1, "age > 60"), rule(2, "experience > 20")];

        let outcome = RuleSetEvaluator::evaluate(&rules, &create_test_context());
        assert!(!outcome.matched);
        assert_eq!(outcome.matched_rule_id, None);
        assert_eq!(outcome.rules_evaluated, 2);
    }

    #[test]
    fn test_empty_rule_set() {
        let rules: Vec<Rule> = Vec::new();
        assert!(!evaluate_rules(&rules, &create_test_context()));
    }
}
