//! 规则引擎领域模型
//!
//! 规则文本解析后得到一棵严格二叉的 AST：叶子是条件节点，内部节点是 AND/OR 操作符节点。
//! 节点之间通过 `Box` 持有所有权，因此同一个节点不可能被两条规则共享。

use crate::context::EvaluationContext;
use crate::executor;
use crate::operators::{Comparator, LogicalOperator};
use serde::{Deserialize, Serialize};

/// 规则定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: i64,
    pub rule_string: String,
    pub root_node: Option<Node>,
}

impl Rule {
    pub fn new(id: i64, rule_string: impl Into<String>, root_node: Option<Node>) -> Self {
        Self {
            id,
            rule_string: rule_string.into(),
            root_node,
        }
    }

    /// 对上下文求值，没有根节点的规则永远不匹配
    pub fn evaluate(&self, context: &EvaluationContext) -> bool {
        self.root_node
            .as_ref()
            .is_some_and(|root| executor::evaluate(root, context))
    }
}

/// 规则节点（条件或操作符）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Condition(ConditionNode),
    Operator(OperatorNode),
}

impl Node {
    /// 由单段条件文本构造叶子节点
    pub fn condition(text: impl Into<String>) -> Self {
        Self::Condition(ConditionNode::from_text(text))
    }

    pub fn operator(operator: LogicalOperator, left: Option<Node>, right: Option<Node>) -> Self {
        Self::Operator(OperatorNode::new(operator, left, right))
    }

    pub fn and(left: Node, right: Node) -> Self {
        Self::operator(LogicalOperator::And, Some(left), Some(right))
    }

    pub fn or(left: Node, right: Node) -> Self {
        Self::operator(LogicalOperator::Or, Some(left), Some(right))
    }

    /// 左右子节点均不存在时为叶子
    pub fn is_leaf(&self) -> bool {
        match self {
            Self::Condition(_) => true,
            Self::Operator(op) => op.left.is_none() && op.right.is_none(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.is_leaf()
    }

    pub fn as_condition(&self) -> Option<&ConditionNode> {
        match self {
            Self::Condition(cond) => Some(cond),
            Self::Operator(_) => None,
        }
    }

    pub fn as_operator(&self) -> Option<&OperatorNode> {
        match self {
            Self::Operator(op) => Some(op),
            Self::Condition(_) => None,
        }
    }

    /// 先序遍历子树中的全部节点（含自身）
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }

    /// 子树节点总数（含自身）
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// 树深度，单个叶子为 1
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 1)];

        while let Some((node, level)) = stack.pop() {
            max_depth = max_depth.max(level);
            if let Self::Operator(op) = node {
                stack.extend(op.children().map(|child| (child, level + 1)));
            }
        }

        max_depth
    }
}

/// 先序节点迭代器
///
/// 用显式栈代替递归，右倾长链也不会耗尽线程栈。
pub struct NodeIter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Node::Operator(op) = node {
            if let Some(right) = op.right() {
                self.stack.push(right);
            }
            if let Some(left) = op.left() {
                self.stack.push(left);
            }
        }
        Some(node)
    }
}

/// 条件节点
///
/// `field`/`comparison`/`target_value` 由 `value` 在构造时一次性推导：
/// 按空白切分恰好得到三段时依次赋值，否则三者均为空（格式错误的叶子，求值恒为 false）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionNode {
    pub value: String,
    pub field: Option<String>,
    pub comparison: Option<String>,
    pub target_value: Option<String>,
}

impl ConditionNode {
    pub fn from_text(value: impl Into<String>) -> Self {
        let value = value.into();
        let parts: Vec<&str> = value.split_whitespace().collect();

        let (field, comparison, target_value) = match parts.as_slice() {
            [field, comparison, target] => (
                Some(field.to_string()),
                Some(comparison.to_string()),
                Some(target.to_string()),
            ),
            _ => (None, None, None),
        };

        Self {
            value,
            field,
            comparison,
            target_value,
        }
    }

    /// 三段式切分失败
    pub fn is_malformed(&self) -> bool {
        self.field.is_none() || self.comparison.is_none() || self.target_value.is_none()
    }

    /// 可识别的比较符
    pub fn comparator(&self) -> Option<Comparator> {
        self.comparison.as_deref().and_then(Comparator::from_symbol)
    }
}

/// 操作符节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorNode {
    pub operator: LogicalOperator,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
}

impl OperatorNode {
    pub fn new(operator: LogicalOperator, left: Option<Node>, right: Option<Node>) -> Self {
        Self {
            operator,
            left: left.map(Box::new),
            right: right.map(Box::new),
        }
    }

    pub fn left(&self) -> Option<&Node> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Node> {
        self.right.as_deref()
    }

    /// 存在的子节点，先左后右
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.left().into_iter().chain(self.right())
    }
}

/// 逐层摘下子节点再释放，避免深层树在默认的递归析构中栈溢出
impl Drop for OperatorNode {
    fn drop(&mut self) {
        let mut pending: Vec<Box<Node>> = Vec::new();
        pending.extend(self.left.take());
        pending.extend(self.right.take());

        while let Some(mut node) = pending.pop() {
            if let Node::Operator(op) = node.as_mut() {
                pending.extend(op.left.take());
                pending.extend(op.right.take());
            }
        }
    }
}

/// 平铺的逻辑组
///
/// 只由 [`combine_and_flat`](crate::combinator::combine_and_flat) 生成：一个 AND 节点下按顺序挂载多条规则的根节点。
/// 它与二叉的 [`Node`] 是两种不同的形状，因此单独建模。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatGroup {
    pub operator: LogicalOperator,
    pub children: Vec<Node>,
}

impl FlatGroup {
    pub fn new(operator: LogicalOperator, children: Vec<Node>) -> Self {
        Self { operator, children }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_three_tokens() {
        let cond = ConditionNode::from_text("age > 30");
        assert_eq!(cond.field.as_deref(), Some("age"));
        assert_eq!(cond.comparison.as_deref(), Some(">"));
        assert_eq!(cond.target_value.as_deref(), Some("30"));
        assert_eq!(cond.comparator(), Some(Comparator::Gt));
        assert!(!cond.is_malformed());
    }

    #[test]
    fn test_condition_malformed() {
        for text in ["age >", "age > 30 years", "", "a>1"] {
            let cond = ConditionNode::from_text(text);
            assert!(cond.is_malformed(), "应为格式错误的叶子: {text:?}");
            assert!(cond.field.is_none());
            assert!(cond.comparison.is_none());
            assert!(cond.target_value.is_none());
            assert_eq!(cond.value, text);
        }
    }

    #[test]
    fn test_leaf_predicates() {
        let leaf = Node::condition("age > 30");
        assert!(leaf.is_leaf());
        assert!(!leaf.has_children());

        let empty_op = Node::operator(LogicalOperator::And, None, None);
        assert!(empty_op.is_leaf());

        let half = Node::operator(LogicalOperator::Or, Some(Node::condition("a = 1")), None);
        assert!(!half.is_leaf());
        assert!(half.has_children());
    }

    #[test]
    fn test_node_serialization_shape() {
        let node = Node::and(
            Node::condition("age > 30"),
            Node::condition("department = 'Engineering'"),
        );

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], json!("operator"));
        assert_eq!(value["operator"], json!("AND"));
        assert_eq!(value["left"]["type"], json!("condition"));
        assert_eq!(value["left"]["field"], json!("age"));
        assert_eq!(value["right"]["targetValue"], json!("'Engineering'"));

        let parsed: Node = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn test_rule_serialization() {
        let rule = Rule::new(7, "age > 30", Some(Node::condition("age > 30")));
        let value = serde_json::to_value(&rule).unwrap();

        assert_eq!(value["id"], json!(7));
        assert_eq!(value["ruleString"], json!("age > 30"));
        assert_eq!(value["rootNode"]["type"], json!("condition"));
    }

    #[test]
    fn test_tree_metrics() {
        let tree = Node::and(
            Node::condition("age > 30"),
            Node::or(Node::condition("salary > 100"), Node::condition("AGE < 60")),
        );

        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_iter_is_preorder() {
        let tree = Node::and(
            Node::condition("age > 30"),
            Node::operator(LogicalOperator::Or, Some(Node::condition("b = 2")), None),
        );

        let leaves: Vec<&str> = tree
            .iter()
            .filter_map(Node::as_condition)
            .map(|cond| cond.value.as_str())
            .collect();

        assert_eq!(leaves, vec!["age > 30", "b = 2"]);
        assert_eq!(tree.iter().count(), 4);
    }

    #[test]
    fn test_rule_without_root_never_matches() {
        let rule = Rule::new(1, "", None);
        assert!(!rule.evaluate(&EvaluationContext::new()));
    }
}
