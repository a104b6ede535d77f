//! 规则合并
//!
//! 提供两种形状不同的合并方式，调用方需显式选择：
//! - [`combine_or`]：右倾的二叉 OR 链，`OR(r1, OR(r2, r3))`
//! - [`combine_and_flat`]：单个 AND 组，按顺序平铺所有规则的根节点

use crate::models::{FlatGroup, Node, Rule};
use crate::operators::LogicalOperator;
use crate::parser::parse_rule;

/// 将多棵树合并为右倾 OR 链
///
/// 空输入返回 None，单棵树原样返回。
pub fn combine_or(nodes: Vec<Node>) -> Option<Node> {
    let mut iter = nodes.into_iter().rev();
    let last = iter.next()?;

    Some(iter.fold(last, |right, left| Node::or(left, right)))
}

/// 解析每条规则文本后做 OR 合并
///
/// 返回持久化用的规则文本（输入以 `" OR "` 连接）和合并后的树。
pub fn combine_rule_strings<S: AsRef<str>>(rule_strings: &[S]) -> (String, Option<Node>) {
    let joined = rule_strings
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" OR ");
    let nodes = rule_strings.iter().map(|s| parse_rule(s.as_ref())).collect();

    (joined, combine_or(nodes))
}

/// 将多条规则的根节点平铺到一个 AND 组下
///
/// 没有根节点的规则被跳过；空输入返回 None。
pub fn combine_and_flat(rules: &[Rule]) -> Option<FlatGroup> {
    if rules.is_empty() {
        return None;
    }

    let children = rules
        .iter()
        .filter_map(|rule| rule.root_node.clone())
        .collect();

    Some(FlatGroup::new(LogicalOperator::And, children))
}
