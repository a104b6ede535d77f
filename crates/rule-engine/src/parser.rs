//! 规则文本解析器
//!
//! 将 `age > 30 AND department = 'Engineering'` 这样的规则文本解析为二叉 AST。
//!
//! 语法没有优先级：在括号深度为 0 的位置从左到右扫描，遇到的第一个 ` AND ` 或 ` OR `
//! 就是根操作符，左侧文本和右侧文本分别递归解析。因此 `a AND b OR c` 解析为
//! `AND(a, OR(b, c))`，而不是 `(a AND b) OR c`。
//!
//! 默认（宽松）模式下解析永不失败：括号不匹配或条件不是三段式时，得到一个求值恒为 false 的叶子。

use crate::error::{Result, RuleError};
use crate::models::Node;
use crate::operators::LogicalOperator;
use tracing::debug;

/// 解析模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// 格式错误降级为恒 false 的叶子
    #[default]
    Lenient,
    /// 在宽松解析的基础上额外校验，报告第一个格式错误
    Strict,
}

/// 规则解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleParser {
    mode: ParseMode,
}

impl RuleParser {
    pub fn new(mode: ParseMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// 宽松解析，永不失败
    pub fn parse(&self, text: &str) -> Node {
        parse_node(text)
    }

    /// 按当前模式解析
    ///
    /// 宽松模式总是返回 `Ok`；严格模式下括号不平衡或存在非三段式条件时返回 `ParseError`。
    pub fn parse_checked(&self, text: &str) -> Result<Node> {
        let node = parse_node(text);

        if self.mode == ParseMode::Strict {
            check_parentheses(text)?;
            check_conditions(&node)?;
        }

        Ok(node)
    }
}

/// 宽松解析的便捷入口
pub fn parse_rule(text: &str) -> Node {
    parse_node(text)
}

/// 解析任务：待切分的文本，或把栈顶两个节点组装为操作符节点
enum Task<'a> {
    Parse(&'a str),
    Join(LogicalOperator),
}

/// 用显式任务栈展开解析，右倾长链和深层括号都不会消耗线程栈
fn parse_node(text: &str) -> Node {
    let mut tasks = vec![Task::Parse(text)];
    let mut nodes: Vec<Node> = Vec::new();

    while let Some(task) = tasks.pop() {
        match task {
            Task::Parse(text) => {
                let text = strip_outer_parens(text.trim());

                match find_top_level_operator(text) {
                    Some((index, operator)) => {
                        let left = &text[..index];
                        let right = &text[index + operator.delimiter().len()..];
                        debug!(operator = %operator, left, right, "split rule text");

                        // 左侧先出栈，保证节点按先左后右压入
                        tasks.push(Task::Join(operator));
                        tasks.push(Task::Parse(right));
                        tasks.push(Task::Parse(left));
                    }
                    None => nodes.push(Node::condition(text.trim())),
                }
            }
            Task::Join(operator) => {
                let right = nodes.pop();
                let left = nodes.pop();
                nodes.push(Node::operator(operator, left, right));
            }
        }
    }

    nodes.pop().unwrap_or_else(|| Node::condition(""))
}

/// 首尾分别是 `(` 和 `)` 时去掉恰好一层，不做配对检查
fn strip_outer_parens(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('(') && text.ends_with(')') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// 查找括号深度为 0 处第一个出现的 ` AND ` / ` OR `，返回字节偏移和操作符
fn find_top_level_operator(text: &str) -> Option<(usize, LogicalOperator)> {
    let mut depth: i32 = 0;

    for (index, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 => {
                let rest = &text[index..];
                for operator in [LogicalOperator::And, LogicalOperator::Or] {
                    if rest.starts_with(operator.delimiter()) {
                        return Some((index, operator));
                    }
                }
            }
            _ => {}
        }
    }

    None
}

fn check_parentheses(text: &str) -> Result<()> {
    let mut depth: i64 = 0;
    for (index, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(RuleError::ParseError(format!(
                        "位置 {} 处存在多余的右括号",
                        index
                    )));
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(RuleError::ParseError(format!(
            "括号不匹配，缺少 {} 个右括号",
            depth
        )));
    }

    Ok(())
}

fn check_conditions(node: &Node) -> Result<()> {
    for cond in node.iter().filter_map(Node::as_condition) {
        if cond.is_malformed() {
            return Err(RuleError::ParseError(format!(
                "条件 '{}' 必须是 <字段> <比较符> <值> 三段式",
                cond.value
            )));
        }
        if cond.comparator().is_none() {
            return Err(RuleError::ParseError(format!(
                "条件 '{}' 的比较符无效",
                cond.value
            )));
        }
    }
    Ok(())
}
