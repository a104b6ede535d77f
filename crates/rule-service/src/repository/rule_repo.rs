//! 规则仓储（PostgreSQL）
//!
//! 规则存放在 `rules` 表，规则树的每个节点是 `nodes` 表中的一行，
//! 通过 `left_id`/`right_id` 指向子节点、`parent_id` 指向父节点。

use async_trait::async_trait;
use rule_engine::{ConditionNode, LogicalOperator, Node, Rule};
use rules_shared::database::Database;
use sqlx::{PgConnection, Row};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

use super::traits::RuleRepository;
use crate::error::{Result, ServiceError};

const NODE_TYPE_CONDITION: &str = "condition";
const NODE_TYPE_OPERATOR: &str = "operator";

/// 加载所有规则的节点树
const LOAD_TREES_SQL: &str = r#"
    WITH RECURSIVE tree AS (
        SELECT n.id, n.type, n.value, n.operator, n.field, n.comparison,
               n.target_value, n.left_id, n.right_id
        FROM rules r
        JOIN nodes n ON n.id = r.root_node_id
        UNION
        SELECT c.id, c.type, c.value, c.operator, c.field, c.comparison,
               c.target_value, c.left_id, c.right_id
        FROM nodes c
        JOIN tree t ON c.id = t.left_id OR c.id = t.right_id
    )
    SELECT id, type, value, operator, field, comparison, target_value, left_id, right_id
    FROM tree
"#;

/// 删除以 $1 为根的整棵子树
const DELETE_SUBTREE_SQL: &str = r#"
    WITH RECURSIVE subtree AS (
        SELECT id, left_id, right_id FROM nodes WHERE id = $1
        UNION
        SELECT n.id, n.left_id, n.right_id
        FROM nodes n
        JOIN subtree s ON n.id = s.left_id OR n.id = s.right_id
    )
    DELETE FROM nodes WHERE id IN (SELECT id FROM subtree)
"#;

/// 节点表的一行
#[derive(Debug, Clone, sqlx::FromRow)]
struct NodeRow {
    id: i64,
    #[sqlx(rename = "type")]
    node_type: String,
    value: Option<String>,
    operator: Option<String>,
    field: Option<String>,
    comparison: Option<String>,
    target_value: Option<String>,
    left_id: Option<i64>,
    right_id: Option<i64>,
}

/// 规则表的一行
#[derive(Debug, Clone, sqlx::FromRow)]
struct RuleRow {
    id: i64,
    rule_string: String,
    root_node_id: Option<i64>,
}

/// 先序展开后的节点，子节点以下标引用
struct FlatNode<'a> {
    node: &'a Node,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

/// 先序展开整棵树，子节点记录为下标
fn flatten(root: &Node) -> Vec<FlatNode<'_>> {
    let mut out: Vec<FlatNode<'_>> = Vec::new();
    let mut stack: Vec<(&Node, Option<usize>, bool)> = vec![(root, None, true)];

    while let Some((node, parent, is_left)) = stack.pop() {
        let index = out.len();
        if let Some(p) = parent {
            if is_left {
                out[p].left = Some(index);
            } else {
                out[p].right = Some(index);
            }
        }
        out.push(FlatNode {
            node,
            parent,
            left: None,
            right: None,
        });

        if let Node::Operator(op) = node {
            if let Some(right) = op.right() {
                stack.push((right, Some(index), false));
            }
            if let Some(left) = op.left() {
                stack.push((left, Some(index), true));
            }
        }
    }

    out
}

/// PostgreSQL 规则仓储
pub struct PgRuleRepository {
    db: Database,
}

impl PgRuleRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 在事务中写入整棵树，返回根节点 ID
    ///
    /// 先按先序插入（此时父节点已有 ID），再回填操作符节点的左右子节点 ID。
    async fn insert_tree_in_tx(tx: &mut PgConnection, root: &Node) -> Result<i64> {
        let flat = flatten(root);

        let mut ids: Vec<i64> = Vec::with_capacity(flat.len());
        for item in &flat {
            let parent_id = item.parent.map(|p| ids[p]);
            let row = match item.node {
                Node::Condition(cond) => {
                    sqlx::query(
                        r#"
                        INSERT INTO nodes (type, value, field, comparison, target_value, parent_id)
                        VALUES ($1, $2, $3, $4, $5, $6)
                        RETURNING id
                        "#,
                    )
                    .bind(NODE_TYPE_CONDITION)
                    .bind(&cond.value)
                    .bind(&cond.field)
                    .bind(&cond.comparison)
                    .bind(&cond.target_value)
                    .bind(parent_id)
                    .fetch_one(&mut *tx)
                    .await?
                }
                Node::Operator(op) => {
                    sqlx::query(
                        r#"
                        INSERT INTO nodes (type, operator, parent_id)
                        VALUES ($1, $2, $3)
                        RETURNING id
                        "#,
                    )
                    .bind(NODE_TYPE_OPERATOR)
                    .bind(op.operator.as_str())
                    .bind(parent_id)
                    .fetch_one(&mut *tx)
                    .await?
                }
            };
            ids.push(row.get("id"));
        }

        for (index, item) in flat.iter().enumerate() {
            if item.left.is_none() && item.right.is_none() {
                continue;
            }
            sqlx::query("UPDATE nodes SET left_id = $1, right_id = $2 WHERE id = $3")
                .bind(item.left.map(|i| ids[i]))
                .bind(item.right.map(|i| ids[i]))
                .bind(ids[index])
                .execute(&mut *tx)
                .await?;
        }

        debug!(root_id = ids[0], nodes = ids.len(), "Rule tree inserted");
        Ok(ids[0])
    }

    /// 由节点行重建树
    ///
    /// 缺失的子节点视为空；出现环时返回 `CorruptData`。
    fn build_node(
        id: i64,
        rows: &HashMap<i64, NodeRow>,
        visiting: &mut HashSet<i64>,
    ) -> Result<Option<Node>> {
        let Some(row) = rows.get(&id) else {
            warn!(node_id = id, "节点不存在，按空子节点处理");
            return Ok(None);
        };

        if !visiting.insert(id) {
            return Err(ServiceError::CorruptData(format!(
                "节点 {} 在规则树中出现环",
                id
            )));
        }

        let node = match row.node_type.as_str() {
            NODE_TYPE_CONDITION => Node::Condition(ConditionNode {
                value: row.value.clone().unwrap_or_default(),
                field: row.field.clone(),
                comparison: row.comparison.clone(),
                target_value: row.target_value.clone(),
            }),
            NODE_TYPE_OPERATOR => {
                match row.operator.as_deref().and_then(LogicalOperator::parse) {
                    Some(operator) => {
                        let left = match row.left_id {
                            Some(child) => Self::build_node(child, rows, visiting)?,
                            None => None,
                        };
                        let right = match row.right_id {
                            Some(child) => Self::build_node(child, rows, visiting)?,
                            None => None,
                        };
                        Node::operator(operator, left, right)
                    }
                    None => {
                        warn!(
                            node_id = id,
                            operator = ?row.operator,
                            "未知的逻辑操作符，按格式错误的条件处理"
                        );
                        Self::malformed_leaf(row)
                    }
                }
            }
            other => {
                warn!(node_id = id, node_type = other, "未知的节点类型，按格式错误的条件处理");
                Self::malformed_leaf(row)
            }
        };

        visiting.remove(&id);
        Ok(Some(node))
    }

    /// 求值恒为 false 的叶子
    fn malformed_leaf(row: &NodeRow) -> Node {
        Node::Condition(ConditionNode {
            value: row
                .value
                .clone()
                .or_else(|| row.operator.clone())
                .unwrap_or_default(),
            field: None,
            comparison: None,
            target_value: None,
        })
    }
}

#[async_trait]
impl RuleRepository for PgRuleRepository {
    #[instrument(skip(self, root_node))]
    async fn create(&self, rule_string: &str, root_node: Option<Node>) -> Result<Rule> {
        let mut tx = self.db.pool().begin().await?;

        let root_id = match &root_node {
            Some(root) => Some(Self::insert_tree_in_tx(&mut tx, root).await?),
            None => None,
        };

        let row = sqlx::query(
            r#"
            INSERT INTO rules (rule_string, root_node_id)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(rule_string)
        .bind(root_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let id: i64 = row.get("id");
        info!(rule_id = id, "Rule persisted");

        Ok(Rule::new(id, rule_string, root_node))
    }

    async fn list_all(&self) -> Result<Vec<Rule>> {
        let rules = sqlx::query_as::<_, RuleRow>(
            "SELECT id, rule_string, root_node_id FROM rules ORDER BY id ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        let nodes: HashMap<i64, NodeRow> = sqlx::query_as::<_, NodeRow>(LOAD_TREES_SQL)
            .fetch_all(self.db.pool())
            .await?
            .into_iter()
            .map(|row| (row.id, row))
            .collect();

        rules
            .into_iter()
            .map(|row| {
                let root = match row.root_node_id {
                    Some(root_id) => Self::build_node(root_id, &nodes, &mut HashSet::new())?,
                    None => None,
                };
                Ok(Rule::new(row.id, row.rule_string, root))
            })
            .collect()
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM rules WHERE id = $1)")
            .bind(id)
            .fetch_one(self.db.pool())
            .await?;

        Ok(exists.0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let row: Option<(Option<i64>,)> =
            sqlx::query_as("DELETE FROM rules WHERE id = $1 RETURNING root_node_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((root_id,)) = row else {
            return Ok(false);
        };

        if let Some(root_id) = root_id {
            let deleted = sqlx::query(DELETE_SUBTREE_SQL)
                .bind(root_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            debug!(rule_id = id, nodes = deleted, "Rule tree deleted");
        }

        tx.commit().await?;
        info!(rule_id = id, "Rule deleted");

        Ok(true)
    }

    async fn health_check(&self) -> Result<()> {
        self.db.health_check().await?;
        Ok(())
    }
}
