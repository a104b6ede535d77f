//! 规则存储管理
//!
//! 内存中的规则存储，按 ID 递增（即创建顺序）保存规则。规则树由规则独占持有，
//! 删除规则时整棵树随之释放。

use crate::error::{Result, RuleError};
use crate::models::{Node, Rule};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{info, instrument, warn};

/// 规则存储
#[derive(Clone)]
pub struct RuleStore {
    rules: Arc<RwLock<BTreeMap<i64, Rule>>>,
    next_id: Arc<AtomicI64>,
}

impl RuleStore {
    /// 创建新的规则存储
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// 获取当前存储的规则数量
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// 保存规则并分配 ID
    #[instrument(skip(self, root_node), fields(rule_string = %rule_string))]
    pub fn create(&self, rule_string: &str, root_node: Option<Node>) -> Rule {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let rule = Rule::new(id, rule_string, root_node);

        self.rules.write().insert(id, rule.clone());

        info!("规则已保存: {}", id);
        rule
    }

    /// 删除规则
    #[instrument(skip(self))]
    pub fn delete(&self, rule_id: i64) -> Result<()> {
        if self.rules.write().remove(&rule_id).is_some() {
            info!("规则已删除: {}", rule_id);
            Ok(())
        } else {
            warn!("删除不存在的规则: {}", rule_id);
            Err(RuleError::RuleNotFound(rule_id))
        }
    }

    /// 检查规则是否存在
    pub fn exists(&self, rule_id: i64) -> bool {
        self.rules.read().contains_key(&rule_id)
    }

    /// 获取所有规则，按创建顺序
    pub fn list_all(&self) -> Vec<Rule> {
        self.rules.read().values().cloned().collect()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_rule;

    fn create(store: &RuleStore, text: &str) -> Rule {
        store.create(text, Some(parse_rule(text)))
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        let store = RuleStore::new();
        let first = create(&store, "age > 30");
        let second = create(&store, "salary > 10");

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_list_all_in_creation_order() {
        let store = RuleStore::new();
        for text in ["age > 1", "age > 2", "age > 3"] {
            create(&store, text);
        }

        let texts: Vec<String> = store.list_all().into_iter().map(|r| r.rule_string).collect();
        assert_eq!(texts, vec!["age > 1", "age > 2", "age > 3"]);
    }

    #[test]
    fn test_create_keeps_tree() {
        let store = RuleStore::new();
        let rule = create(&store, "age > 30 AND salary > 10");

        assert_eq!(store.list_all(), vec![rule.clone()]);
        assert!(store.exists(rule.id));
        assert!(!store.exists(99));
    }

    #[test]
    fn test_delete_rule() {
        let store = RuleStore::new();
        let rule = create(&store, "age > 30");

        store.delete(rule.id).unwrap();

        assert!(!store.exists(rule.id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_nonexistent_rule() {
        let store = RuleStore::new();
        create(&store, "age > 30");

        let result = store.delete(42);
        assert!(matches!(result, Err(RuleError::RuleNotFound(42))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let store = RuleStore::new();
        let first = create(&store, "age > 30");
        store.delete(first.id).unwrap();

        let second = create(&store, "age > 40");
        assert_eq!(second.id, 2);
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let store = RuleStore::new();
        let store_clone = store.clone();

        let handle = thread::spawn(move || {
            for i in 0..100 {
                create(&store_clone, &format!("age > {}", i));
            }
        });

        for i in 100..200 {
            create(&store, &format!("age > {}", i));
        }

        handle.join().unwrap();

        assert_eq!(store.len(), 200);
    }
}
