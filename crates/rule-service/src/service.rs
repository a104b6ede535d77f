//! 规则应用服务
//!
//! 负责把 HTTP 层的请求翻译为规则引擎调用：解析、持久化、合并、删除与规则集评估。

use std::sync::Arc;
use std::time::Instant;

use rule_engine::{
    EvaluationContext, Node, ParseMode, Rule, RuleExecutor, RuleParser, RuleSetEvaluator,
    RuleSetOutcome, combine_or,
};
use rules_shared::observability::metrics;
use tracing::{Level, debug, info, instrument, warn};

use crate::error::{Result, ServiceError};
use crate::repository::RuleRepository;

/// 单条规则文本解析出的树允许的最大深度
///
/// 合并得到的 OR 链在此基础上最多再加深输入条数层。
pub const MAX_RULE_DEPTH: usize = 512;

/// 规则服务
pub struct RuleService {
    repository: Arc<dyn RuleRepository>,
    parser: RuleParser,
}

impl RuleService {
    pub fn new(repository: Arc<dyn RuleRepository>, mode: ParseMode) -> Self {
        Self {
            repository,
            parser: RuleParser::new(mode),
        }
    }

    /// 解析并保存规则
    #[instrument(skip(self))]
    pub async fn create_rule(&self, rule_string: &str) -> Result<Rule> {
        let root = match self.parse(rule_string) {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "规则文本被拒绝");
                metrics::record_rule_mutation("create", "rejected");
                return Err(e);
            }
        };

        let result = self.repository.create(rule_string, Some(root)).await;
        record_mutation("create", &result);

        let rule = result?;
        info!(rule_id = rule.id, "Rule created");
        Ok(rule)
    }

    /// 按当前模式解析，并拒绝深度超过 [`MAX_RULE_DEPTH`] 的树
    fn parse(&self, rule_string: &str) -> Result<Node> {
        let root = self.parser.parse_checked(rule_string)?;
        let depth = root.depth();
        if depth > MAX_RULE_DEPTH {
            return Err(ServiceError::Validation(format!(
                "规则嵌套过深: {} 层，最多 {} 层",
                depth, MAX_RULE_DEPTH
            )));
        }
        Ok(root)
    }

    /// 列出所有规则
    pub async fn list_rules(&self) -> Result<Vec<Rule>> {
        self.repository.list_all().await
    }

    /// 将多条规则文本合并为一条 OR 规则并保存
    ///
    /// 保存的规则文本是输入以 `" OR "` 连接的结果；空列表得到没有根节点的规则。
    #[instrument(skip(self), fields(count = rule_strings.len()))]
    pub async fn combine_rules(&self, rule_strings: &[String]) -> Result<Rule> {
        let mut nodes = Vec::with_capacity(rule_strings.len());
        for text in rule_strings {
            match self.parse(text) {
                Ok(node) => nodes.push(node),
                Err(e) => {
                    warn!(error = %e, rule_string = %text, "合并的规则文本被拒绝");
                    metrics::record_rule_mutation("combine", "rejected");
                    return Err(e);
                }
            }
        }

        let combined_text = rule_strings.join(" OR ");
        let root = combine_or(nodes);

        let result = self.repository.create(&combined_text, root).await;
        record_mutation("combine", &result);

        let rule = result?;
        info!(rule_id = rule.id, "Rules combined");
        Ok(rule)
    }

    /// 删除规则
    #[instrument(skip(self))]
    pub async fn delete_rule(&self, id: i64) -> Result<()> {
        match self.repository.delete(id).await {
            Ok(true) => {
                metrics::record_rule_mutation("delete", "success");
                info!(rule_id = id, "Rule deleted");
                Ok(())
            }
            Ok(false) => {
                metrics::record_rule_mutation("delete", "not_found");
                warn!(rule_id = id, "删除不存在的规则");
                Err(ServiceError::RuleNotFound(id))
            }
            Err(e) => {
                metrics::record_rule_mutation("delete", "error");
                Err(e)
            }
        }
    }

    /// 按创建顺序逐条评估所有规则，第一条命中即返回
    #[instrument(skip(self, context), fields(fields = context.len()))]
    pub async fn evaluate(&self, context: &EvaluationContext) -> Result<RuleSetOutcome> {
        let rules = self.repository.list_all().await?;

        let start = Instant::now();
        let outcome = RuleSetEvaluator::evaluate(&rules, context);
        let elapsed = start.elapsed();

        metrics::record_rule_evaluation(
            outcome.matched,
            outcome.rules_evaluated,
            elapsed.as_secs_f64(),
        );
        debug!(
            matched = outcome.matched,
            matched_rule_id = ?outcome.matched_rule_id,
            rules_evaluated = outcome.rules_evaluated,
            total_rules = rules.len(),
            "Rule set evaluated"
        );

        if tracing::enabled!(Level::DEBUG) {
            if let Some(rule) = outcome
                .matched_rule_id
                .and_then(|id| rules.iter().find(|r| r.id == id))
            {
                let traced = RuleExecutor::new().with_trace().execute(rule, context);
                debug!(
                    rule_id = traced.rule_id,
                    matched_conditions = ?traced.matched_conditions,
                    trace = ?traced.evaluation_trace,
                    "Matched rule trace"
                );
            }
        }

        Ok(outcome)
    }

    /// 存储健康检查
    pub async fn health_check(&self) -> Result<()> {
        self.repository.health_check().await
    }
}

fn record_mutation<T>(operation: &str, result: &Result<T>) {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_rule_mutation(operation, status);
}
