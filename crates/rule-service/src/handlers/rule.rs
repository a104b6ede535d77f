//! 规则 API 处理器
//!
//! 实现规则的创建、列表、合并、删除和评估。

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rule_engine::{EvaluationContext, Rule};
use validator::Validate;

use crate::{
    dto::{CombineRulesRequest, CreateRuleRequest, EvaluateRequest, EvaluateResponse},
    error::ServiceError,
    state::AppState,
};

/// 创建规则
///
/// POST /api/rules
pub async fn create_rule(
    State(state): State<AppState>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<Json<Rule>, ServiceError> {
    req.validate()?;
    let rule_string = req.rule_string.unwrap_or_default();

    let rule = state.rule_service.create_rule(&rule_string).await?;
    Ok(Json(rule))
}

/// 获取所有规则
///
/// GET /api/rules
pub async fn list_rules(State(state): State<AppState>) -> Result<Json<Vec<Rule>>, ServiceError> {
    let rules = state.rule_service.list_rules().await?;
    Ok(Json(rules))
}

/// 合并规则
///
/// POST /api/rules/combine
pub async fn combine_rules(
    State(state): State<AppState>,
    Json(req): Json<CombineRulesRequest>,
) -> Result<Json<Rule>, ServiceError> {
    req.validate()?;

    let rule = state.rule_service.combine_rules(&req.0).await?;
    Ok(Json(rule))
}

/// 删除规则
///
/// DELETE /api/rules/rules/{id}
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.rule_service.delete_rule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 用上下文评估所有规则
///
/// POST /api/rules/evaluate
pub async fn evaluate_rules(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ServiceError> {
    let context = EvaluationContext::from_json_map(&req);
    let outcome = state.rule_service.evaluate(&context).await?;
    Ok(Json(EvaluateResponse::new(outcome.matched)))
}
