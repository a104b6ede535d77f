//! 规则服务请求 DTO 定义

use serde::Deserialize;
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors};

/// 单条规则文本的最大字符数
pub const MAX_RULE_LENGTH: usize = 4096;

/// 单次合并的最大规则条数
pub const MAX_COMBINE_RULES: usize = 100;

/// 创建规则请求
///
/// 空文本合法，按格式错误的叶子保存；只有缺少 `ruleString` 或为 null 时拒绝。
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    #[validate(
        required(message = "ruleString 不能为空"),
        length(max = 4096, message = "规则文本不能超过 4096 个字符")
    )]
    pub rule_string: Option<String>,
}

/// 合并规则请求：规则文本数组
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct CombineRulesRequest(pub Vec<String>);

impl Validate for CombineRulesRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.0.len() > MAX_COMBINE_RULES {
            let mut err = ValidationError::new("length");
            err.message = Some(format!("一次最多合并 {} 条规则", MAX_COMBINE_RULES).into());
            errors.add("ruleStrings", err);
        }

        if self
            .0
            .iter()
            .any(|text| text.chars().count() > MAX_RULE_LENGTH)
        {
            let mut err = ValidationError::new("length");
            err.message = Some(format!("规则文本不能超过 {} 个字符", MAX_RULE_LENGTH).into());
            errors.add("ruleStrings", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// 评估请求：字段名到取值的映射
pub type EvaluateRequest = Map<String, Value>;
