//! 规则服务响应 DTO 定义

use serde::{Deserialize, Serialize};

/// 规则集评估结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub matches: bool,
}

impl EvaluateResponse {
    pub fn new(matches: bool) -> Self {
        Self { matches }
    }
}
