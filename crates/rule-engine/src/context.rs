//! 评估上下文
//!
//! 上下文只在求值时传入，求值过程不会把其中的值写回规则树。

use serde_json::{Map, Value};
use std::collections::HashMap;

/// 上下文中的标量值
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// 从 JSON 值转换，非标量（bool/null/数组/对象）返回 None
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Integer(i)),
                None => n.as_f64().map(Self::Float),
            },
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// 规则可引用的字段
///
/// 字段名大小写不敏感；每个字段有固定的取值类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownField {
    Age,
    Salary,
    Department,
    Experience,
}

impl KnownField {
    pub fn resolve(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "age" => Some(Self::Age),
            "salary" => Some(Self::Salary),
            "department" => Some(Self::Department),
            "experience" => Some(Self::Experience),
            _ => None,
        }
    }

    /// 上下文中的键名
    pub fn key(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Salary => "salary",
            Self::Department => "department",
            Self::Experience => "experience",
        }
    }

    /// 按字段类型转换上下文值，类型不符视为缺失
    fn coerce(&self, value: &FieldValue) -> Option<FieldValue> {
        match (self, value) {
            (Self::Age | Self::Experience, FieldValue::Integer(i)) => Some(FieldValue::Integer(*i)),
            (Self::Salary, FieldValue::Integer(i)) => Some(FieldValue::Float(*i as f64)),
            (Self::Salary, FieldValue::Float(f)) => Some(FieldValue::Float(*f)),
            (Self::Department, FieldValue::Text(s)) => Some(FieldValue::Text(s.clone())),
            _ => None,
        }
    }
}

/// 评估上下文 - 字段名到标量值的映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationContext {
    values: HashMap<String, FieldValue>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    /// 从 JSON 对象构建，非标量值被忽略；非对象输入得到空上下文
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_json_map(map),
            _ => Self::default(),
        }
    }

    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let values = map
            .iter()
            .filter_map(|(k, v)| FieldValue::from_json(v).map(|fv| (k.clone(), fv)))
            .collect();
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// 解析规则中的字段名并取出按字段类型转换后的值
    ///
    /// 未知字段、上下文缺失或类型不符时返回 None。
    pub fn resolve(&self, field: &str) -> Option<FieldValue> {
        let known = KnownField::resolve(field)?;
        self.values.get(known.key()).and_then(|v| known.coerce(v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
