//! 实例属性：按字段定义做类型矫正、嵌套清洗与差异计算
//!
//! 三条规则贯穿全文：
//! - 不存在的 key 保持不存在，显式 null 保持 null（两者含义不同）；
//! - 可选字段的空串视为 null；
//! - 嵌套递归深度不超过 [`MAX_NESTING_DEPTH`]，更深的值原样保留。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// 嵌套实体允许的最大递归深度
pub const MAX_NESTING_DEPTH: usize = 10;

pub type Attributes = Map<String, Value>;

/// 表单字段定义（由服务模型派生）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Field {
    /// 标量或标量列表，type_ 如 `string`、`int`、`bool`、`dict`、`string[]`
    Flat {
        name: String,
        #[serde(rename = "type")]
        type_: String,
        is_optional: bool,
    },
    /// 单个嵌套实体
    Nested {
        name: String,
        is_optional: bool,
        fields: Vec<Field>,
    },
    /// 嵌套实体列表；max 为列表上限
    DictList {
        name: String,
        is_optional: bool,
        fields: Vec<Field>,
        max: Option<usize>,
    },
}

impl Field {
    pub fn flat(name: impl Into<String>, type_: impl Into<String>, is_optional: bool) -> Self {
        Field::Flat {
            name: name.into(),
            type_: type_.into(),
            is_optional,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Field::Flat { name, .. } | Field::Nested { name, .. } | Field::DictList { name, .. } => {
                name
            }
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            Field::Flat { is_optional, .. }
            | Field::Nested { is_optional, .. }
            | Field::DictList { is_optional, .. } => *is_optional,
        }
    }
}

/// 按声明类型矫正单个值；无法解析的输入原样返回
pub fn ensure_attribute_type(value: &Value, type_: &str, is_optional: bool) -> Value {
    match value {
        Value::Null => return Value::Null,
        Value::String(s) if s.is_empty() && is_optional => return Value::Null,
        _ => {}
    }

    if let Some(element_type) = type_.strip_suffix("[]") {
        return match value {
            Value::String(s) => Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| coerce_scalar(&Value::String(part.to_string()), element_type))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| coerce_scalar(item, element_type))
                    .collect(),
            ),
            other => other.clone(),
        };
    }

    coerce_scalar(value, type_)
}

fn coerce_scalar(value: &Value, type_: &str) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    let text = text.trim();
    let coerced = match type_ {
        "int" => text.parse::<i64>().ok().map(Value::from),
        "float" => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        "bool" => match text.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        "dict" => serde_json::from_str::<Value>(text)
            .ok()
            .filter(Value::is_object),
        _ => None,
    };
    coerced.unwrap_or_else(|| value.clone())
}

/// 按字段定义清洗属性；不在定义里的 key 原样保留
pub fn sanitize_attributes(fields: &[Field], attributes: &Attributes) -> Attributes {
    sanitize_at(fields, attributes, 0)
}

fn sanitize_at(fields: &[Field], attributes: &Attributes, depth: usize) -> Attributes {
    let mut sanitized = attributes.clone();
    for field in fields {
        let Some(value) = attributes.get(field.name()) else {
            continue;
        };
        let value = match field {
            Field::Flat {
                type_, is_optional, ..
            } => ensure_attribute_type(value, type_, *is_optional),
            Field::Nested {
                fields, is_optional, ..
            } => sanitize_nested(fields, value, *is_optional, depth),
            Field::DictList {
                fields,
                is_optional,
                max,
                ..
            } => sanitize_dict_list(fields, value, *is_optional, *max, depth),
        };
        sanitized.insert(field.name().to_string(), value);
    }
    sanitized
}

fn sanitize_nested(fields: &[Field], value: &Value, is_optional: bool, depth: usize) -> Value {
    match value {
        Value::String(s) if s.is_empty() && is_optional => Value::Null,
        Value::Object(inner) if depth + 1 < MAX_NESTING_DEPTH => {
            Value::Object(sanitize_at(fields, inner, depth + 1))
        }
        other => other.clone(),
    }
}

fn sanitize_dict_list(
    fields: &[Field],
    value: &Value,
    is_optional: bool,
    max: Option<usize>,
    depth: usize,
) -> Value {
    match value {
        Value::String(s) if s.is_empty() && is_optional => Value::Null,
        Value::Array(items) => {
            let limit = max.unwrap_or(items.len());
            Value::Array(
                items
                    .iter()
                    .take(limit)
                    .map(|item| match item {
                        Value::Object(inner) if depth + 1 < MAX_NESTING_DEPTH => {
                            Value::Object(sanitize_at(fields, inner, depth + 1))
                        }
                        other => other.clone(),
                    })
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

/// 创建实例时的属性：清洗后去掉所有 null（可选属性在创建时省略）
pub fn create_instance_attributes(fields: &[Field], attributes: &Attributes) -> Attributes {
    let mut sanitized = sanitize_attributes(fields, attributes);
    sanitized.retain(|_, value| !value.is_null());
    sanitized
}

/// 更新实例时的属性差异：只保留 updated 中与 current 不同的 key
///
/// current 中不存在而 updated 显式为 null 的 key 会被保留（不存在 ≠ null）。
pub fn attribute_diff(fields: &[Field], current: &Attributes, updated: &Attributes) -> Attributes {
    let current = sanitize_attributes(fields, current);
    sanitize_attributes(fields, updated)
        .into_iter()
        .filter(|(key, value)| current.get(key) != Some(value))
        .collect()
}
