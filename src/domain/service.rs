//! 服务目录：服务模型与由模型派生的表单字段

use serde::{Deserialize, Serialize};

use crate::domain::attributes::{Field, MAX_NESTING_DEPTH};
use crate::domain::Envelope;
use crate::query::{Query, UsageContext};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeModel {
    pub name: String,
    /// 如 `string`、`int?`、`string[]`；末尾 `?` 表示可选
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `r` 只读，`rw` 仅创建时可写，`rw+` 始终可写
    #[serde(default = "default_modifier")]
    pub modifier: String,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
}

fn default_modifier() -> String {
    "rw+".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedEntity {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_modifier")]
    pub modifier: String,
    #[serde(default)]
    pub attributes: Vec<AttributeModel>,
    #[serde(default)]
    pub embedded_entities: Vec<EmbeddedEntity>,
    #[serde(default)]
    pub lower_limit: usize,
    #[serde(default)]
    pub upper_limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceModel {
    pub name: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeModel>,
    #[serde(default)]
    pub embedded_entities: Vec<EmbeddedEntity>,
}

/// 字段用于哪种表单
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldPurpose {
    Create,
    Edit,
}

impl FieldPurpose {
    fn accepts(self, modifier: &str) -> bool {
        match self {
            FieldPurpose::Create => modifier != "r",
            FieldPurpose::Edit => modifier == "rw+",
        }
    }
}

fn attribute_field(attribute: &AttributeModel) -> Field {
    let (type_, is_optional) = match attribute.type_.strip_suffix('?') {
        Some(inner) => (inner, true),
        None => (attribute.type_.as_str(), false),
    };
    Field::flat(attribute.name.clone(), type_, is_optional)
}

fn entity_fields(
    attributes: &[AttributeModel],
    entities: &[EmbeddedEntity],
    purpose: FieldPurpose,
    depth: usize,
) -> Vec<Field> {
    let mut fields: Vec<Field> = attributes
        .iter()
        .filter(|attribute| purpose.accepts(&attribute.modifier))
        .map(attribute_field)
        .collect();
    if depth + 1 >= MAX_NESTING_DEPTH {
        return fields;
    }
    for entity in entities.iter().filter(|e| purpose.accepts(&e.modifier)) {
        let nested = entity_fields(
            &entity.attributes,
            &entity.embedded_entities,
            purpose,
            depth + 1,
        );
        let is_optional = entity.lower_limit == 0;
        fields.push(match entity.upper_limit {
            Some(1) => Field::Nested {
                name: entity.name.clone(),
                is_optional,
                fields: nested,
            },
            max => Field::DictList {
                name: entity.name.clone(),
                is_optional,
                fields: nested,
                max,
            },
        });
    }
    fields
}

impl ServiceModel {
    /// 由服务模型派生表单字段
    pub fn fields(&self, purpose: FieldPurpose) -> Vec<Field> {
        entity_fields(&self.attributes, &self.embedded_entities, purpose, 0)
    }
}

/// 当前环境的服务目录
#[derive(Clone, Debug, Default, Serialize)]
pub struct GetServices;

impl Query for GetServices {
    const KIND: &'static str = "GetServices";
    type Data = Envelope<Vec<ServiceModel>>;
    type Usage = Vec<ServiceModel>;

    fn url(&self) -> String {
        "/lsm/v1/service_catalog?instance_summary=True".to_string()
    }

    fn to_usage(&self, data: Self::Data, _ctx: &UsageContext) -> Self::Usage {
        data.data
    }
}
