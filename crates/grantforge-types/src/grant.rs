//! Grant submission documents as sent to the off-chain validator. Field maps
//! are ordered JSON objects; authored order is part of the document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Address;

/// Input widget class of an application field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "short-form")]
    ShortForm,
    #[serde(rename = "long-form")]
    LongForm,
    #[serde(rename = "numeric")]
    Numeric,
    #[serde(rename = "array")]
    Array,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantField {
    pub title: String,
    pub input_type: FieldKind,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pii: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Ordered application-field map, keyed by field id. Requires `serde_json`
/// `preserve_order` so documents round-trip in authored order.
pub type FieldMap = serde_json::Map<String, Value>;

/// Insert a field at the end of the map, preserving authored order.
pub fn insert_field(fields: &mut FieldMap, id: &str, field: GrantField) {
    let value = serde_json::to_value(field).expect("field serialization cannot fail");
    fields.insert(id.to_string(), value);
}

/// Key for the nth custom field; spaces in the title are escaped so the id
/// stays a single token.
pub fn custom_field_key(index: usize, title: &str) -> String {
    format!("customField{index}-{}", title.replace(' ', "\\s"))
}

/// Key for the nth preset milestone, same escaping as custom fields.
pub fn default_milestone_key(index: usize, title: &str) -> String {
    format!("defaultMilestone{index}-{}", title.replace(' ', "\\s"))
}

const PII_FIELD_IDS: [&str; 2] = ["applicantEmail", "memberDetails"];

/// Flag the personally-identifying fields when applicant encryption is on.
/// Fields not present in the map are left alone.
pub fn mark_pii_fields(fields: &mut FieldMap) {
    for id in PII_FIELD_IDS {
        if let Some(Value::Object(obj)) = fields.get_mut(id) {
            obj.insert("pii".to_string(), Value::Bool(true));
        }
    }
}

/// Committed reward for a grant, in base units of the asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub committed: String,
    pub asset: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricCriterion {
    pub title: String,
    pub details: String,
    pub maximum_points: u8,
}

/// Review rubric. On the wire the criteria object is itself named `rubric`,
/// keyed by stringified index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Rubric {
    pub is_private: bool,
    #[serde(rename = "rubric")]
    pub criteria: serde_json::Map<String, Value>,
}

impl Rubric {
    pub fn push_criterion(&mut self, criterion: RubricCriterion) {
        let index = self.criteria.len().to_string();
        let value = serde_json::to_value(criterion).expect("criterion serialization cannot fail");
        self.criteria.insert(index, value);
    }
}

/// The grant document validated off-chain before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPayload {
    pub title: String,
    pub summary: String,
    /// Serialized rich-text body.
    pub details: String,
    pub deadline: String,
    pub reward: Reward,
    pub fields: FieldMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grant_managers: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric: Option<Rubric>,
}
