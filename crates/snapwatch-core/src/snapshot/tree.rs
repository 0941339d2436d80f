//! Generic capture tree
//!
//! Wire shape of a capture:
//!
//! ```json
//! {"entity": {
//!     "core_module": "Order",
//!     "record_id": 7,
//!     "model_fields": {"ord_ord_num": "PO-1"},
//!     "children": [{"entity": {"core_module": "OrderLine", "...": "..."}}]
//! }}
//! ```
//!
//! The outer `{"entity": …}` wrapper is optional. Entity shapes are
//! open-ended, so every node is the same generic struct.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::SnapshotError;
use crate::model::{EntityKind, EntityRef};

const ENTITY_KEY: &str = "entity";

/// One node of a capture tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotNode {
    pub core_module: String,
    pub record_id: Option<i64>,
    pub model_fields: BTreeMap<String, Value>,
    /// Direct children in document order
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    pub fn new(core_module: impl Into<String>, record_id: i64) -> Self {
        Self {
            core_module: core_module.into(),
            record_id: Some(record_id),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, uid: impl Into<String>, value: impl Into<Value>) -> Self {
        self.model_fields.insert(uid.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: SnapshotNode) -> Self {
        self.children.push(child);
        self
    }

    /// True for the tree produced from a blank capture (`{}`)
    pub fn is_empty(&self) -> bool {
        self.core_module.is_empty()
            && self.record_id.is_none()
            && self.model_fields.is_empty()
            && self.children.is_empty()
    }

    /// The live entity this node documents, if it names one
    pub fn entity_ref(&self) -> Option<EntityRef> {
        if self.core_module.trim().is_empty() {
            return None;
        }
        self.record_id
            .map(|id| EntityRef::new(EntityKind::parse(&self.core_module), id))
    }

    /// Parse capture bytes
    ///
    /// # Errors
    ///
    /// `MalformedPayload` if the bytes are not JSON or not a capture tree.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| SnapshotError::MalformedPayload {
                reason: e.to_string(),
            })?;
        Self::from_value(&value)
    }

    /// Build a node from a JSON value, unwrapping an optional entity wrapper
    ///
    /// # Errors
    ///
    /// `MalformedPayload` when a node is not an object or a known key has the
    /// wrong JSON type.
    pub fn from_value(value: &Value) -> Result<Self, SnapshotError> {
        let obj = as_object(value, "capture")?;
        let node = unwrap_entity(obj)?;
        parse_node(node, "entity")
    }

    /// Serialize into the wrapped wire shape
    pub fn to_value(&self) -> Value {
        let mut wrapper = Map::new();
        wrapper.insert(ENTITY_KEY.to_string(), self.node_value());
        Value::Object(wrapper)
    }

    /// # Errors
    ///
    /// Only fails if a model field holds a value serde_json cannot encode.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.to_value())
    }

    fn node_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "core_module".to_string(),
            Value::String(self.core_module.clone()),
        );
        obj.insert(
            "record_id".to_string(),
            self.record_id.map(Value::from).unwrap_or(Value::Null),
        );
        obj.insert(
            "model_fields".to_string(),
            Value::Object(
                self.model_fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        );
        obj.insert(
            "children".to_string(),
            Value::Array(self.children.iter().map(SnapshotNode::to_value).collect()),
        );
        Value::Object(obj)
    }
}

fn as_object<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>, SnapshotError> {
    value
        .as_object()
        .ok_or_else(|| SnapshotError::MalformedPayload {
            reason: format!("{} is not a JSON object", context),
        })
}

fn unwrap_entity(obj: &Map<String, Value>) -> Result<&Map<String, Value>, SnapshotError> {
    match obj.get(ENTITY_KEY) {
        Some(inner) if !obj.contains_key("core_module") => as_object(inner, ENTITY_KEY),
        _ => Ok(obj),
    }
}

fn parse_node(obj: &Map<String, Value>, path: &str) -> Result<SnapshotNode, SnapshotError> {
    let core_module = match obj.get("core_module") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(SnapshotError::MalformedPayload {
                reason: format!("{}.core_module must be a string, got {}", path, other),
            })
        }
    };

    let record_id = match obj.get("record_id") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n.as_i64().ok_or_else(|| {
            SnapshotError::MalformedPayload {
                reason: format!("{}.record_id is not an integer: {}", path, n),
            }
        })?),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().parse::<i64>().map_err(|_| {
            SnapshotError::MalformedPayload {
                reason: format!("{}.record_id is not an integer: {}", path, s),
            }
        })?),
        Some(other) => {
            return Err(SnapshotError::MalformedPayload {
                reason: format!("{}.record_id must be an integer, got {}", path, other),
            })
        }
    };

    let model_fields = match obj.get("model_fields") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Some(_) => {
            return Err(SnapshotError::MalformedPayload {
                reason: format!("{}.model_fields must be an object", path),
            })
        }
    };

    let children = match obj.get("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let child_path = format!("{}.children[{}]", path, i);
                let child = as_object(item, &child_path)?;
                parse_node(unwrap_entity(child)?, &child_path)
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(SnapshotError::MalformedPayload {
                reason: format!("{}.children must be an array", path),
            })
        }
    };

    Ok(SnapshotNode {
        core_module,
        record_id,
        model_fields,
        children,
    })
}
