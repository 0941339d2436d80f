//! Model field access and coercion
//!
//! Capture trees store field values as JSON primitives. Consumers read them
//! back as the field's declared data type, looked up by model field uid.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

use super::time::parse_time;
use super::tree::SnapshotNode;
use crate::errors::SnapshotError;

/// Declared data type of a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldDataType {
    Date,
    DateTime,
    Decimal,
    Boolean,
    Integer,
    String,
    Unknown,
}

impl FieldDataType {
    fn label(&self) -> &'static str {
        match self {
            FieldDataType::Date => "date",
            FieldDataType::DateTime => "datetime",
            FieldDataType::Decimal => "decimal",
            FieldDataType::Boolean => "boolean",
            FieldDataType::Integer => "integer",
            FieldDataType::String => "string",
            FieldDataType::Unknown => "unknown",
        }
    }
}

/// Source of declared field types (the platform's model field registry)
pub trait FieldTypeRegistry: Send + Sync {
    fn data_type_of(&self, model_field_uid: &str) -> FieldDataType;
}

/// Field type registry backed by a fixed map; unlisted uids are `Unknown`
#[derive(Debug, Clone, Default)]
pub struct StaticFieldTypes {
    types: HashMap<String, FieldDataType>,
}

impl StaticFieldTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uid: impl Into<String>, data_type: FieldDataType) -> Self {
        self.types.insert(uid.into(), data_type);
        self
    }
}

impl FieldTypeRegistry for StaticFieldTypes {
    fn data_type_of(&self, model_field_uid: &str) -> FieldDataType {
        self.types
            .get(model_field_uid)
            .copied()
            .unwrap_or(FieldDataType::Unknown)
    }
}

/// A field value read from a capture
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Date(NaiveDate),
    /// Expressed in the reader's working time zone
    DateTime(DateTime<Tz>),
    Decimal(Decimal),
    Boolean(bool),
    Integer(i64),
    String(String),
    /// Uncoerced JSON, returned when coercion is off or the declared type is
    /// a pass-through type and the JSON value has some other shape
    Raw(Value),
}

/// Reads model fields with the declared-type coercion rules
pub struct FieldReader<'a> {
    types: &'a dyn FieldTypeRegistry,
    working_zone: Tz,
}

impl<'a> FieldReader<'a> {
    pub fn new(types: &'a dyn FieldTypeRegistry, working_zone: Tz) -> Self {
        Self {
            types,
            working_zone,
        }
    }

    pub fn working_zone(&self) -> Tz {
        self.working_zone
    }

    /// Read `model_field_uid` from `node`
    ///
    /// Returns `None` if the field is absent. With `coerce = false` the raw
    /// JSON value is returned as `FieldValue::Raw`. Otherwise:
    ///
    /// - `date`: calendar date; blank or null → `None`
    /// - `datetime`: instant in the working time zone (naive strings are
    ///   UTC); blank or null → `None`
    /// - `decimal`: arbitrary-precision decimal; blank or null → `None`
    /// - `boolean`, `integer`, `string`, unknown: passed through
    ///
    /// # Errors
    ///
    /// `InvalidFieldValue` / `InvalidTimestamp` if a date, datetime or
    /// decimal field holds an unparseable value.
    pub fn field(
        &self,
        node: &SnapshotNode,
        model_field_uid: &str,
        coerce: bool,
    ) -> Result<Option<FieldValue>, SnapshotError> {
        let Some(raw) = node.model_fields.get(model_field_uid) else {
            return Ok(None);
        };
        if !coerce {
            return Ok(Some(FieldValue::Raw(raw.clone())));
        }

        let data_type = self.types.data_type_of(model_field_uid);
        match data_type {
            FieldDataType::Date => {
                let Some(text) = non_blank_text(raw) else {
                    return Ok(None);
                };
                parse_date(&text)
                    .map(|d| Some(FieldValue::Date(d)))
                    .ok_or_else(|| invalid(model_field_uid, data_type, raw))
            }
            FieldDataType::DateTime => {
                let Some(text) = non_blank_text(raw) else {
                    return Ok(None);
                };
                Ok(parse_time(&text, chrono_tz::UTC, self.working_zone)?.map(FieldValue::DateTime))
            }
            FieldDataType::Decimal => {
                let Some(text) = non_blank_text(raw) else {
                    return Ok(None);
                };
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map(|d| Some(FieldValue::Decimal(d)))
                    .map_err(|_| invalid(model_field_uid, data_type, raw))
            }
            FieldDataType::Boolean
            | FieldDataType::Integer
            | FieldDataType::String
            | FieldDataType::Unknown => Ok(pass_through(raw)),
        }
    }

    /// Shorthand for `field(node, uid, true)`
    ///
    /// # Errors
    ///
    /// As for [`FieldReader::field`].
    pub fn value(
        &self,
        node: &SnapshotNode,
        model_field_uid: &str,
    ) -> Result<Option<FieldValue>, SnapshotError> {
        self.field(node, model_field_uid, true)
    }
}

fn pass_through(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Null => None,
        Value::Bool(b) => Some(FieldValue::Boolean(*b)),
        Value::Number(n) if n.is_i64() => n.as_i64().map(FieldValue::Integer),
        Value::String(s) => Some(FieldValue::String(s.clone())),
        other => Some(FieldValue::Raw(other.clone())),
    }
}

/// JSON strings and numbers as trimmed text; null and blank strings are `None`
fn non_blank_text(raw: &Value) -> Option<String> {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().or_else(|| {
        // timestamps stored in a date field keep only their calendar part
        text.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    })
}

fn invalid(uid: &str, data_type: FieldDataType, raw: &Value) -> SnapshotError {
    SnapshotError::InvalidFieldValue {
        uid: uid.to_string(),
        expected: data_type.label().to_string(),
        value: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::New_York;
    use serde_json::json;

    fn types() -> StaticFieldTypes {
        StaticFieldTypes::new()
            .with("ent_release_date", FieldDataType::Date)
            .with("ent_arrival_at", FieldDataType::DateTime)
            .with("ent_total_duty", FieldDataType::Decimal)
            .with("ent_paid", FieldDataType::Boolean)
            .with("ent_line_count", FieldDataType::Integer)
            .with("ent_brok_ref", FieldDataType::String)
    }

    fn entry() -> SnapshotNode {
        SnapshotNode::new("Entry", 1)
            .with_field("ent_release_date", "2017-01-11")
            .with_field("ent_arrival_at", "2017-01-11 15:00:00")
            .with_field("ent_total_duty", "128.123")
            .with_field("ent_paid", true)
            .with_field("ent_line_count", 4)
            .with_field("ent_brok_ref", "B-1")
            .with_field("ent_blank_date", "")
            .with_field("ent_custom", json!({"a": 1}))
    }

    #[test]
    fn test_absent_field_is_none() {
        let types = types();
        let reader = FieldReader::new(&types, New_York);
        assert_eq!(reader.value(&entry(), "ent_missing").unwrap(), None);
    }

    #[test]
    fn test_datetime_converted_to_working_zone() {
        let types = types();
        let reader = FieldReader::new(&types, New_York);
        match reader.value(&entry(), "ent_arrival_at").unwrap() {
            Some(FieldValue::DateTime(t)) => {
                assert_eq!(t.hour(), 10);
                assert_eq!(t.timezone(), New_York);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pass_through_types() {
        let types = types();
        let reader = FieldReader::new(&types, New_York);
        let node = entry();
        assert_eq!(
            reader.value(&node, "ent_paid").unwrap(),
            Some(FieldValue::Boolean(true))
        );
        assert_eq!(
            reader.value(&node, "ent_line_count").unwrap(),
            Some(FieldValue::Integer(4))
        );
        assert_eq!(
            reader.value(&node, "ent_brok_ref").unwrap(),
            Some(FieldValue::String("B-1".to_string()))
        );
        assert_eq!(
            reader.value(&node, "ent_custom").unwrap(),
            Some(FieldValue::Raw(json!({"a": 1})))
        );
    }

    #[test]
    fn test_bad_decimal_is_error() {
        let types = types();
        let reader = FieldReader::new(&types, New_York);
        let node = SnapshotNode::new("Entry", 1).with_field("ent_total_duty", "12,50");
        let err = reader.value(&node, "ent_total_duty").unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_numeric_decimal_is_coerced() {
        let types = types();
        let reader = FieldReader::new(&types, New_York);
        let node = SnapshotNode::new("Entry", 1).with_field("ent_total_duty", 12.5);
        assert_eq!(
            reader.value(&node, "ent_total_duty").unwrap(),
            Some(FieldValue::Decimal(Decimal::new(125, 1)))
        );
    }
}
