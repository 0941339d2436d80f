#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{NaiveDate, Timelike};
use chrono_tz::America::Chicago;
use rust_decimal::Decimal;
use serde_json::Value;
use snapwatch_core::errors::{ExError, ExErrorKind};
use snapwatch_core::snapshot::{
    parse_time, parse_zone, FieldDataType, FieldReader, FieldValue, SnapshotNode,
    StaticFieldTypes,
};
use std::str::FromStr;

fn field_types() -> StaticFieldTypes {
    StaticFieldTypes::new()
        .with("ent_release_date", FieldDataType::Date)
        .with("ent_entry_date", FieldDataType::Date)
        .with("ent_total_value", FieldDataType::Decimal)
        .with("ent_filed_at", FieldDataType::DateTime)
}

fn entry() -> SnapshotNode {
    SnapshotNode::new("Entry", 7)
        .with_field("ent_release_date", "2017-01-11")
        .with_field("ent_entry_date", "")
        .with_field("ent_total_value", "128.123")
        .with_field("ent_filed_at", "2017-01-11 18:30:00")
}

#[test]
fn test_date_field_coerces_to_calendar_date() {
    let types = field_types();
    let reader = FieldReader::new(&types, Chicago);

    let value = reader.field(&entry(), "ent_release_date", true).unwrap();
    assert_eq!(
        value,
        Some(FieldValue::Date(NaiveDate::from_ymd_opt(2017, 1, 11).unwrap()))
    );
}

#[test]
fn test_blank_date_is_none() {
    let types = field_types();
    let reader = FieldReader::new(&types, Chicago);
    assert_eq!(reader.field(&entry(), "ent_entry_date", true).unwrap(), None);
}

#[test]
fn test_decimal_keeps_precision() {
    let types = field_types();
    let reader = FieldReader::new(&types, Chicago);
    assert_eq!(
        reader.field(&entry(), "ent_total_value", true).unwrap(),
        Some(FieldValue::Decimal(Decimal::from_str("128.123").unwrap()))
    );
}

#[test]
fn test_uncoerced_returns_raw_value() {
    let types = field_types();
    let reader = FieldReader::new(&types, Chicago);
    assert_eq!(
        reader.field(&entry(), "ent_release_date", false).unwrap(),
        Some(FieldValue::Raw(Value::String("2017-01-11".to_string())))
    );
}

#[test]
fn test_datetime_field_lands_in_working_zone() {
    let types = field_types();
    let reader = FieldReader::new(&types, Chicago);
    match reader.field(&entry(), "ent_filed_at", true).unwrap() {
        Some(FieldValue::DateTime(at)) => {
            assert_eq!(at.timezone(), Chicago);
            assert_eq!(at.hour(), 12);
            assert_eq!(at.minute(), 30);
        }
        other => panic!("expected a datetime, got {:?}", other),
    }
}

#[test]
fn test_invalid_date_converts_to_ex_error() {
    let types = field_types();
    let reader = FieldReader::new(&types, Chicago);
    let node = SnapshotNode::new("Entry", 7).with_field("ent_release_date", "11/01/2017");

    let err: ExError = reader
        .field(&node, "ent_release_date", true)
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ExErrorKind::InvalidFieldValue);
}

#[test]
fn test_parse_time_between_named_zones() {
    let input = parse_zone("America/New_York").unwrap();
    let at = parse_time("2017-01-11 09:00", input, Chicago)
        .unwrap()
        .unwrap();
    assert_eq!(at.hour(), 8);
    assert_eq!(parse_time("  ", input, Chicago).unwrap(), None);
}

#[test]
fn test_unknown_zone_is_config_error() {
    let err: ExError = parse_zone("Mars/Olympus").unwrap_err().into();
    assert_eq!(err.kind(), ExErrorKind::Config);
}
