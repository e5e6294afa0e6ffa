//! Tests for Item and AttributeValue
//!
//! These tests verify:
//! - JSON numbers become integers or exact decimals
//! - Decimals are written back out as strings
//! - Identifier rules for stored items and client-supplied ids

use corpkv::model::{key_from_json, AttributeValue, Item, ID_FIELD};
use corpkv::CorpError;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

// =============================================================================
// Conversion Tests
// =============================================================================

#[test]
fn test_integer_stays_integer() {
    let value = AttributeValue::from_json(&json!(42)).unwrap();
    assert_eq!(value, AttributeValue::Integer(42));
    assert_eq!(value.to_json(), json!(42));
}

#[test]
fn test_float_becomes_exact_decimal() {
    let value = AttributeValue::from_json(&json!(3.14)).unwrap();
    assert_eq!(value, AttributeValue::Decimal(Decimal::from_str("3.14").unwrap()));
    assert_eq!(value.to_json(), json!("3.14"));
}

#[test]
fn test_large_unsigned_becomes_decimal() {
    let value = AttributeValue::from_json(&json!(u64::MAX)).unwrap();
    assert_eq!(value.to_json(), json!(u64::MAX.to_string()));
}

#[test]
fn test_out_of_range_number_rejected() {
    let value: serde_json::Value = serde_json::from_str("1e300").unwrap();
    let result = AttributeValue::from_json(&value);
    assert!(matches!(result, Err(CorpError::InvalidItem(_))));
}

#[test]
fn test_high_precision_numbers_kept_exact() {
    let value: serde_json::Value =
        serde_json::from_str(r#"{"id":"P1","amount":12345678901234567890.123,"rate":0.1000000000000000055}"#)
            .unwrap();
    let item = Item::from_json(&value).unwrap();

    assert_eq!(
        item.get("amount").unwrap().to_json(),
        json!("12345678901234567890.123")
    );
    assert_eq!(
        item.get("rate").unwrap().to_json(),
        json!("0.1000000000000000055")
    );
}

#[test]
fn test_too_many_digits_rejected() {
    // 30 significant digits, more than a decimal holds
    let value: serde_json::Value =
        serde_json::from_str("1.23456789012345678901234567890").unwrap();
    let result = AttributeValue::from_json(&value);
    assert!(matches!(result, Err(CorpError::InvalidItem(_))));
}

#[test]
fn test_nested_values_converted() {
    let item = Item::from_json(&json!({
        "id": "A1",
        "tags": ["x", 1, 2.5],
        "meta": {"price": 9.99, "active": true, "note": null}
    }))
    .unwrap();

    assert_eq!(
        item.to_json(),
        json!({
            "id": "A1",
            "tags": ["x", 1, "2.5"],
            "meta": {"price": "9.99", "active": true, "note": null}
        })
    );
}

#[test]
fn test_non_object_is_not_an_item() {
    assert!(Item::from_json(&json!([1, 2, 3])).is_err());
    assert!(Item::from_json(&json!("id")).is_err());
}

// =============================================================================
// Key Tests
// =============================================================================

#[test]
fn test_key_from_string_and_number() {
    let mut item = Item::new();
    item.insert(ID_FIELD, "ABC");
    assert_eq!(item.key().unwrap(), "ABC");

    item.insert(ID_FIELD, 7i64);
    assert_eq!(item.key().unwrap(), "7");
}

#[test]
fn test_key_missing_or_wrong_type() {
    let item = Item::from_json(&json!({"name": "no id"})).unwrap();
    assert!(item.key().is_err());

    let item = Item::from_json(&json!({"id": [1]})).unwrap();
    assert!(item.key().is_err());
}

#[test]
fn test_key_from_json_rules() {
    assert_eq!(key_from_json(&json!("A")), Some("A".to_string()));
    assert_eq!(key_from_json(&json!(12)), Some("12".to_string()));
    let scientific: serde_json::Value = serde_json::from_str("1e2").unwrap();
    assert_eq!(key_from_json(&scientific), Some("100".to_string()));
    assert_eq!(key_from_json(&json!("")), None);
    assert_eq!(key_from_json(&json!(null)), None);
    assert_eq!(key_from_json(&json!({"id": 1})), None);
}

// =============================================================================
// Serde Tests
// =============================================================================

#[test]
fn test_decimal_survives_serde() {
    let item = Item::from_json(&json!({"id": "P", "price": 0.1})).unwrap();
    let bytes = serde_json::to_vec(&item).unwrap();
    let back: Item = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(back, item);
    assert_eq!(back.to_json()["price"], json!("0.1"));
}
