//! Tests for audit entries and sessions

use corpkv::model::{AttributeValue, AuditAction, AuditLogEntry, Session, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;

#[test]
fn test_sessions_get_distinct_ids() {
    let a = Session::new(1, "client");
    let b = Session::new(2, "client");
    assert_ne!(a.session_id, b.session_id);
}

#[test]
fn test_entry_fields() {
    let session = Session::new(3, "cpu-42");
    let entry = AuditLogEntry::new(&session, AuditAction::Get, "ID: X");
    let entry_id = entry.entry_id.to_string();
    let item = entry.into_item();

    assert_eq!(item.key().unwrap(), entry_id);
    assert_eq!(item.get("CPUid").and_then(AttributeValue::as_str), Some("cpu-42"));
    assert_eq!(
        item.get("sessionid").and_then(AttributeValue::as_str),
        Some(session.session_id.to_string().as_str())
    );
    assert_eq!(item.get("action").and_then(AttributeValue::as_str), Some("get"));
    assert_eq!(item.get("details").and_then(AttributeValue::as_str), Some("ID: X"));

    let timestamp = item.get("timestamp").and_then(AttributeValue::as_str).unwrap();
    assert!(NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_ok());
}

#[test]
fn test_entry_read_back() {
    let session = Session::new(1, "reader");
    let entry = AuditLogEntry::new(&session, AuditAction::ListLogs, "Revisando CorporateLog");
    let item = entry.clone().into_item();

    let back = AuditLogEntry::from_item(&item).unwrap();
    assert_eq!(back.entry_id, entry.entry_id);
    assert_eq!(back.session_id, entry.session_id);
    assert_eq!(back.action, AuditAction::ListLogs);
    assert_eq!(back.details, "Revisando CorporateLog");
    // Stored with second precision
    assert_eq!(
        back.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        entry.timestamp.format(TIMESTAMP_FORMAT).to_string()
    );
}

#[test]
fn test_action_names() {
    for action in [
        AuditAction::Get,
        AuditAction::Set,
        AuditAction::List,
        AuditAction::ListLogs,
        AuditAction::Subscribe,
    ] {
        assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
    }
    assert!("delete".parse::<AuditAction>().is_err());
}
