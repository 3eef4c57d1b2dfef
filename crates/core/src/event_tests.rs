// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn payload_travels_as_base64() {
    let event = BuildSlaveEvent::opaque(b"\x00\x01hello".to_vec());
    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(json, serde_json::json!({ "payload": "AAFoZWxsbw==" }));
}

#[test]
fn kind_is_optional_on_the_wire() {
    let event: BuildSlaveEvent = serde_json::from_str(r#"{"payload":"aGk="}"#).unwrap();
    assert_eq!(event.kind, None);
    assert_eq!(event.payload, b"hi");
}

#[test]
fn coordinator_finished_carries_exit_code() {
    let event: BuildSlaveEvent = serde_json::from_str(
        r#"{"kind":{"type":"coordinator_finished","exit_code":3},"payload":""}"#,
    )
    .unwrap();
    assert_eq!(event.kind, Some(BuildSlaveEventKind::CoordinatorFinished { exit_code: 3 }));
}

#[test]
fn unknown_kind_and_fields_are_tolerated() {
    let event: BuildSlaveEvent = serde_json::from_str(
        r#"{"kind":{"type":"cache_upload_started"},"payload":"","added_later":true}"#,
    )
    .unwrap();
    assert_eq!(event.kind, Some(BuildSlaveEventKind::Unknown));
}

#[test]
fn invalid_base64_is_rejected() {
    let result: Result<BuildSlaveEvent, _> = serde_json::from_str(r#"{"payload":"***"}"#);
    assert!(result.is_err());
}

#[test]
fn kind_display() {
    assert_eq!(BuildSlaveEventKind::RuleStarted.to_string(), "rule_started");
    assert_eq!(
        BuildSlaveEventKind::CoordinatorFinished { exit_code: 0 }.to_string(),
        "coordinator_finished"
    );
}
