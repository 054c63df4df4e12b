// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn new_ids_carry_prefix_and_are_unique() {
    let a = AttemptId::new();
    let b = AttemptId::new();
    assert!(a.as_str().starts_with("att-"));
    assert_eq!(a.as_str().len(), 23);
    assert_ne!(a, b);
}

#[test]
fn short_skips_prefix() {
    let id = AttemptId::from_string("att-abcdefghij");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(64), "abcdefghij");
}

#[test]
fn caller_supplied_client_id_round_trips() {
    let id: ClientId = "webview-1".into();
    assert_eq!(id, "webview-1");
    assert_eq!(id.to_string(), "webview-1");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"webview-1\"");
}

#[test]
fn ids_borrow_as_str_for_map_lookup() {
    let mut map = HashMap::new();
    map.insert(ClientId::from("a"), 1);
    assert_eq!(map.get("a"), Some(&1));
}
