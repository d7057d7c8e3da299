use serde_json::json;
use vigil_core::{EventFilter, EventId, LedgerError, ObjectId, SortOrder};
use vigil_sui::wire::{
    created_coin, dry_run_digest, event_query, is_unknown_transaction, parse_balance, parse_coins,
    parse_event_page, parse_object, query_events_params, tx_bytes,
};

// ━━━ Event queries ━━━

#[test]
fn module_filter_uses_move_module_query() {
    let filter = EventFilter::module("0xpkg", "boss_battle");
    assert_eq!(
        event_query(&filter).unwrap(),
        json!({"MoveModule": {"package": "0xpkg", "module": "boss_battle"}})
    );
}

#[test]
fn type_filter_uses_move_event_type_query() {
    let filter = EventFilter::event_type("0xpkg", "boss_battle", "CombatEvent");
    assert_eq!(
        event_query(&filter).unwrap(),
        json!({"MoveEventType": "0xpkg::boss_battle::CombatEvent"})
    );
}

#[test]
fn query_params_carry_cursor_limit_and_order() {
    let filter = EventFilter::module("0xpkg", "boss_battle");
    let after = EventId::new("Dig", 3);
    let params = query_events_params(&filter, Some(&after), SortOrder::Descending, 1).unwrap();
    assert_eq!(params[1], json!({"txDigest": "Dig", "eventSeq": "3"}));
    assert_eq!(params[2], json!(1));
    assert_eq!(params[3], json!(true));

    let params = query_events_params(&filter, None, SortOrder::Ascending, 50).unwrap();
    assert!(params[1].is_null());
    assert_eq!(params[3], json!(false));
}

#[test]
fn parses_event_page() {
    let result = json!({
        "data": [{
            "id": {"txDigest": "Dig1", "eventSeq": "0"},
            "packageId": "0xpkg",
            "transactionModule": "boss_battle",
            "sender": "0xattacker",
            "type": "0xpkg::boss_battle::CombatEvent",
            "parsedJson": {"boss_id": "0xb", "damage": "40", "is_kill": true},
            "timestampMs": "1700000000123"
        }],
        "nextCursor": {"txDigest": "Dig1", "eventSeq": "0"},
        "hasNextPage": false
    });

    let page = parse_event_page(&result).unwrap();

    assert_eq!(page.data.len(), 1);
    let event = &page.data[0];
    assert_eq!(event.id, EventId::new("Dig1", 0));
    assert_eq!(event.short_type(), "CombatEvent");
    assert_eq!(event.timestamp_ms, 1_700_000_000_123);
    assert_eq!(event.sender.as_deref(), Some("0xattacker"));
    assert_eq!(event.field_bool("is_kill"), Some(true));
    assert_eq!(page.next_cursor, Some(EventId::new("Dig1", 0)));
    assert!(!page.has_next_page);
}

#[test]
fn empty_page_has_no_cursor() {
    let page = parse_event_page(&json!({"data": [], "nextCursor": null, "hasNextPage": false}))
        .unwrap();
    assert!(page.data.is_empty());
    assert!(page.next_cursor.is_none());
}

#[test]
fn event_without_id_is_a_decode_error() {
    let err = parse_event_page(&json!({"data": [{"type": "x"}]})).unwrap_err();
    assert!(matches!(err, LedgerError::Decode(_)));
}

// ━━━ Objects and balances ━━━

#[test]
fn parses_object_fields() {
    let result = json!({
        "data": {
            "objectId": "0xb",
            "type": "0xpkg::boss_battle::Boss",
            "content": {
                "dataType": "moveObject",
                "type": "0xpkg::boss_battle::Boss",
                "fields": {"name": "Kraken", "hp": "700", "is_alive": true}
            }
        }
    });

    let object = parse_object(&result).unwrap().unwrap();

    assert_eq!(object.id, ObjectId::new("0xb"));
    assert_eq!(object.type_name.as_deref(), Some("0xpkg::boss_battle::Boss"));
    assert_eq!(object.field_u64("hp"), Some(700));
    assert_eq!(object.field_str("name"), Some("Kraken"));
}

#[test]
fn missing_object_is_none() {
    let result = json!({"error": {"code": "notExists", "object_id": "0xb"}});
    assert!(parse_object(&result).unwrap().is_none());
}

#[test]
fn parses_string_balance() {
    assert_eq!(
        parse_balance(&json!({"coinType": "0x2::sui::SUI", "totalBalance": "62000000000"}))
            .unwrap(),
        62_000_000_000
    );
    assert!(parse_balance(&json!({})).is_err());
}

#[test]
fn parses_coins() {
    let coins = parse_coins(&json!({
        "data": [
            {"coinObjectId": "0xc1", "balance": "5"},
            {"coinObjectId": "0xc2", "balance": "7"}
        ],
        "hasNextPage": false
    }))
    .unwrap();
    assert_eq!(coins.len(), 2);
    assert_eq!(coins[1].id, ObjectId::new("0xc2"));
    assert_eq!(coins[1].balance, 7);
}

// ━━━ Transactions ━━━

#[test]
fn builder_result_must_have_tx_bytes() {
    assert_eq!(tx_bytes(&json!({"txBytes": "AAEC"})).unwrap(), "AAEC");
    assert!(matches!(tx_bytes(&json!({})), Err(LedgerError::Decode(_))));
}

#[test]
fn dry_run_reports_the_digest_before_sending() {
    let preview = json!({
        "effects": {
            "status": {"status": "success"},
            "transactionDigest": "8kDig"
        },
        "events": []
    });
    assert_eq!(dry_run_digest(&preview).unwrap(), "8kDig");
}

#[test]
fn aborting_dry_run_is_a_rejection() {
    let preview = json!({
        "effects": {
            "status": {"status": "failure", "error": "MoveAbort(register_agent, AlreadyRegistered)"},
            "transactionDigest": "8kDig"
        }
    });
    let err = dry_run_digest(&preview).unwrap_err();
    assert!(matches!(&err, LedgerError::Rejected(msg) if msg.contains("AlreadyRegistered")));
    assert!(matches!(
        dry_run_digest(&json!({"effects": {"status": {"status": "success"}}})),
        Err(LedgerError::Decode(_))
    ));
}

#[test]
fn finds_coin_created_for_owner() {
    let response = json!({
        "digest": "Dig",
        "objectChanges": [
            {"type": "mutated", "objectType": "0x2::coin::Coin<0x2::sui::SUI>", "objectId": "0xold"},
            {
                "type": "created",
                "objectType": "0x2::coin::Coin<0x2::sui::SUI>",
                "objectId": "0xnew",
                "owner": {"AddressOwner": "0xme"}
            }
        ]
    });
    assert_eq!(created_coin(&response, "0xme"), Some(ObjectId::new("0xnew")));
    assert_eq!(created_coin(&response, "0xsomeone"), None);
}

#[test]
fn unknown_transaction_messages_are_recognized() {
    assert!(is_unknown_transaction(
        "Could not find the referenced transaction [TransactionDigest(abc)]."
    ));
    assert!(!is_unknown_transaction("Internal error"));
}
