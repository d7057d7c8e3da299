//! Pure conversions between vigil types and Sui JSON-RPC shapes.

use serde_json::{Value, json};
use vigil_core::{
    Event, EventFilter, EventId, EventPage, LedgerError, ObjectId, ObjectSnapshot, SortOrder,
    event::json_u64,
};

/// Type of the native coin.
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// The `query` parameter of `suix_queryEvents` for `filter`.
pub fn event_query(filter: &EventFilter) -> Result<Value, LedgerError> {
    if let Some(ty) = filter.qualified_event_type() {
        return Ok(json!({ "MoveEventType": ty }));
    }
    match &filter.module {
        Some(module) => Ok(json!({
            "MoveModule": { "package": filter.package, "module": module }
        })),
        None => Err(LedgerError::FatalConfig(
            "event filter needs a module or an event type".into(),
        )),
    }
}

/// Full parameter list of `suix_queryEvents`.
pub fn query_events_params(
    filter: &EventFilter,
    after: Option<&EventId>,
    order: SortOrder,
    limit: usize,
) -> Result<Value, LedgerError> {
    let cursor = match after {
        Some(id) => serde_json::to_value(id).map_err(|e| LedgerError::Decode(e.to_string()))?,
        None => Value::Null,
    };
    Ok(json!([
        event_query(filter)?,
        cursor,
        limit,
        order == SortOrder::Descending
    ]))
}

/// Decode one entry of an event page.
pub fn parse_event(raw: &Value) -> Result<Event, LedgerError> {
    let id: EventId = serde_json::from_value(raw.get("id").cloned().unwrap_or(Value::Null))
        .map_err(|e| LedgerError::Decode(format!("event id: {e}")))?;
    let event_type = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::Decode(format!("event {id} has no type")))?;
    let timestamp_ms = raw
        .get("timestampMs")
        .and_then(json_u64)
        .unwrap_or_default();
    let payload = raw.get("parsedJson").cloned().unwrap_or(Value::Null);
    let mut event = Event::new(id, event_type, timestamp_ms, payload);
    event.sender = raw.get("sender").and_then(Value::as_str).map(str::to_owned);
    Ok(event)
}

/// Decode a `suix_queryEvents` result.
pub fn parse_event_page(result: &Value) -> Result<EventPage, LedgerError> {
    let data = result
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| LedgerError::Decode("event page has no data".into()))?
        .iter()
        .map(parse_event)
        .collect::<Result<Vec<_>, _>>()?;
    let next_cursor = match result.get("nextCursor") {
        None | Some(Value::Null) => None,
        Some(cursor) => Some(
            serde_json::from_value(cursor.clone())
                .map_err(|e| LedgerError::Decode(format!("next cursor: {e}")))?,
        ),
    };
    let has_next_page = result
        .get("hasNextPage")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(EventPage {
        data,
        next_cursor,
        has_next_page,
    })
}

/// Decode a `sui_getObject` result. `None` when the object is missing or
/// deleted.
pub fn parse_object(result: &Value) -> Result<Option<ObjectSnapshot>, LedgerError> {
    if result.get("error").is_some_and(|e| !e.is_null()) {
        return Ok(None);
    }
    let Some(data) = result.get("data").filter(|d| !d.is_null()) else {
        return Ok(None);
    };
    let id = data
        .get("objectId")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::Decode("object has no objectId".into()))?;
    let fields = data
        .pointer("/content/fields")
        .cloned()
        .unwrap_or(Value::Null);
    let mut snapshot = ObjectSnapshot::new(id, fields);
    snapshot.type_name = data
        .get("type")
        .or_else(|| data.pointer("/content/type"))
        .and_then(Value::as_str)
        .map(str::to_owned);
    Ok(Some(snapshot))
}

/// Decode a `suix_getBalance` result.
pub fn parse_balance(result: &Value) -> Result<u128, LedgerError> {
    let total = result
        .get("totalBalance")
        .ok_or_else(|| LedgerError::Decode("balance has no totalBalance".into()))?;
    match total {
        Value::String(s) => s
            .parse()
            .map_err(|e| LedgerError::Decode(format!("totalBalance {s:?}: {e}"))),
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| LedgerError::Decode(format!("totalBalance {n}"))),
        other => Err(LedgerError::Decode(format!("totalBalance {other}"))),
    }
}

/// A coin owned by the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedCoin {
    /// Coin object id.
    pub id: ObjectId,
    /// Balance in base units.
    pub balance: u64,
}

/// Decode a `suix_getCoins` result.
pub fn parse_coins(result: &Value) -> Result<Vec<OwnedCoin>, LedgerError> {
    let data = result
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| LedgerError::Decode("coin page has no data".into()))?;
    data.iter()
        .map(|coin| {
            let id = coin
                .get("coinObjectId")
                .and_then(Value::as_str)
                .ok_or_else(|| LedgerError::Decode("coin has no coinObjectId".into()))?;
            let balance = coin
                .get("balance")
                .and_then(json_u64)
                .ok_or_else(|| LedgerError::Decode(format!("coin {id} has no balance")))?;
            Ok(OwnedCoin {
                id: ObjectId::new(id),
                balance,
            })
        })
        .collect()
}

/// Render a pure argument the way the transaction builder expects.
/// Integers are sent as decimal strings so `u64` values above 2^53 survive.
pub fn pure_arg(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Array(items) => Value::Array(items.iter().map(pure_arg).collect()),
        other => other.clone(),
    }
}

/// Split `package::module::function`.
pub fn split_target(target: &str) -> Result<(&str, &str, &str), LedgerError> {
    let mut parts = target.split("::");
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(package), Some(module), Some(function), None)
            if !package.is_empty() && !module.is_empty() && !function.is_empty() =>
        {
            Ok((package, module, function))
        }
        _ => Err(LedgerError::FatalConfig(format!(
            "call target {target:?} is not package::module::function"
        ))),
    }
}

/// The `txBytes` of an `unsafe_*` builder result.
pub fn tx_bytes(result: &Value) -> Result<String, LedgerError> {
    result
        .get("txBytes")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| LedgerError::Decode("builder result has no txBytes".into()))
}

/// Digest of the transaction a `sui_dryRunTransactionBlock` previewed.
///
/// A dry run that aborts is a rejection: the real transaction would abort
/// the same way, so it is never sent.
pub fn dry_run_digest(result: &Value) -> Result<String, LedgerError> {
    let effects = result
        .get("effects")
        .ok_or_else(|| LedgerError::Decode("dry run has no effects".into()))?;
    if let Some(status) = effects.get("status") {
        if status.get("status").and_then(Value::as_str) == Some("failure") {
            let error = status
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown failure");
            return Err(LedgerError::Rejected(format!("dry run failed: {error}")));
        }
    }
    effects
        .get("transactionDigest")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| LedgerError::Decode("dry run has no transactionDigest".into()))
}

/// Id of the coin a `paySui` to self created.
pub fn created_coin(response: &Value, owner: &str) -> Option<ObjectId> {
    response
        .get("objectChanges")?
        .as_array()?
        .iter()
        .filter(|change| change.get("type").and_then(Value::as_str) == Some("created"))
        .filter(|change| {
            change
                .get("objectType")
                .and_then(Value::as_str)
                .is_some_and(|t| t.starts_with("0x2::coin::Coin<") && t.contains("::sui::SUI"))
        })
        .find(|change| {
            change
                .pointer("/owner/AddressOwner")
                .and_then(Value::as_str)
                .is_none_or(|o| o == owner)
        })
        .and_then(|change| change.get("objectId"))
        .and_then(Value::as_str)
        .map(ObjectId::new)
}

/// Whether a "not found" lookup error means the transaction is unknown.
pub fn is_unknown_transaction(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("could not find the referenced transaction")
        || lower.contains("not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_numbers_become_strings() {
        assert_eq!(pure_arg(&json!(18446744073709551615u64)), json!("18446744073709551615"));
        assert_eq!(pure_arg(&json!("Kraken")), json!("Kraken"));
        assert_eq!(pure_arg(&json!([1, 2])), json!(["1", "2"]));
        assert_eq!(pure_arg(&json!(true)), json!(true));
    }

    #[test]
    fn split_target_requires_three_parts() {
        assert_eq!(
            split_target("0xpkg::boss_battle::attack_boss").unwrap(),
            ("0xpkg", "boss_battle", "attack_boss")
        );
        assert!(split_target("0xpkg::attack_boss").is_err());
        assert!(split_target("a::b::c::d").is_err());
        assert!(split_target("::b::c").is_err());
    }
}
