//! services/api/src/casefold.rs
//!
//! Case-insensitive JSON decoding for the services this gateway talks to.
//!
//! The share backend and the media server don't agree with us (or with each
//! other) on how field names are cased: `shareId`, `ShareId` and `share_id` all
//! show up. Instead of guessing, every object key is folded to one canonical
//! form before the value is mapped into a typed record. Wire structs name their
//! fields in folded form via `#[serde(rename = "...")]`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Folds a key to its canonical form: ASCII-lowercased, `_` and `-` removed.
pub fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Recursively folds every object key inside `value`.
///
/// When several keys of one object fold to the same name, a key already in
/// folded form wins; otherwise the key whose original spelling sorts first
/// (byte order) wins. The result never depends on the order keys appear in.
pub fn fold_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut winners: HashMap<String, String> = HashMap::new();
            let mut folded = Map::new();
            for (key, value) in map {
                let canonical = fold_key(&key);
                let replaces = match winners.get(&canonical) {
                    None => true,
                    Some(current) => collision_rank(&canonical, &key) < collision_rank(&canonical, current),
                };
                if replaces {
                    folded.insert(canonical.clone(), fold_keys(value));
                    winners.insert(canonical, key);
                }
            }
            Value::Object(folded)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(fold_keys).collect()),
        other => other,
    }
}

fn collision_rank<'a>(canonical: &str, original: &'a str) -> (bool, &'a str) {
    (original != canonical, original)
}

/// Parses `bytes` as JSON, folds its keys and maps it into `T`.
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    let raw: Value = serde_json::from_slice(bytes)?;
    serde_json::from_value(fold_keys(raw))
}

/// Accepts RFC 3339 timestamps as well as offset-less ISO-8601 ones, which are
/// taken to be UTC.
pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Sample {
        #[serde(rename = "shareid")]
        share_id: String,
        #[serde(rename = "maxtotalplays")]
        max_total_plays: Option<u32>,
        #[serde(rename = "expiresat", deserialize_with = "timestamp")]
        expires_at: DateTime<Utc>,
    }

    #[test]
    fn folds_every_casing_to_the_same_key() {
        for key in ["shareId", "ShareId", "SHAREID", "share_id", "share-id"] {
            assert_eq!(fold_key(key), "shareid");
        }
    }

    #[test]
    fn folds_nested_objects_and_arrays() {
        let folded = fold_keys(json!({
            "Shares": [{ "PublicToken": "a" }],
            "Total": 1
        }));
        assert_eq!(folded, json!({ "shares": [{ "publictoken": "a" }], "total": 1 }));
    }

    #[test]
    fn colliding_keys_resolve_the_same_way_in_any_order() {
        let forward: Value = serde_json::from_str(r#"{"ShareId":"a","shareId":"b","shareid":"c"}"#).unwrap();
        let reverse: Value = serde_json::from_str(r#"{"shareid":"c","shareId":"b","ShareId":"a"}"#).unwrap();
        assert_eq!(fold_keys(forward), json!({ "shareid": "c" }));
        assert_eq!(fold_keys(reverse), json!({ "shareid": "c" }));

        let mixed = json!({ "Share_Id": "x", "SHAREID": "y" });
        assert_eq!(fold_keys(mixed), json!({ "shareid": "y" }));
    }

    #[test]
    fn decodes_records_regardless_of_key_casing() {
        let bodies = [
            r#"{"shareId":"s1","maxTotalPlays":3,"expiresAt":"2030-01-02T03:04:05Z"}"#,
            r#"{"ShareId":"s1","MaxTotalPlays":3,"ExpiresAt":"2030-01-02T03:04:05Z"}"#,
            r#"{"share_id":"s1","max_total_plays":3,"expires_at":"2030-01-02T03:04:05Z"}"#,
        ];
        let expected = Sample {
            share_id: "s1".to_string(),
            max_total_plays: Some(3),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        };
        for body in bodies {
            assert_eq!(from_slice::<Sample>(body.as_bytes()).unwrap(), expected);
        }
    }

    #[test]
    fn offsetless_timestamps_are_utc() {
        let parsed = parse_timestamp("2030-01-02T03:04:05.1234567").unwrap();
        assert_eq!(parsed.date_naive(), Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap().date_naive());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
