use axum::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

/// Success payload shape shared by every route: `{success, count?, data}`.
/// `count` is present only on list responses.
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

pub fn one<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        count: None,
        data,
    })
}

pub fn list<T: Serialize>(items: Vec<T>) -> Json<Envelope<Vec<T>>> {
    Json(Envelope {
        success: true,
        count: Some(items.len()),
        data: items,
    })
}

pub fn empty() -> Json<Envelope<Value>> {
    Json(Envelope {
        success: true,
        count: None,
        data: json!({}),
    })
}

pub fn to_iso(timestamp: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(timestamp, Utc).to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_envelope_carries_count() {
        let body = serde_json::to_value(list(vec![1, 2, 3]).0).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 3);
        assert_eq!(body["data"], json!([1, 2, 3]));
    }

    #[test]
    fn single_envelope_omits_count() {
        let body = serde_json::to_value(one("x").0).unwrap();
        assert!(body.get("count").is_none());
        assert_eq!(body["data"], "x");
    }

    #[test]
    fn empty_envelope_is_an_empty_object() {
        let body = serde_json::to_value(empty().0).unwrap();
        assert_eq!(body["data"], json!({}));
    }
}
