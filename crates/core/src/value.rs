//! Loose comparison rules over JSON values.
//!
//! Query literals arrive as text (`price[gte]=100`) while stored fields are
//! typed, so literals are coerced toward the stored value's type before any
//! comparison. Ordering across types follows a fixed rank:
//! missing/null < number < string < object < array < bool.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{Number, Value};

use crate::types::{Document, Timestamp};

/// Resolve a dotted path (`startLocation.coordinates`) inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_instant(raw: &str) -> Option<Timestamp> {
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Numeric view of a value, if it is a JSON number.
pub fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Build a JSON number from an `f64`, mapping non-finite values to `null`.
pub fn number(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Instants rank before plain strings. Two instants compare chronologically,
/// two plain strings alphabetically.
fn compare_strings(a: &str, b: &str) -> Ordering {
    match (parse_instant(a), parse_instant(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Total order over JSON values used by sorting and min/max accumulators.
///
/// Strings that parse as instants compare chronologically and sort ahead of
/// every other string.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => compare_strings(x, y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ord = compare_values(left, right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            if x == y {
                Ordering::Equal
            } else {
                x.len().cmp(&y.len())
            }
        }
        _ => Ordering::Equal,
    }
}

/// Coerce a query literal toward the type of the stored value it is compared with.
pub fn coerce_literal<'a>(stored: &Value, literal: &'a Value) -> Cow<'a, Value> {
    let Value::String(text) = literal else {
        return Cow::Borrowed(literal);
    };
    match stored {
        Value::Number(_) => match text.trim().parse::<f64>() {
            Ok(n) => Cow::Owned(number(n)),
            Err(_) => Cow::Borrowed(literal),
        },
        Value::Bool(_) => match text.as_str() {
            "true" => Cow::Owned(Value::Bool(true)),
            "false" => Cow::Owned(Value::Bool(false)),
            _ => Cow::Borrowed(literal),
        },
        _ => Cow::Borrowed(literal),
    }
}

/// Compare a stored value with a literal for range operators.
///
/// Returns `None` when the two are of different kinds after coercion, in
/// which case no range operator matches.
pub fn compare_with_literal(stored: &Value, literal: &Value) -> Option<Ordering> {
    let literal = coerce_literal(stored, literal);
    if type_rank(stored) != type_rank(&literal) {
        return None;
    }
    Some(compare_values(stored, &literal))
}

/// Equality between a stored value and a literal, after coercion.
pub fn loosely_equal(stored: &Value, literal: &Value) -> bool {
    compare_with_literal(stored, literal) == Some(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn lookup_follows_dotted_paths() {
        let d = doc(json!({ "startLocation": { "coordinates": [-80.1, 25.7] } }));
        assert_eq!(lookup(&d, "startLocation.coordinates.1"), Some(&json!(25.7)));
        assert_eq!(lookup(&d, "startLocation.missing"), None);
    }

    #[test]
    fn text_literal_is_coerced_to_number() {
        assert_eq!(
            compare_with_literal(&json!(150), &json!("100")),
            Some(Ordering::Greater)
        );
        assert!(loosely_equal(&json!(100.0), &json!("100")));
    }

    #[test]
    fn mismatched_kinds_do_not_compare() {
        assert_eq!(compare_with_literal(&json!(5), &json!("five")), None);
    }

    #[test]
    fn instants_compare_chronologically() {
        let a = json!("2021-06-01T09:00:00Z");
        let b = json!("2021-06-01T10:00:00+01:00");
        assert_eq!(compare_values(&a, &b), Ordering::Equal);
        assert_eq!(
            compare_values(&json!("2021-12-31T10:00:00Z"), &json!("2022-01-01")),
            Ordering::Less
        );
    }

    #[test]
    fn instants_rank_before_plain_strings() {
        let instant = json!("2021-12-31T10:00:00Z");
        let offset = json!("2021-12-31T09:00:00-05:00");
        let plain = json!("2021-12-31T09:30");
        assert_eq!(compare_values(&instant, &offset), Ordering::Less);
        assert_eq!(compare_values(&offset, &plain), Ordering::Less);
        assert_eq!(compare_values(&instant, &plain), Ordering::Less);
        assert_eq!(compare_values(&json!("apple"), &json!("banana")), Ordering::Less);
    }

    #[test]
    fn mixed_strings_sort_without_panicking() {
        let pool = [
            "2021-12-31T10:00:00Z",
            "2021-12-31T09:00:00-05:00",
            "2021-12-31T09:30",
            "Lovely stay",
            "2020-01-01",
            "amazing",
        ];
        let mut values: Vec<Value> = (0..400).map(|i| json!(pool[(i * 7) % pool.len()])).collect();
        values.sort_by(compare_values);

        let first_plain = values
            .iter()
            .position(|v| v.as_str().and_then(parse_instant).is_none())
            .unwrap();
        assert!(values[..first_plain]
            .iter()
            .all(|v| v.as_str().and_then(parse_instant).is_some()));
        assert!(values[first_plain..]
            .iter()
            .all(|v| v.as_str().and_then(parse_instant).is_none()));
        assert_eq!(values[0], json!("2020-01-01"));
    }

    #[test]
    fn null_sorts_before_numbers() {
        assert_eq!(compare_values(&Value::Null, &json!(0)), Ordering::Less);
    }
}
