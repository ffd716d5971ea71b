//! Common types used across the sync planner: records, table settings and
//! the timestamp/day helpers that bucket records into day files.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A record is an ordered map of field names to JSON values.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Field holding the millisecond timestamp of the last mutation.
pub const LAST_OPERATION_TIME_FIELD: &str = "last_operation_time";

/// Field used to bucket a record into a calendar day.
pub const CREATED_AT_FIELD: &str = "created_at";

/// Identifier field used when a table does not configure one.
pub const DEFAULT_ID_FIELD: &str = "id";

const DAY_FORMAT: &str = "%Y-%m-%d";
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Configuration for a syncable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Table name, also the directory name under the remote root
    pub name: String,
    /// Name of the string identifier field shared by every record in the table
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

impl TableSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: default_id_field(),
        }
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Read this table's identifier from a record.
    pub fn record_id(&self, record: &Record) -> Option<String> {
        scalar_as_string(record.get(&self.id_field)?)
    }
}

/// Read `last_operation_time` from a record as a decimal string.
/// Integer values written by older clients are accepted as well.
pub fn record_timestamp(record: &Record) -> Option<String> {
    scalar_as_string(record.get(LAST_OPERATION_TIME_FIELD)?)
}

/// Calendar day (`YYYY-MM-DD`, UTC) a record belongs to, from `created_at`.
pub fn record_day(record: &Record) -> Option<String> {
    let created_at = scalar_as_string(record.get(CREATED_AT_FIELD)?)?;
    day_of(&created_at)
}

fn scalar_as_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a decimal millisecond timestamp.
pub fn parse_millis(timestamp: &str) -> Option<i64> {
    if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    timestamp.parse().ok()
}

/// Bucket a `created_at` value into a UTC calendar day.
///
/// Handles a decimal millisecond timestamp, RFC3339 (2025-10-12T06:50:10.674Z),
/// SQLite format (2025-10-12 06:50:10.674) and a bare date.
pub fn day_of(created_at: &str) -> Option<String> {
    parse_instant(created_at).map(|dt| dt.date_naive().format(DAY_FORMAT).to_string())
}

/// Milliseconds since the epoch of a record's `created_at`.
pub fn record_created_millis(record: &Record) -> Option<i64> {
    let created_at = scalar_as_string(record.get(CREATED_AT_FIELD)?)?;
    parse_instant(&created_at).map(|dt| dt.timestamp_millis())
}

/// Parse any of the `created_at` forms accepted by [`day_of`] as a UTC
/// instant. A bare date is midnight UTC.
fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    parse_millis(value)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| parse_day(value)?.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()))
}

/// Strictly parse a `YYYY-MM-DD` day string.
pub fn parse_day(day: &str) -> Option<NaiveDate> {
    let bytes = day.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(day, DAY_FORMAT).ok()
}

/// Inclusive `[start, end]` millisecond bounds of a UTC calendar day.
pub fn day_bounds_millis(day: &str) -> Option<(i64, i64)> {
    let start = parse_day(day)?.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis();
    Some((start, start + MILLIS_PER_DAY - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_day_of_formats() {
        assert_eq!(day_of("2025-10-12T06:50:10.674Z").as_deref(), Some("2025-10-12"));
        assert_eq!(day_of("2025-10-12 23:59:59.999").as_deref(), Some("2025-10-12"));
        assert_eq!(day_of("2025-10-13").as_deref(), Some("2025-10-13"));
        // 2025-10-12T00:00:00Z
        assert_eq!(day_of("1760227200000").as_deref(), Some("2025-10-12"));
        assert_eq!(day_of("yesterday"), None);
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds_millis("2025-10-12").unwrap();
        assert_eq!(start, 1_760_227_200_000);
        assert_eq!(end - start, MILLIS_PER_DAY - 1);
        assert!(day_bounds_millis("2025-13-01").is_none());
        assert!(day_bounds_millis("2025-1-01").is_none());
    }

    #[test]
    fn test_record_accessors() {
        let settings = TableSettings::new("pastes").with_id_field("uuid");
        let rec = record(json!({
            "uuid": "abc",
            "last_operation_time": 1760227200123u64,
            "created_at": "2025-10-12T08:00:00Z"
        }));

        assert_eq!(settings.record_id(&rec).as_deref(), Some("abc"));
        assert_eq!(record_timestamp(&rec).as_deref(), Some("1760227200123"));
        assert_eq!(record_day(&rec).as_deref(), Some("2025-10-12"));
        assert_eq!(record_created_millis(&rec), Some(1_760_256_000_000));
        assert_eq!(TableSettings::new("pastes").record_id(&rec), None);
    }

    #[test]
    fn test_parse_millis_rejects_signs_and_blanks() {
        assert_eq!(parse_millis("1700"), Some(1700));
        assert_eq!(parse_millis(""), None);
        assert_eq!(parse_millis("-5"), None);
        assert_eq!(parse_millis("12a"), None);
    }

    #[test]
    fn test_table_settings_default_id_field() {
        let settings: TableSettings = serde_json::from_str(r#"{"name":"pastes"}"#).unwrap();
        assert_eq!(settings.id_field, "id");
    }
}
