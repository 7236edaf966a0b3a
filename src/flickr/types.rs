use chrono::{LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Format of `photo.dates.taken`, in the photographer's local time.
pub const DATE_TAKEN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A photo as returned by the listing calls, with its original-size URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    #[serde(rename = "url_o", default)]
    pub source_url: String,
}

impl PhotoRecord {
    pub fn new(id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
        }
    }
}

/// Dates of a single photo, all as Unix timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoInfo {
    pub id: String,
    pub date_taken: i64,
    pub date_uploaded: i64,
    pub date_posted: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExifTag {
    #[serde(default)]
    pub tagspace: String,
    pub tag: String,
    #[serde(deserialize_with = "content")]
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Photoset {
    pub id: String,
    #[serde(deserialize_with = "content")]
    pub title: String,
}

/// Unwraps the `{"_content": ...}` envelope used for text nodes.
fn content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Content {
        #[serde(rename = "_content", default)]
        content: Value,
    }
    let node = Content::deserialize(deserializer)?;
    Ok(match node.content {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Counts and timestamps arrive either as JSON numbers or numeric strings.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Converts a `dates.taken` value to a Unix timestamp in `tz`.
///
/// Ambiguous times resolve to the earlier instant. A time skipped by a
/// forward transition is read with the offset in effect just before it, so
/// `02:30` on a spring-forward night lands on `03:30` of the new offset.
pub fn parse_date_taken<Tz: TimeZone>(taken: &str, tz: &Tz) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(taken, DATE_TAKEN_FORMAT).ok()?;
    match tz.from_local_datetime(&naive) {
        LocalResult::None => {
            let before = tz.from_local_datetime(&(naive - TimeDelta::hours(1))).earliest()?;
            let offset = i64::from(before.offset().fix().local_minus_utc());
            Some(naive.and_utc().timestamp() - offset)
        }
        local => local.earliest().map(|dt| dt.timestamp()),
    }
}
