use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type NoteId = String;

pub const TITLE_MAX: usize = 80;
pub const TITLE_INPUT_MAX: usize = 120;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TitleError {
    #[error("title is required")]
    Empty,
    #[error("title must be {TITLE_MAX} characters or fewer")]
    TooLong,
}

const ID_FIELDS: &[&str] = &["id", "_id", "noteId"];
const TITLE_FIELDS: &[&str] = &["title", "name"];
const CONTENT_FIELDS: &[&str] = &["content", "body", "text"];
const UPDATED_FIELDS: &[&str] = &["updatedAt", "updated_at", "modifiedAt", "modified_at"];
const CREATED_FIELDS: &[&str] = &["createdAt", "created_at"];

impl Note {
    /// Normalize an arbitrary server payload into the canonical shape.
    /// Each field is resolved from an ordered list of candidate keys; a
    /// non-object yields the empty note (empty id, so callers that need an
    /// addressable note filter it out).
    pub fn from_raw(raw: &Value) -> Note {
        Note {
            id: field(raw, ID_FIELDS).map(stringify).unwrap_or_default(),
            title: field(raw, TITLE_FIELDS)
                .map(|v| stringify(v).trim().to_string())
                .unwrap_or_default(),
            content: field(raw, CONTENT_FIELDS).map(stringify).unwrap_or_default(),
            updated_at: field(raw, UPDATED_FIELDS).map(stringify),
            created_at: field(raw, CREATED_FIELDS).map(stringify),
        }
    }

    /// Timestamp used for ordering: `updated_at`, else `created_at`.
    /// Unparseable or absent values fall through to `None`.
    pub fn activity_key(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.created_at.as_deref().and_then(parse_timestamp))
    }
}

fn field<'a>(raw: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    let obj = raw.as_object()?;
    candidates
        .iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Sort most-recent-activity-first. Notes without a usable timestamp sort
/// as if their timestamp were the oldest possible value; the sort is
/// stable, so their relative order is preserved.
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_by_key(|note| {
        std::cmp::Reverse(note.activity_key().unwrap_or(DateTime::<Utc>::MIN_UTC))
    });
}

pub fn validate_title(title: &str) -> Result<(), TitleError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(TitleError::Empty)
    } else if trimmed.chars().count() > TITLE_MAX {
        Err(TitleError::TooLong)
    } else {
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_note(id: &str, updated: Option<&str>, created: Option<&str>) -> Note {
        Note {
            id: id.to_string(),
            title: format!("note {}", id),
            content: String::new(),
            updated_at: updated.map(str::to_string),
            created_at: created.map(str::to_string),
        }
    }

    #[test]
    fn normalizes_alternate_field_names() {
        let note = Note::from_raw(&json!({"_id": "1", "name": "A", "body": "x"}));
        assert_eq!(note.id, "1");
        assert_eq!(note.title, "A");
        assert_eq!(note.content, "x");
        assert_eq!(note.updated_at, None);
        assert_eq!(note.created_at, None);
    }

    #[test]
    fn candidate_order_is_respected() {
        let note = Note::from_raw(&json!({
            "id": "canonical",
            "_id": "mongo",
            "title": "primary",
            "name": "secondary",
            "content": "first",
            "body": "second",
            "updated_at": "2024-01-02T00:00:00Z",
            "modifiedAt": "2024-01-03T00:00:00Z",
        }));
        assert_eq!(note.id, "canonical");
        assert_eq!(note.title, "primary");
        assert_eq!(note.content, "first");
        assert_eq!(note.updated_at.as_deref(), Some("2024-01-02T00:00:00Z"));
    }

    #[test]
    fn stringifies_non_string_scalars() {
        let note = Note::from_raw(&json!({"id": 42, "title": "  padded  ", "text": "  kept  "}));
        assert_eq!(note.id, "42");
        assert_eq!(note.title, "padded");
        assert_eq!(note.content, "  kept  ");
    }

    #[test]
    fn null_candidates_are_skipped() {
        let note = Note::from_raw(&json!({"id": null, "noteId": "n7", "title": null, "name": "B"}));
        assert_eq!(note.id, "n7");
        assert_eq!(note.title, "B");
    }

    #[test]
    fn non_object_normalizes_to_empty_note() {
        for raw in [json!("plain"), json!(3), json!([1, 2]), json!(null)] {
            let note = Note::from_raw(&raw);
            assert_eq!(note.id, "");
            assert_eq!(note.title, "");
            assert_eq!(note.content, "");
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = Note::from_raw(&json!({
            "_id": "9",
            "name": "  Trim me  ",
            "body": "content",
            "updated_at": "2024-05-01T10:00:00Z",
            "created_at": "2024-04-01T10:00:00Z",
        }));
        let second = Note::from_raw(&serde_json::to_value(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn sorts_by_latest_activity_first() {
        let mut notes = vec![
            raw_note("old", Some("2023-01-01T00:00:00Z"), None),
            raw_note("new", Some("2024-06-01T00:00:00Z"), None),
            raw_note("created-only", None, Some("2024-01-01T00:00:00Z")),
        ];
        sort_notes(&mut notes);
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["new", "created-only", "old"]);
    }

    #[test]
    fn notes_without_timestamps_sort_last_and_stay_stable() {
        let mut notes = vec![
            raw_note("a", None, None),
            raw_note("b", Some("2024-01-01T00:00:00Z"), None),
            raw_note("c", None, None),
        ];
        sort_notes(&mut notes);
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn parses_timestamps_without_offset_or_time() {
        assert!(parse_timestamp("2024-03-01T12:30:00Z").is_some());
        assert!(parse_timestamp("2024-03-01T12:30:00.123").is_some());
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn title_validation_boundaries() {
        assert_eq!(validate_title("   "), Err(TitleError::Empty));
        assert_eq!(validate_title(""), Err(TitleError::Empty));
        assert!(validate_title("a").is_ok());
        assert!(validate_title(&"x".repeat(80)).is_ok());
        assert_eq!(validate_title(&"x".repeat(81)), Err(TitleError::TooLong));
        // trailing whitespace does not count against the limit
        assert!(validate_title(&format!("  {}  ", "x".repeat(80))).is_ok());
    }
}
