use crate::model::Note;
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};

/// Boundary between the rest of the program and the remote store. The
/// orchestrator and the CLI commands only ever talk to this trait.
pub trait NotesApi {
    fn list_notes(&self) -> Result<Vec<Note>, ApiError>;
    fn create_note(&self, title: &str, content: &str) -> Result<Note, ApiError>;
    fn update_note(&self, id: &str, title: &str, content: &str) -> Result<Note, ApiError>;
    fn delete_note(&self, id: &str) -> Result<(), ApiError>;
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("server returned an unusable note payload")]
    Payload,
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

pub struct HttpNotesApi {
    client: Client,
    base: Url,
}

impl HttpNotesApi {
    pub fn new(base: Url) -> Self {
        HttpNotesApi {
            client: Client::new(),
            base,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, id: Option<&str>) -> Url {
        let mut url = self.base.clone();
        // config guarantees an http(s) base, so the path is always segmentable
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("notes");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }
}

impl NotesApi for HttpNotesApi {
    fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        let url = self.endpoint(None);
        debug!("GET {}", url);
        let response = check(self.client.get(url).send()?)?;
        let payload: Value = response.json()?;
        let raw_notes = extract_note_array(&payload)
            .map(|items| items.as_slice())
            .unwrap_or_default();
        let mut notes = Vec::with_capacity(raw_notes.len());
        for raw in raw_notes {
            let note = Note::from_raw(raw);
            if note.id.is_empty() {
                debug!("dropping note without a usable id: {}", raw);
                continue;
            }
            notes.push(note);
        }
        Ok(notes)
    }

    fn create_note(&self, title: &str, content: &str) -> Result<Note, ApiError> {
        let url = self.endpoint(None);
        debug!("POST {}", url);
        let response = check(
            self.client
                .post(url)
                .json(&json!({ "title": title, "content": content }))
                .send()?,
        )?;
        let payload: Value = response.json()?;
        let raw = unwrap_note(&payload);
        if !raw.is_object() {
            return Err(ApiError::Payload);
        }
        let note = Note::from_raw(raw);
        if note.id.is_empty() {
            return Err(ApiError::Payload);
        }
        Ok(note)
    }

    fn update_note(&self, id: &str, title: &str, content: &str) -> Result<Note, ApiError> {
        let url = self.endpoint(Some(id));
        debug!("PUT {}", url);
        let response = check(
            self.client
                .put(url)
                .json(&json!({ "title": title, "content": content }))
                .send()?,
        )?;
        let payload: Value = response.json()?;
        let raw = unwrap_note(&payload);
        if !raw.is_object() {
            return Err(ApiError::Payload);
        }
        let mut note = Note::from_raw(raw);
        if note.id.is_empty() {
            // the server accepted the PUT for this id even if the echo omits it
            note.id = id.to_string();
        }
        Ok(note)
    }

    fn delete_note(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(Some(id));
        debug!("DELETE {}", url);
        check(self.client.delete(url).send()?)?;
        Ok(())
    }
}

fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("json"))
        .unwrap_or(false);
    let body = response.text().unwrap_or_default();
    Err(ApiError::Api {
        status: status.as_u16(),
        message: error_message(status, is_json, &body),
    })
}

fn error_message(status: StatusCode, is_json: bool, body: &str) -> String {
    if is_json {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            for key in ["message", "error"] {
                if let Some(text) = value.get(key).and_then(Value::as_str) {
                    if !text.trim().is_empty() {
                        return text.to_string();
                    }
                }
            }
        }
    } else if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    format!("request failed (status {})", status.as_u16())
}

const WRAPPER_FIELDS: &[&str] = &["data", "items", "notes"];

/// The read-all payload may be a bare array or an object wrapping the array
/// under `data`, `items`, or `notes` (first present wins, recursively, so
/// `{"data":{"items":[...]}}` unwraps). Anything else is no array at all.
fn extract_note_array(payload: &Value) -> Option<&Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(obj) => WRAPPER_FIELDS
            .iter()
            .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
            .and_then(extract_note_array),
        _ => None,
    }
}

fn unwrap_note(payload: &Value) -> &Value {
    match payload.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_bare_arrays_and_wrapped_arrays() {
        let bare = json!([{"id": "1"}]);
        assert_eq!(extract_note_array(&bare).map(|v| v.len()), Some(1));

        for key in ["data", "items", "notes"] {
            let wrapped = json!({ key: [{"id": "1"}, {"id": "2"}] });
            assert_eq!(extract_note_array(&wrapped).map(|v| v.len()), Some(2));
        }
    }

    #[test]
    fn wrapper_precedence_and_nesting() {
        let nested = json!({"data": {"items": [{"_id": "1", "name": "A", "body": "x"}]}});
        let items = extract_note_array(&nested).expect("nested array");
        let note = Note::from_raw(&items[0]);
        assert_eq!((note.id.as_str(), note.title.as_str(), note.content.as_str()), ("1", "A", "x"));

        // `data` wins over `notes` even when it nests deeper
        let both = json!({"notes": [{"id": "n"}], "data": {"items": [{"id": "d"}]}});
        let items = extract_note_array(&both).expect("data branch");
        assert_eq!(items[0].get("id").and_then(Value::as_str), Some("d"));
    }

    #[test]
    fn unusable_shapes_yield_no_array() {
        assert!(extract_note_array(&json!("nope")).is_none());
        assert!(extract_note_array(&json!({"rows": []})).is_none());
        assert!(extract_note_array(&json!({"data": null})).is_none());
        assert!(extract_note_array(&json!(17)).is_none());
    }

    #[test]
    fn unwraps_data_enveloped_notes() {
        let enveloped = json!({"data": {"id": "1", "title": "A"}});
        assert_eq!(unwrap_note(&enveloped).get("id").and_then(Value::as_str), Some("1"));

        // a non-object `data` field is not an envelope
        let plain = json!({"id": "2", "data": "blob"});
        assert_eq!(unwrap_note(&plain).get("id").and_then(Value::as_str), Some("2"));
    }

    #[test]
    fn error_message_prefers_message_then_error_fields() {
        let status = StatusCode::UNPROCESSABLE_ENTITY;
        assert_eq!(
            error_message(status, true, r#"{"error":"title too long"}"#),
            "title too long"
        );
        assert_eq!(
            error_message(status, true, r#"{"message":"nope","error":"other"}"#),
            "nope"
        );
        assert_eq!(
            error_message(status, true, r#"{"detail":"ignored"}"#),
            "request failed (status 422)"
        );
    }

    #[test]
    fn error_message_uses_plain_text_bodies() {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(error_message(status, false, "  boom  "), "boom");
        assert_eq!(error_message(status, false, "   "), "request failed (status 500)");
    }
}
