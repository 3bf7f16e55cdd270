//! Parsing of source transcript files.
//!
//! A source file is a JSON object:
//!
//! ```json
//! { "statement": { "<speaker>": "<text>" },
//!   "qna": [ { "question": {"<name>": "<text>"}, "response": {"<name>": "<text>"} } ] }
//! ```
//!
//! and its filename carries the document date as `<prefix><YYYYMMDD>.<ext>`.
//! A bad statement rejects the whole document; a bad QnA entry is dropped
//! and reported while its siblings survive.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One well-formed question/response pair ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QnaEntry {
    pub questioner: String,
    pub question: String,
    pub responder: String,
    pub response: String,
}

/// A QnA entry that was dropped, with its 1-based position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub speaker: String,
    pub content: String,
    pub entries: Vec<QnaEntry>,
    pub skipped: Vec<SkippedEntry>,
}

/// Extracts the calendar date from `<prefix><YYYYMMDD>.<ext>`.
pub fn parse_filename_date(filename: &str) -> Result<NaiveDate> {
    let malformed = |reason: &str| Error::MalformedFilename {
        filename: filename.to_string(),
        reason: reason.to_string(),
    };

    let (stem, ext) = filename
        .rsplit_once('.')
        .ok_or_else(|| malformed("missing extension"))?;
    if ext.is_empty() {
        return Err(malformed("missing extension"));
    }

    let digit_run = stem
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digit_run != 8 {
        return Err(malformed("expected exactly 8 date digits before the extension"));
    }

    let digits = &stem[stem.len() - 8..];
    NaiveDate::parse_from_str(digits, "%Y%m%d")
        .map_err(|_| malformed(&format!("'{}' is not a valid calendar date", digits)))
}

/// Parses and validates a source file body.
pub fn parse_record(body: &str) -> Result<ParsedRecord> {
    let value: Value = serde_json::from_str(body)?;
    let root = value
        .as_object()
        .ok_or_else(|| Error::MalformedRecord("top level must be an object".to_string()))?;

    let statement = match root.get("statement") {
        None | Some(Value::Null) => {
            return Err(Error::MalformedRecord("missing statement".to_string()))
        }
        Some(v) => v,
    };
    let (speaker, content) = single_mapping(statement)
        .map_err(|reason| Error::MalformedRecord(format!("statement: {}", reason)))?;

    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    match root.get("qna") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                match parse_entry(item) {
                    Ok(entry) => entries.push(entry),
                    Err(reason) => skipped.push(SkippedEntry {
                        position: i + 1,
                        reason,
                    }),
                }
            }
        }
        Some(_) => return Err(Error::MalformedRecord("qna must be an array".to_string())),
    }

    Ok(ParsedRecord {
        speaker,
        content,
        entries,
        skipped,
    })
}

fn parse_entry(item: &Value) -> std::result::Result<QnaEntry, String> {
    let obj = item
        .as_object()
        .ok_or_else(|| "entry is not an object".to_string())?;

    let (question, response) = match (obj.get("question"), obj.get("response")) {
        (Some(q), Some(r)) => (q, r),
        _ => return Err("missing question or response".to_string()),
    };

    let (questioner, question) = single_mapping(question).map_err(|e| format!("question: {}", e))?;
    let (responder, response) = single_mapping(response).map_err(|e| format!("response: {}", e))?;

    Ok(QnaEntry {
        questioner,
        question,
        responder,
        response,
    })
}

/// Reads a `{ "<name>": "<text>" }` mapping. Extra keys are ignored in
/// favor of the first one.
fn single_mapping(value: &Value) -> std::result::Result<(String, String), String> {
    let map: &Map<String, Value> = value
        .as_object()
        .ok_or_else(|| "expected a name-to-text mapping".to_string())?;

    let (name, text) = map.iter().next().ok_or_else(|| "empty mapping".to_string())?;
    if map.len() > 1 {
        tracing::warn!(
            keys = map.len(),
            using = %name,
            "mapping has more than one entry, using the first"
        );
    }

    let name = name.trim();
    if name.is_empty() {
        return Err("empty name".to_string());
    }
    let text = text
        .as_str()
        .ok_or_else(|| "text is not a string".to_string())?;
    if text.trim().is_empty() {
        return Err("empty text".to_string());
    }

    Ok((name.to_string(), text.to_string()))
}
