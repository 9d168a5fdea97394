//! The on-disk textual wrapper: a delimited header of key-value pairs
//! followed by the body, human-inspectable with any editor or `cat`.
//!
//! ```text
//! ---
//! id: 1732999999000-ab12cd34
//! created: 2025-01-01T00:00:00Z
//! updated: 2025-01-01T00:00:00Z
//! project_id: default
//! scope: project
//! status: active
//! importance: 0.50
//! confidence: 0.50
//! tags: dark-mode,ui
//! source_session_id: sess-1
//! schema_version: 1
//! ---
//! the body text follows, unbounded, to end of file
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::record::{Memory, Scope, Status};
use crate::constants::defaults;
use crate::error::{Error, Result};

const HEADER_DELIMITER: &str = "---";
const KNOWN_FIELDS: &[&str] = &[
    "id",
    "created",
    "updated",
    "project_id",
    "scope",
    "status",
    "importance",
    "confidence",
    "tags",
    "source_session_id",
    "schema_version",
];

/// Renders a [`Memory`] into the header+body textual format.
#[must_use]
pub fn render(memory: &Memory) -> String {
    let mut out = String::new();
    out.push_str(HEADER_DELIMITER);
    out.push('\n');
    out.push_str(&format!("id: {}\n", memory.id));
    out.push_str(&format!("created: {}\n", memory.created.to_rfc3339()));
    out.push_str(&format!("updated: {}\n", memory.updated.to_rfc3339()));
    out.push_str(&format!("project_id: {}\n", memory.project_id));
    out.push_str(&format!("scope: {}\n", memory.scope));
    out.push_str(&format!("status: {}\n", memory.status));
    out.push_str(&format!("importance: {:.6}\n", memory.importance));
    out.push_str(&format!("confidence: {:.6}\n", memory.confidence));
    out.push_str(&format!(
        "tags: {}\n",
        memory.tags.iter().cloned().collect::<Vec<_>>().join(",")
    ));
    out.push_str(&format!(
        "source_session_id: {}\n",
        memory.source_session_id.as_deref().unwrap_or("")
    ));
    out.push_str(&format!("schema_version: {}\n", memory.schema_version));
    for (key, value) in &memory.unknown_fields {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out.push_str(HEADER_DELIMITER);
    out.push('\n');
    out.push_str(&memory.content);
    out
}

/// Parses the header+body textual format produced by [`render`].
///
/// # Errors
///
/// Returns [`Error::CorruptRecord`] if the delimiters or required header
/// fields are missing or malformed.
pub fn parse(id_hint: &str, text: &str) -> Result<Memory> {
    let corrupt = |reason: &str| Error::CorruptRecord {
        id: id_hint.to_string(),
        reason: reason.to_string(),
    };

    let mut lines = text.lines();
    let first = lines.next().ok_or_else(|| corrupt("empty file"))?;
    if first.trim() != HEADER_DELIMITER {
        return Err(corrupt("missing opening header delimiter"));
    }

    let mut fields = BTreeMap::new();
    let mut header_closed = false;
    let mut body_lines: Vec<&str> = Vec::new();
    for line in lines.by_ref() {
        if line.trim() == HEADER_DELIMITER {
            header_closed = true;
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(corrupt(&format!("malformed header line: {line:?}")));
        };
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }
    if !header_closed {
        return Err(corrupt("missing closing header delimiter"));
    }
    body_lines.extend(lines);
    let content = body_lines.join("\n");

    let id = fields
        .get("id")
        .cloned()
        .ok_or_else(|| corrupt("missing id field"))?;
    let created = parse_timestamp(&fields, "created", &corrupt)?;
    let updated = parse_timestamp(&fields, "updated", &corrupt)?;
    let project_id = fields
        .get("project_id")
        .cloned()
        .unwrap_or_else(|| "default".to_string());
    let scope = fields
        .get("scope")
        .map(|s| Scope::from_str(s))
        .transpose()
        .map_err(|e| corrupt(&e))?
        .unwrap_or(Scope::Project);
    let status = fields
        .get("status")
        .map(|s| Status::from_str(s))
        .transpose()
        .map_err(|e| corrupt(&e))?
        .unwrap_or(Status::Active);
    let importance = parse_float(&fields, "importance", 0.0, &corrupt)?;
    let confidence = parse_float(&fields, "confidence", 0.0, &corrupt)?;
    let tags: BTreeSet<String> = fields
        .get("tags")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let source_session_id = fields
        .get("source_session_id")
        .filter(|s| !s.is_empty())
        .cloned();
    let schema_version = fields
        .get("schema_version")
        .map(|s| s.parse::<u32>())
        .transpose()
        .map_err(|_| corrupt("schema_version is not an integer"))?
        .unwrap_or(defaults::SCHEMA_VERSION);

    let unknown_fields = fields
        .into_iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .collect();

    Ok(Memory {
        id,
        content,
        created,
        updated,
        project_id,
        scope,
        status,
        importance,
        confidence,
        tags,
        source_session_id,
        schema_version,
        unknown_fields,
    })
}

fn parse_timestamp(
    fields: &BTreeMap<String, String>,
    key: &str,
    corrupt: &dyn Fn(&str) -> Error,
) -> Result<DateTime<Utc>> {
    let raw = fields
        .get(key)
        .ok_or_else(|| corrupt(&format!("missing {key} field")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupt(&format!("{key} is not a valid RFC3339 timestamp")))
}

fn parse_float(
    fields: &BTreeMap<String, String>,
    key: &str,
    default: f64,
    corrupt: &dyn Fn(&str) -> Error,
) -> Result<f64> {
    match fields.get(key) {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| corrupt(&format!("{key} is not a number"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Memory {
        let now = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Memory::new(
            "abc-123".into(),
            "line one\nline two".into(),
            "proj".into(),
            Scope::Project,
            0.8,
            0.9,
            ["dark-mode".to_string(), "ui".to_string()].into_iter().collect(),
            Some("sess-1".into()),
            now,
        )
    }

    #[test]
    fn round_trips() {
        let memory = sample();
        let text = render(&memory);
        let parsed = parse(&memory.id, &text).expect("parse");
        assert_eq!(parsed, memory);
    }

    #[test]
    fn preserves_unknown_fields_across_round_trip() {
        let mut memory = sample();
        memory
            .unknown_fields
            .insert("future_field".into(), "some-value".into());
        let text = render(&memory);
        let parsed = parse(&memory.id, &text).expect("parse");
        assert_eq!(
            parsed.unknown_fields.get("future_field"),
            Some(&"some-value".to_string())
        );
    }

    #[test]
    fn rejects_missing_delimiters() {
        let err = parse("x", "no header here").unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
    }

    #[test]
    fn rejects_unclosed_header() {
        let text = "---\nid: x\ncreated: 2025-01-01T00:00:00Z\n";
        let err = parse("x", text).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
    }

    #[test]
    fn defaults_absent_optional_fields() {
        let text = "---\nid: x\ncreated: 2025-01-01T00:00:00Z\nupdated: 2025-01-01T00:00:00Z\n---\nbody";
        let memory = parse("x", text).expect("parse");
        assert_eq!(memory.project_id, "default");
        assert_eq!(memory.scope, Scope::Project);
        assert_eq!(memory.status, Status::Active);
        assert!(memory.tags.is_empty());
        assert!(memory.source_session_id.is_none());
    }
}
