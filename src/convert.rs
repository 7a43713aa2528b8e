use crate::enml;
use crate::error::{ConvertError, Result};
use crate::importer::SourceNote;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Value of the `type` discriminator on every Laverna note.
pub const NOTE_TYPE: &str = "notes";
/// Notebook id Laverna uses for notes outside any notebook.
pub const UNFILED_NOTEBOOK: &str = "0";

/// Length of an Evernote timestamp such as `20230115T120000Z`.
const ENEX_TIMESTAMP_LEN: usize = 15;

/// A note in Laverna's `notes-db` shape.
///
/// Serializes to the metadata document; field declaration order is the key
/// order Laverna writes, so it must not be rearranged. `body` goes to the
/// sibling `.md` file and is not part of the JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LavernaNote {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub task_all: u32,
    pub task_completed: u32,
    #[serde(rename = "created")]
    pub created_ms: i64,
    #[serde(rename = "updated", skip_serializing_if = "Option::is_none")]
    pub updated_ms: Option<i64>,
    pub notebook_id: &'static str,
    pub tags: Vec<String>,
    pub is_favorite: u8,
    pub trash: u8,
    pub files: Vec<String>,
    pub tasks: Vec<String>,
    #[serde(skip)]
    pub body: String,
}

impl LavernaNote {
    /// Map `source` onto a note with the given id. Fails only on a bad timestamp.
    pub fn from_source(source: &SourceNote, id: Uuid) -> Result<Self> {
        let created_ms = parse_enex_timestamp(&source.created)?;
        let updated_ms = source
            .updated
            .as_deref()
            .map(parse_enex_timestamp)
            .transpose()?;

        Ok(Self {
            id: id.to_string(),
            kind: NOTE_TYPE,
            title: source.title.clone(),
            task_all: 0,
            task_completed: 0,
            created_ms,
            updated_ms,
            notebook_id: UNFILED_NOTEBOOK,
            tags: Vec::new(),
            is_favorite: 0,
            trash: 0,
            files: Vec::new(),
            tasks: Vec::new(),
            body: render_body(&source.content),
        })
    }
}

/// Map `source` onto a Laverna note with a fresh time-ordered id.
pub fn to_laverna_note(source: &SourceNote) -> Result<LavernaNote> {
    LavernaNote::from_source(source, Uuid::now_v7())
}

/// Convert `YYYYMMDDTHHMMSSZ` (always UTC) to milliseconds since the Unix epoch.
pub fn parse_enex_timestamp(value: &str) -> Result<i64> {
    let invalid = || ConvertError::DateFormat {
        value: value.to_string(),
    };

    let bytes = value.as_bytes();
    let well_formed = bytes.len() == ENEX_TIMESTAMP_LEN
        && bytes[8] == b'T'
        && bytes[14] == b'Z'
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[9..14].iter().all(u8::is_ascii_digit);
    if !well_formed {
        return Err(invalid());
    }

    // All sliced ranges are ASCII digits at this point.
    let num = |range: std::ops::Range<usize>| value[range].parse::<u32>().map_err(|_| invalid());
    let year = num(0..4)? as i32;
    let (month, day) = (num(4..6)?, num(6..8)?);
    let (hour, minute, second) = (num(9..11)?, num(11..13)?, num(13..15)?);

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(invalid)
}

/// Render an ENML/HTML body as Markdown ready for Laverna.
///
/// Bodies that are not well-formed XHTML go through a lenient HTML converter
/// instead; that path loses empty paragraphs.
pub fn render_body(content: &str) -> String {
    let markdown = enml::to_markdown(content).unwrap_or_else(|err| {
        log::warn!("Body is not well-formed ENML ({err}); using HTML conversion");
        html2md::parse_html(content)
    });
    normalize_blank_lines(&markdown)
}

/// Rewrite every `"\n  \n"` (a blank line holding only a hard-break marker)
/// as `"\n\u{a0}"`, so Laverna's renderer keeps the empty paragraph.
///
/// Idempotent: the replacement never contains the pattern.
pub fn normalize_blank_lines(text: &str) -> String {
    text.replace("\n  \n", "\n\u{a0}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(created: &str, updated: Option<&str>) -> SourceNote {
        SourceNote {
            title: "Hello".to_string(),
            content: "<p>Hi</p>".to_string(),
            created: created.to_string(),
            updated: updated.map(str::to_string),
        }
    }

    #[test]
    fn converts_timestamps_to_epoch_millis() {
        assert_eq!(parse_enex_timestamp("20230115T120000Z").unwrap(), 1_673_784_000_000);
        assert_eq!(parse_enex_timestamp("20230101T000000Z").unwrap(), 1_672_531_200_000);
        assert_eq!(parse_enex_timestamp("19700101T000001Z").unwrap(), 1_000);
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for bad in [
            "",
            "2023-01-15T12:00:00Z",
            "20230115T120000",
            "20230115 120000Z",
            "20230115T12000aZ",
            "20230115T120000Z ",
            "+0230115T120000Z",
        ] {
            assert!(
                matches!(parse_enex_timestamp(bad), Err(ConvertError::DateFormat { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_impossible_dates() {
        for bad in [
            "20230230T000000Z",
            "20231301T000000Z",
            "20230100T000000Z",
            "20230101T240000Z",
            "20230101T006000Z",
            "20230101T000060Z",
        ] {
            assert!(parse_enex_timestamp(bad).is_err(), "accepted {bad:?}");
        }
        assert!(parse_enex_timestamp("20240229T000000Z").is_ok());
    }

    #[test]
    fn normalization_replaces_hard_break_blank_lines() {
        assert_eq!(normalize_blank_lines("a\n  \nb"), "a\n\u{a0}b");
        assert_eq!(normalize_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn normalization_is_idempotent() {
        for text in ["a\n  \nb", "a\n  \n  \n  \nb", "\n  \n", "plain"] {
            let once = normalize_blank_lines(text);
            assert_eq!(normalize_blank_lines(&once), once);
        }
    }

    #[test]
    fn blank_paragraph_survives_rendering() {
        let with_blank = render_body("<div>a</div><div><br/></div><div>b</div>");
        assert_eq!(with_blank, "a\n\u{a0}b");
        assert_ne!(with_blank, render_body("<div>a</div><div>b</div>"));
    }

    #[test]
    fn repeated_blank_paragraphs_stay_visible() {
        let body = render_body(
            "<div>a</div><div><br/></div><div><br/></div><div><br/></div><div>b</div>",
        );
        assert_eq!(body, "a\n\u{a0}  \n\u{a0}b");
        assert_eq!(body.matches('\u{a0}').count(), 2);
        assert_eq!(normalize_blank_lines(&body), body);
    }

    #[test]
    fn consecutive_line_breaks_keep_a_blank_line() {
        let body = render_body("a<br/><br/><br/>b");
        assert!(body.contains('\u{a0}'), "{body:?}");
        assert!(body.starts_with('a') && body.ends_with('b'));
    }

    #[test]
    fn plain_html_falls_back_to_lenient_conversion() {
        let body = render_body("<p>first<br>second</p>");
        assert!(body.contains("first") && body.contains("second"), "{body:?}");
        assert!(!body.contains("<br>"));
    }

    #[test]
    fn fills_laverna_defaults() {
        let id = Uuid::now_v7();
        let note = LavernaNote::from_source(&source("20230101T000000Z", None), id).unwrap();

        assert_eq!(note.id, id.to_string());
        assert_eq!(note.kind, "notes");
        assert_eq!(note.title, "Hello");
        assert_eq!(note.created_ms, 1_672_531_200_000);
        assert_eq!(note.updated_ms, None);
        assert_eq!(note.notebook_id, "0");
        assert!(note.tags.is_empty() && note.files.is_empty() && note.tasks.is_empty());
        assert_eq!((note.task_all, note.task_completed), (0, 0));
        assert_eq!((note.is_favorite, note.trash), (0, 0));
        assert!(note.body.contains("Hi"));
        assert!(!note.body.contains("<p>"));
    }

    #[test]
    fn metadata_keys_follow_laverna_order() {
        let note = LavernaNote::from_source(
            &source("20230101T000000Z", Some("20230102T000000Z")),
            Uuid::nil(),
        )
        .unwrap();
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"id":"00000000-0000-0000-0000-000000000000","type":"notes","title":"Hello","#,
                r#""taskAll":0,"taskCompleted":0,"created":1672531200000,"updated":1672617600000,"#,
                r#""notebookId":"0","tags":[],"isFavorite":0,"trash":0,"files":[],"tasks":[]}"#
            )
        );
    }

    #[test]
    fn updated_key_is_omitted_without_source_timestamp() {
        let note = to_laverna_note(&source("20230101T000000Z", None)).unwrap();
        let value = serde_json::to_value(&note).unwrap();
        assert!(value.get("updated").is_none());
        assert!(value.get("body").is_none());
    }

    #[test]
    fn bad_updated_timestamp_fails_the_note() {
        let result = to_laverna_note(&source("20230101T000000Z", Some("yesterday")));
        assert!(matches!(result, Err(ConvertError::DateFormat { value }) if value == "yesterday"));
    }

    #[test]
    fn fresh_ids_are_unique() {
        let src = source("20230101T000000Z", None);
        let ids: std::collections::HashSet<String> = (0..500)
            .map(|_| to_laverna_note(&src).unwrap().id)
            .collect();
        assert_eq!(ids.len(), 500);
    }
}
