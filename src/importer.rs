//! Reader for Evernote `.enex` export files.
//!
//! Document shape (only the parts that are read):
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <!DOCTYPE en-export SYSTEM "http://xml.evernote.com/pub/evernote-export3.dtd">
//! <en-export export-date="20230115T120000Z" application="Evernote" version="10">
//!   <note>
//!     <title>Hello</title>
//!     <content><![CDATA[<?xml version="1.0"?><en-note><p>Hi</p></en-note>]]></content>
//!     <created>20230101T000000Z</created>
//!     <updated>20230102T000000Z</updated>   <!-- optional -->
//!     <tag>...</tag>                         <!-- ignored -->
//!     <note-attributes>...</note-attributes> <!-- ignored -->
//!     <resource>...</resource>               <!-- ignored -->
//!   </note>
//! </en-export>
//! ```

use crate::error::{ConvertError, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One `<note>` element as it appears in the export, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNote {
    pub title: String,
    /// Raw ENML/HTML body.
    pub content: String,
    /// `YYYYMMDDTHHMMSSZ`
    pub created: String,
    pub updated: Option<String>,
}

// ---------------------------------------------------------------------------
// Note fields
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Title,
    Content,
    Created,
    Updated,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"content" => Some(Self::Content),
            b"created" => Some(Self::Created),
            b"updated" => Some(Self::Updated),
            _ => None,
        }
    }
}

/// Fields collected so far for the `<note>` currently open.
#[derive(Default)]
struct PartialNote {
    title: Option<String>,
    content: Option<String>,
    created: Option<String>,
    updated: Option<String>,
}

impl PartialNote {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Content => &mut self.content,
            Field::Created => &mut self.created,
            Field::Updated => &mut self.updated,
        }
    }

    /// Marks a field as present, even if it ends up empty.
    fn open(&mut self, field: Field) {
        self.slot(field).get_or_insert_with(String::new);
    }

    fn push(&mut self, field: Field, text: &str) {
        self.slot(field).get_or_insert_with(String::new).push_str(text);
    }

    /// `index` is the 1-based position of the note, used in schema errors.
    fn finish(self, index: usize) -> Result<SourceNote> {
        let missing = |field| ConvertError::Schema { index, field };
        let title = self.title.ok_or_else(|| missing("title"))?;
        let content = self.content.ok_or_else(|| missing("content"))?;
        let created = self.created.ok_or_else(|| missing("created"))?;
        // An empty <updated/> carries no timestamp, same as an absent one.
        let updated = self
            .updated
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        Ok(SourceNote {
            title,
            content,
            created: created.trim().to_string(),
            updated,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the export file at `path`.
pub fn read_enex_file(path: &Path) -> Result<Vec<SourceNote>> {
    let file = File::open(path)
        .map_err(|e| ConvertError::io(format!("Failed to open export: {}", path.display()), e))?;
    let notes = read_enex(BufReader::new(file))?;
    log::info!("Read {} notes from {}", notes.len(), path.display());
    Ok(notes)
}

/// Parse an export document. Notes are the `<note>` children of the root
/// element; everything else is skipped.
pub fn read_enex<R: BufRead>(input: R) -> Result<Vec<SourceNote>> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();

    let mut notes = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut current: Option<PartialNote> = None;
    let mut field: Option<Field> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| parse_error(&reader, e))?;

        match event {
            Event::Start(e) => {
                if depth == 0 && saw_root {
                    return Err(parse_error(&reader, "content after root element"));
                }
                depth += 1;
                match depth {
                    1 => saw_root = true,
                    2 if e.local_name().as_ref() == b"note" => {
                        current = Some(PartialNote::default());
                    }
                    3 => {
                        if let Some(note) = current.as_mut() {
                            field = Field::from_tag(e.local_name().as_ref());
                            if let Some(f) = field {
                                note.open(f);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match depth {
                0 if saw_root => {
                    return Err(parse_error(&reader, "content after root element"));
                }
                0 => saw_root = true,
                // <note/>: has none of the required fields
                1 if e.local_name().as_ref() == b"note" => {
                    notes.push(PartialNote::default().finish(notes.len() + 1)?);
                }
                2 => {
                    if let Some(note) = current.as_mut()
                        && let Some(f) = Field::from_tag(e.local_name().as_ref())
                    {
                        note.open(f);
                    }
                }
                _ => {}
            },
            Event::End(_) => {
                match depth {
                    3 => field = None,
                    2 => {
                        if let Some(note) = current.take() {
                            notes.push(note.finish(notes.len() + 1)?);
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if depth == 0 && !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(parse_error(&reader, "text outside the root element"));
                }
                if depth == 3
                    && let (Some(f), Some(note)) = (field, current.as_mut())
                {
                    let text = t.unescape().map_err(|e| parse_error(&reader, e))?;
                    note.push(f, &text);
                }
            }
            Event::CData(c) => {
                if depth == 0 {
                    return Err(parse_error(&reader, "CDATA outside the root element"));
                }
                if depth == 3
                    && let (Some(f), Some(note)) = (field, current.as_mut())
                {
                    let bytes = c.into_inner();
                    let text = std::str::from_utf8(&bytes).map_err(|e| parse_error(&reader, e))?;
                    note.push(f, text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if depth > 0 {
        return Err(parse_error(
            &reader,
            format!("document ended with {depth} unclosed element(s)"),
        ));
    }
    if !saw_root {
        return Err(parse_error(&reader, "document has no root element"));
    }

    log::debug!("Parsed {} note elements", notes.len());
    Ok(notes)
}

fn parse_error<R>(reader: &Reader<R>, message: impl Display) -> ConvertError {
    ConvertError::Parse {
        position: reader.buffer_position(),
        message: message.to_string(),
    }
}
