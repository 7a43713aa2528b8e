//! ENML (Evernote's XHTML dialect) to Markdown.
//!
//! Every block element ends with a single line break and `<br/>` becomes a
//! hard break (`"  \n"`). An empty paragraph such as `<div><br/></div>` therefore
//! renders as a line holding only the hard-break marker, which
//! [`crate::convert::normalize_blank_lines`] turns into a visible blank line.

use crate::error::{ConvertError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fmt::Display;

/// Elements whose content is dropped entirely.
const SKIPPED: &[&[u8]] = &[b"en-media", b"en-crypt", b"head", b"script", b"style", b"title"];

/// Render a well-formed ENML/XHTML body as Markdown.
///
/// Fails with [`ConvertError::Parse`] when the body is not well-formed XML
/// (plain HTML with unclosed `<br>` and the like).
pub fn to_markdown(enml: &str) -> Result<String> {
    let mut reader = Reader::from_str(enml);
    let mut out = MarkdownWriter::default();
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| parse_error(&reader, e))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                out.open(&e).map_err(|e| parse_error(&reader, e))?;
            }
            Event::Empty(e) => {
                out.open(&e).map_err(|e| parse_error(&reader, e))?;
                out.close(e.local_name().as_ref());
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                out.close(e.local_name().as_ref());
            }
            Event::Text(t) => {
                let text = t
                    .unescape_with(html_entity)
                    .map_err(|e| parse_error(&reader, e))?;
                out.text(&text);
            }
            Event::CData(c) => {
                let bytes = c.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(|e| parse_error(&reader, e))?;
                out.text(text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth > 0 {
        return Err(parse_error(&reader, format!("{depth} unclosed element(s)")));
    }
    Ok(out.finish())
}

fn parse_error<R>(reader: &Reader<R>, message: impl Display) -> ConvertError {
    ConvertError::Parse {
        position: reader.buffer_position(),
        message: message.to_string(),
    }
}

fn is_block(name: &[u8]) -> bool {
    matches!(
        name,
        b"div"
            | b"p"
            | b"li"
            | b"blockquote"
            | b"table"
            | b"tr"
            | b"en-note"
            | b"body"
            | b"center"
            | b"section"
            | b"article"
            | b"header"
            | b"footer"
            | b"dl"
            | b"dt"
            | b"dd"
    ) || heading_level(name).is_some()
}

fn heading_level(name: &[u8]) -> Option<usize> {
    match name {
        [b'h', level @ b'1'..=b'6'] => Some(usize::from(level - b'0')),
        _ => None,
    }
}

fn attr(e: &BytesStart, name: &str) -> std::result::Result<Option<String>, String> {
    match e.try_get_attribute(name).map_err(|e| e.to_string())? {
        Some(a) => Ok(Some(
            a.unescape_value().map_err(|e| e.to_string())?.into_owned(),
        )),
        None => Ok(None),
    }
}

/// HTML named entities ENML declares beyond XML's five.
fn html_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "nbsp" => "\u{a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "bull" => "\u{2022}",
        "hellip" => "\u{2026}",
        "middot" => "\u{b7}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "euro" => "\u{20ac}",
        "pound" => "\u{a3}",
        "yen" => "\u{a5}",
        "cent" => "\u{a2}",
        "sect" => "\u{a7}",
        "deg" => "\u{b0}",
        "plusmn" => "\u{b1}",
        "times" => "\u{d7}",
        "divide" => "\u{f7}",
        "larr" => "\u{2190}",
        "rarr" => "\u{2192}",
        "uarr" => "\u{2191}",
        "darr" => "\u{2193}",
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MarkdownWriter {
    out: String,
    /// `None` for a bullet list, `Some(next)` for an ordered one.
    lists: Vec<Option<usize>>,
    /// Target of each open `<a>`, `None` when it had no `href`.
    links: Vec<Option<String>>,
    pre: usize,
    skip: usize,
}

impl MarkdownWriter {
    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn trim_trailing_spaces(&mut self) {
        let kept = self.out.trim_end_matches(' ').len();
        self.out.truncate(kept);
    }

    /// End the current line unless already at the start of one.
    fn break_line(&mut self) {
        self.trim_trailing_spaces();
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn open(&mut self, e: &BytesStart) -> std::result::Result<(), String> {
        let local = e.local_name();
        let name = local.as_ref();
        if self.skip > 0 || SKIPPED.contains(&name) {
            self.skip += 1;
            return Ok(());
        }

        match name {
            b"br" => {
                self.trim_trailing_spaces();
                self.out.push_str("  \n");
            }
            b"hr" => {
                self.break_line();
                self.out.push_str("* * *\n");
            }
            b"ul" => {
                self.break_line();
                self.lists.push(None);
            }
            b"ol" => {
                self.break_line();
                self.lists.push(Some(1));
            }
            b"li" => {
                self.break_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                self.out.push_str(&indent);
                match self.lists.last_mut() {
                    Some(Some(next)) => {
                        self.out.push_str(&format!("{next}. "));
                        *next += 1;
                    }
                    _ => self.out.push_str("* "),
                }
            }
            b"blockquote" => {
                self.break_line();
                self.out.push_str("> ");
            }
            b"pre" => {
                self.break_line();
                self.out.push_str("```\n");
                self.pre += 1;
            }
            b"code" if self.pre == 0 => self.out.push('`'),
            b"b" | b"strong" => self.out.push_str("**"),
            b"i" | b"em" => self.out.push('_'),
            b"s" | b"strike" | b"del" => self.out.push_str("~~"),
            b"a" => {
                let href = attr(e, "href")?.filter(|h| !h.is_empty());
                if href.is_some() {
                    self.out.push('[');
                }
                self.links.push(href);
            }
            b"img" => {
                if let Some(src) = attr(e, "src")? {
                    let alt = attr(e, "alt")?.unwrap_or_default();
                    self.out.push_str(&format!("![{alt}]({src})"));
                }
            }
            b"en-todo" => {
                let checked = attr(e, "checked")?.is_some_and(|v| v == "true");
                self.out.push_str(if checked { "[x] " } else { "[ ] " });
            }
            b"td" | b"th" => {
                if !self.at_line_start() {
                    self.out.push_str(" | ");
                }
            }
            _ if heading_level(name).is_some() => {
                self.break_line();
                let level = heading_level(name).unwrap_or(1);
                self.out.push_str(&"#".repeat(level));
                self.out.push(' ');
            }
            _ if is_block(name) => self.break_line(),
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        if self.skip > 0 {
            self.skip -= 1;
            return;
        }

        match name {
            b"ul" | b"ol" => {
                self.lists.pop();
                self.break_line();
            }
            b"pre" => {
                if !self.at_line_start() {
                    self.out.push('\n');
                }
                self.out.push_str("```\n");
                self.pre = self.pre.saturating_sub(1);
            }
            b"code" if self.pre == 0 => self.out.push('`'),
            b"b" | b"strong" => self.out.push_str("**"),
            b"i" | b"em" => self.out.push('_'),
            b"s" | b"strike" | b"del" => self.out.push_str("~~"),
            b"a" => {
                if let Some(Some(href)) = self.links.pop() {
                    self.out.push_str(&format!("]({href})"));
                }
            }
            _ if is_block(name) => self.break_line(),
            _ => {}
        }
    }

    /// Append text, collapsing whitespace runs the way a browser does.
    /// Non-breaking spaces are content and survive.
    fn text(&mut self, text: &str) {
        if self.skip > 0 {
            return;
        }
        if self.pre > 0 {
            self.out.push_str(text);
            return;
        }

        let mut pending_space = false;
        for ch in text.chars() {
            if ch.is_whitespace() && ch != '\u{a0}' {
                pending_space = true;
                continue;
            }
            if pending_space && !self.at_line_start() && !self.out.ends_with(' ') {
                self.out.push(' ');
            }
            pending_space = false;
            self.out.push(ch);
        }
        if pending_space && !self.at_line_start() && !self.out.ends_with(' ') {
            self.out.push(' ');
        }
    }

    fn finish(self) -> String {
        self.out.trim_end().trim_start_matches('\n').to_string()
    }
}
