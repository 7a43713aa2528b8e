//! # evernote-to-laverna
//!
//! A CLI tool that converts an [Evernote](https://evernote.com) `.enex` export into a
//! [Laverna](https://laverna.cc) backup archive.
//!
//! ## What it does
//!
//! Evernote exports notes as a single XML document with one `<note>` element per note and
//! the body stored as ENML (an XHTML dialect) inside `<content>`. Laverna restores from a
//! zip of its `notes-db` directory, where every note is a JSON metadata file plus a
//! Markdown body sharing the note id as base name:
//!
//! ```text
//! laverna-backup/
//!   notes-db/
//!     notebooks.json
//!     tags.json
//!     notes/
//!       <id>.json
//!       <id>.md
//! ```
//!
//! Each run is independent: every note gets a freshly generated id, the tree is staged in
//! a temporary directory and only moved into place once every note converted, then the
//! output root is zipped.
//!
//! ## Usage
//!
//! ```sh
//! # Convert into ./laverna-backup and ./laverna.zip
//! evernote-to-laverna My\ Notes.enex
//!
//! # Custom output locations
//! evernote-to-laverna export.enex --output-dir /tmp/laverna --archive /tmp/laverna.zip
//! ```
//!
//! Preferences can be persisted in `~/.config/evernote-to-laverna/config.toml`.

pub mod archive;
pub mod config;
pub mod convert;
pub mod enml;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod sequential;
pub mod utils;

pub use error::{ConvertError, Result};
