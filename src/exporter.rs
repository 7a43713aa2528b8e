use crate::convert::LavernaNote;
use crate::error::{ConvertError, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const NOTES_DB_DIR: &str = "notes-db";
pub const NOTES_DIR: &str = "notes";
pub const NOTEBOOKS_FILE: &str = "notebooks.json";
pub const TAGS_FILE: &str = "tags.json";

/// Paths of the two files written for one note.
#[derive(Debug, Clone)]
pub struct NoteFiles {
    pub metadata: PathBuf,
    pub body: PathBuf,
}

pub fn notes_dir(root: &Path) -> PathBuf {
    root.join(NOTES_DB_DIR).join(NOTES_DIR)
}

/// Lay out `root/notes-db/notes` and write the empty notebook and tag
/// collections. Safe to call on an existing tree.
pub fn create_skeleton(root: &Path) -> Result<PathBuf> {
    let notes = notes_dir(root);
    fs::create_dir_all(&notes).map_err(|e| {
        ConvertError::io(
            format!("Failed to create notes directory: {}", notes.display()),
            e,
        )
    })?;

    let db_dir = root.join(NOTES_DB_DIR);
    let empty: &[String] = &[];
    for name in [NOTEBOOKS_FILE, TAGS_FILE] {
        write_file(&db_dir.join(name), |w| write_json(w, empty))?;
    }

    log::debug!("Created skeleton under {}", root.display());
    Ok(notes)
}

/// Write `<id>.json` and `<id>.md` for `note` into `dir`, creating `dir` if needed.
pub fn write_note(note: &LavernaNote, dir: &Path) -> Result<NoteFiles> {
    fs::create_dir_all(dir).map_err(|e| {
        ConvertError::io(format!("Failed to create directory: {}", dir.display()), e)
    })?;

    let files = NoteFiles {
        metadata: dir.join(format!("{}.json", note.id)),
        body: dir.join(format!("{}.md", note.id)),
    };
    write_file(&files.metadata, |w| write_json(w, note))?;
    write_file(&files.body, |w| w.write_all(note.body.as_bytes()))?;

    log::debug!("Wrote note {} ({:?})", note.id, note.title);
    Ok(files)
}

fn write_json<W, T>(writer: &mut W, value: &T) -> std::io::Result<()>
where
    W: Write,
    T: serde::Serialize + ?Sized,
{
    serde_json::to_writer(writer, value).map_err(std::io::Error::other)
}

/// Create `path` and fill it through `render`. The handle is closed on every
/// return path; a failed write leaves the partial file behind for the caller's
/// staging directory to discard.
fn write_file<F>(path: &Path, render: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path)
        .map_err(|e| ConvertError::io(format!("Failed to create: {}", path.display()), e))?;
    let mut writer = BufWriter::new(file);

    render(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| ConvertError::io(format!("Failed to write: {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::SourceNote;
    use uuid::Uuid;

    fn note() -> LavernaNote {
        let source = SourceNote {
            title: "Hello".to_string(),
            content: "<p>Hi</p>".to_string(),
            created: "20230101T000000Z".to_string(),
            updated: None,
        };
        LavernaNote::from_source(&source, Uuid::now_v7()).unwrap()
    }

    #[test]
    fn skeleton_has_empty_collections() {
        let tmp = tempfile::tempdir().unwrap();
        let notes = create_skeleton(tmp.path()).unwrap();

        assert!(notes.is_dir());
        assert_eq!(notes, tmp.path().join("notes-db/notes"));
        for name in ["notebooks.json", "tags.json"] {
            let text = fs::read_to_string(tmp.path().join("notes-db").join(name)).unwrap();
            assert_eq!(text, "[]");
        }
    }

    #[test]
    fn skeleton_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        create_skeleton(tmp.path()).unwrap();
        create_skeleton(tmp.path()).unwrap();
        assert!(notes_dir(tmp.path()).is_dir());
    }

    #[test]
    fn writes_sibling_files_named_by_id() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/notes");
        let note = note();

        let files = write_note(&note, &dir).unwrap();
        assert_eq!(files.metadata, dir.join(format!("{}.json", note.id)));
        assert_eq!(files.body, dir.join(format!("{}.md", note.id)));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&files.metadata).unwrap()).unwrap();
        assert_eq!(json["id"], note.id.as_str());
        assert_eq!(json["title"], "Hello");
        assert_eq!(fs::read_to_string(&files.body).unwrap(), note.body);
    }

    #[test]
    fn unwritable_target_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let result = write_note(&note(), &blocker.join("notes"));
        assert!(matches!(result, Err(ConvertError::Io { .. })));
    }
}
