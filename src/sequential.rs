use crate::utils::{self, ExportConfig};
use crate::{archive, convert, exporter, importer};
use eyre::{Context, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::PathBuf;

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub notes: usize,
    pub archived_files: usize,
    pub output_root: PathBuf,
    pub archive_path: PathBuf,
}

/// The main entry point for the conversion.
/// Reads the export, converts and writes every note into a staging tree, moves
/// the tree into the output root and zips it. The first failure aborts the run
/// before anything reaches the output root.
pub fn execute(config: &ExportConfig) -> Result<ExportReport> {
    let export_file = config.export_file();
    let output_root = config.output_root();
    let archive_path = config.archive_file();

    let notes = importer::read_enex_file(&export_file)
        .wrap_err_with(|| format!("Failed to read export: {}", export_file.display()))?;

    let pb = progress_bar(notes.len() as u64, config.quiet)?;
    if !config.quiet {
        pb.println(format!("Found {} notes.", notes.len()));
    }

    let staging = utils::create_staging(&output_root)?;
    let notes_dir = exporter::create_skeleton(staging.path())
        .wrap_err("Failed to create notes-db skeleton")?;

    let mut issued: HashSet<String> = HashSet::with_capacity(notes.len());
    for (i, source) in notes.iter().enumerate() {
        let position = i + 1;
        let note = convert::to_laverna_note(source).wrap_err_with(|| {
            format!("Failed to convert note #{} ({:?})", position, source.title)
        })?;
        if !issued.insert(note.id.clone()) {
            return Err(eyre!(
                "Duplicate note id {} generated for note #{} ({:?})",
                note.id,
                position,
                source.title
            ));
        }

        exporter::write_note(&note, &notes_dir).wrap_err_with(|| {
            format!("Failed to write note #{} ({:?})", position, source.title)
        })?;

        if config.verbose {
            pb.println(format!("Converted: {} -> {}.json", source.title, note.id));
        }
        pb.inc(1);
    }

    utils::commit_staging(staging, &output_root)
        .wrap_err_with(|| format!("Failed to populate {}", output_root.display()))?;

    let archived_files = archive::create_archive(&output_root, &config.base_dir, &archive_path)
        .wrap_err_with(|| format!("Failed to create archive: {}", archive_path.display()))?;

    pb.finish_and_clear();

    if !config.quiet {
        eprintln!(
            "Done. {} notes converted, {} files archived into {}.",
            notes.len(),
            archived_files,
            archive_path.display()
        );
    }

    Ok(ExportReport {
        notes: notes.len(),
        archived_files,
        output_root,
        archive_path,
    })
}

fn progress_bar(total: u64, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
        )
        .wrap_err("Invalid progress bar template")?
        .progress_chars("=>-"),
    );
    Ok(bar)
}
