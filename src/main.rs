use clap::Parser;
use evernote_to_laverna::config::{FileConfig, Overrides};
use evernote_to_laverna::sequential;
use evernote_to_laverna::utils::ExportConfig;
use eyre::{Context, Result, eyre};
use std::path::PathBuf;

/// Convert an Evernote .enex export into a Laverna backup archive.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Evernote export file (.enex).
    #[arg(value_name = "ENEX_FILE")]
    enex_file: PathBuf,

    /// Directory the Laverna notes-db tree is written to.
    /// Defaults to ./laverna-backup if not set in config.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Path of the zip archive to create.
    /// Defaults to ./laverna.zip if not set in config.
    #[arg(long, value_name = "PATH")]
    archive: Option<PathBuf>,

    /// Directory relative paths and archive entry names are resolved against.
    /// Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/evernote-to-laverna/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print each note as it is converted.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress standard output (progress bar and summary).
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // 1. Load config file (CLI path > default path)
    let file_cfg = FileConfig::load(cli.config.as_deref())?;

    // 2. Resolve the base directory once; everything relative hangs off it
    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir().wrap_err("Failed to determine current directory")?,
    };

    // 3. Layer CLI > Config > Default
    let overrides = Overrides {
        output_dir: cli.output_dir,
        archive: cli.archive,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    let config = ExportConfig::resolve(cli.enex_file, base_dir, overrides, file_cfg);

    if !config.export_file().exists() {
        return Err(eyre!(
            "Export file not found: {}",
            config.export_file().display()
        ));
    }

    sequential::execute(&config)?;
    Ok(())
}
