use crate::utils::{DEFAULT_ARCHIVE, DEFAULT_OUTPUT_DIR, ExportConfig};
use eyre::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Location of the settings file under the platform config directory.
pub const CONFIG_FILE: &str = "evernote-to-laverna/config.toml";

/// Persisted defaults from `config.toml`.
#[derive(Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub archive: Option<PathBuf>,
}

impl FileConfig {
    /// `$XDG_CONFIG_HOME/evernote-to-laverna/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_FILE))
    }

    /// Load `explicit` (which must exist), else the default location if present,
    /// else an empty config.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse config: {}", path.display()))
    }
}

/// Settings given on the command line; `None` defers to the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    pub verbose: bool,
    pub quiet: bool,
}

impl ExportConfig {
    /// Layer command-line overrides over file settings over built-in defaults.
    pub fn resolve(
        enex_path: impl Into<PathBuf>,
        base_dir: impl Into<PathBuf>,
        overrides: Overrides,
        file: FileConfig,
    ) -> Self {
        Self {
            output_dir: overrides
                .output_dir
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            archive_path: overrides
                .archive
                .or(file.archive)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE)),
            verbose: overrides.verbose,
            quiet: overrides.quiet,
            ..Self::new(enex_path, base_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_toml_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "output_dir = \"backup\"\narchive = \"out/notes.zip\"\n").unwrap();

        let cfg = FileConfig::from_file(&path).unwrap();
        assert_eq!(cfg.output_dir, Some(PathBuf::from("backup")));
        assert_eq!(cfg.archive, Some(PathBuf::from("out/notes.zip")));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = FileConfig::load(Some(&tmp.path().join("absent.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "outptu_dir = \"typo\"\n").unwrap();
        assert!(FileConfig::from_file(&path).is_err());
    }

    #[test]
    fn command_line_beats_file_beats_default() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("from-file")),
            archive: Some(PathBuf::from("file.zip")),
        };
        let overrides = Overrides {
            archive: Some(PathBuf::from("cli.zip")),
            quiet: true,
            ..Overrides::default()
        };

        let config = ExportConfig::resolve("in.enex", "/work", overrides, file);
        assert_eq!(config.output_root(), Path::new("/work/from-file"));
        assert_eq!(config.archive_file(), Path::new("/work/cli.zip"));
        assert!(config.quiet && !config.verbose);

        let defaults =
            ExportConfig::resolve("in.enex", "/work", Overrides::default(), FileConfig::default());
        assert_eq!(defaults.output_root(), Path::new("/work/laverna-backup"));
        assert_eq!(defaults.archive_file(), Path::new("/work/laverna.zip"));
    }
}
