//! `trxlink init`: write a default `trxlink.toml`.
//!
//! The file lists every section with its default value so that a board
//! bring-up starts from an explicit, editable description of the link.

use std::fs;
use std::path::{Path, PathBuf};

use trxlink_config::{LinkConfig, CONFIG_FILE_NAME};

use crate::GlobalArgs;

const HEADER: &str = "\
# Transceiver link bridge configuration.
#
# Clocks are frequency strings, delay taps are 0..=31 and eye windows are
# inclusive [lo, hi] tap ranges of the simulated transceiver.

";

/// Runs the `trxlink init` command.
///
/// Creates `dir` if needed and refuses to overwrite an existing file.
/// Returns exit code 0 on success.
pub fn run(dir: Option<String>, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let dir = match dir {
        Some(d) => PathBuf::from(d),
        None => std::env::current_dir()?,
    };
    let path = write_default_config(&dir)?;
    if !global.quiet {
        eprintln!("     Created {}", path.display());
    }
    Ok(0)
}

/// Writes the default configuration into `dir`, returning the file path.
pub fn write_default_config(dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(format!("'{}' already exists", path.display()).into());
    }
    fs::create_dir_all(dir)?;
    fs::write(&path, default_config_text()?)?;
    Ok(path)
}

fn default_config_text() -> Result<String, toml::ser::Error> {
    let body = toml::to_string_pretty(&LinkConfig::default())?;
    Ok(format!("{HEADER}{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_round_trips() {
        let text = default_config_text().unwrap();
        let parsed = trxlink_config::load_config_from_str(&text).unwrap();
        assert_eq!(parsed, LinkConfig::default());
    }

    #[test]
    fn default_config_lists_sections() {
        let text = default_config_text().unwrap();
        for section in ["[clocks]", "[transport]", "[bridge]", "[polarity]", "[transceiver]", "[scan]"] {
            assert!(text.contains(section), "missing {section}");
        }
    }

    #[test]
    fn writes_into_new_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("board");
        let path = write_default_config(&dir).unwrap();
        assert_eq!(path, dir.join(CONFIG_FILE_NAME));
        assert!(path.is_file());
    }

    #[test]
    fn refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "# mine\n").unwrap();
        let err = write_default_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        let kept = fs::read_to_string(tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(kept, "# mine\n");
    }
}
