use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Horizontal,
    Vertical,
}

/// Display defaults read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub show_opcodes: bool,
    pub adaptive: bool,
    pub show_ast: bool,
    pub layout: Layout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_opcodes: false,
            adaptive: false,
            show_ast: true,
            layout: Layout::default(),
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("DISVIEW_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|d| d.join("disview")))
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        match config_dir() {
            Some(dir) => Self::load_from(&dir.join(CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No config file at {}", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", text).unwrap();
        file
    }

    #[rstest]
    #[case::empty("", Config::default())]
    #[case::partial("adaptive = true", Config { adaptive: true, ..Default::default() })]
    #[case::full(
        "show_opcodes = true\nadaptive = true\nshow_ast = false\nlayout = \"vertical\"",
        Config { show_opcodes: true, adaptive: true, show_ast: false, layout: Layout::Vertical }
    )]
    fn test_load_from(#[case] text: &str, #[case] expected: Config) {
        let file = write_config(text);
        assert_eq!(Config::load_from(file.path()).unwrap(), expected);
    }

    #[rstest]
    #[case::bad_type("adaptive = 1")]
    #[case::bad_layout("layout = \"diagonal\"")]
    #[case::unknown_key("colour = true")]
    #[case::not_toml("show_ast = ")]
    fn test_load_from_malformed(#[case] text: &str) {
        let file = write_config(text);
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap(),
            Config::default()
        );
    }
}
