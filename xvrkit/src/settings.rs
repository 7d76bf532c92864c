use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SettingsError;

/// Environment variable that overrides [`Settings::program`].
pub const PROGRAM_ENV: &str = "XVR_PROGRAM";

/// Front-end settings shared by every command.
///
/// Read from a JSON file when one is given; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Executable of the external registration/training tool.
    pub program: String,
    /// Run the tool under `script -q /dev/null` so it sees a terminal and draws
    /// its progress bar on a single line.
    pub pty_wrapper: bool,
    /// Extra environment variables for the child process.
    pub env: BTreeMap<String, String>,
    /// Default location of input volumes and X-rays.
    pub data_dir: PathBuf,
    /// Default location of model checkpoints and training output.
    pub model_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let home = env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut env = BTreeMap::new();
        env.insert("PYTORCH_ENABLE_MPS_FALLBACK".to_string(), "1".to_string());
        Settings {
            program: "xvr".to_string(),
            pty_wrapper: false,
            env,
            data_dir: home.join("xvr_data"),
            model_dir: home.join("xvr_models"),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or the defaults when `path` is `None`, then
    /// applies the `XVR_PROGRAM` override.
    pub fn load(path: Option<&Path>) -> Result<Settings, SettingsError> {
        let mut settings = match path {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        if let Ok(program) = env::var(PROGRAM_ENV) {
            if !program.is_empty() {
                debug!("{} overrides program with {}", PROGRAM_ENV, program);
                settings.program = program;
            }
        }
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Settings, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_enable_mps_fallback() {
        let settings = Settings::default();
        assert_eq!(settings.program, "xvr");
        assert!(!settings.pty_wrapper);
        assert_eq!(
            settings.env.get("PYTORCH_ENABLE_MPS_FALLBACK").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pty_wrapper": true, "data_dir": "/data"}}"#).unwrap();
        let settings = Settings::from_file(file.path()).unwrap();
        assert!(settings.pty_wrapper);
        assert_eq!(settings.data_dir, PathBuf::from("/data"));
        assert_eq!(settings.program, "xvr");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pty_wrapper": "sometimes"}}"#).unwrap();
        assert!(matches!(
            Settings::from_file(file.path()),
            Err(SettingsError::Parse { .. })
        ));
    }
}
