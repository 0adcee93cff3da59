//! Configuration sources and lookup helpers.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};

/// A key/value store settings are read from.
pub trait ConfigSource {
    /// Returns the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads configuration from the process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// What happened when a `.env` file was looked up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DotenvStatus {
    /// The file was found and merged into the environment.
    Loaded(PathBuf),
    /// No file was found.
    NotFound,
    /// The file exists but could not be read or parsed. Lines before the
    /// failure may already have been applied.
    Invalid(String),
}

impl DotenvStatus {
    fn from_result(result: dotenvy::Result<PathBuf>) -> Self {
        match result {
            Ok(path) => Self::Loaded(path),
            Err(err) if err.not_found() => Self::NotFound,
            Err(err) => Self::Invalid(err.to_string()),
        }
    }

    /// Reports the outcome through `tracing`; a broken file is a warning.
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => debug!(path = %path.display(), "loaded .env file"),
            Self::NotFound => debug!("no .env file found"),
            Self::Invalid(err) => warn!(error = %err, "ignoring malformed .env file"),
        }
    }
}

impl fmt::Display for DotenvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(path) => write!(f, "loaded {}", path.display()),
            Self::NotFound => f.write_str("no .env file found"),
            Self::Invalid(err) => write!(f, "malformed .env file: {err}"),
        }
    }
}

/// Loads a `.env` file from the working directory or one of its ancestors.
///
/// Variables already present in the environment are left untouched. Nothing
/// is logged here, since this usually runs before a subscriber exists; call
/// [`DotenvStatus::log`] once one does.
#[must_use]
pub fn load_dotenv() -> DotenvStatus {
    DotenvStatus::from_result(dotenvy::dotenv())
}

/// Loads the `.env` file at `path`, with the same rules as [`load_dotenv`].
#[must_use]
pub fn load_dotenv_from(path: impl AsRef<Path>) -> DotenvStatus {
    let path = path.as_ref();
    DotenvStatus::from_result(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

/// Returns the trimmed value for `key`, treating empty values as absent.
pub fn optional(source: &impl ConfigSource, key: &str) -> Option<String> {
    source
        .get(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Returns the value for `key` or fails when it is absent.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] if the key is absent or empty.
pub fn required(source: &impl ConfigSource, key: &str) -> ConfigResult<String> {
    optional(source, key).ok_or_else(|| ConfigError::Missing {
        key: key.to_owned(),
    })
}

/// Parses the value for `key`, falling back to `default` when absent.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the value is present but does not parse.
pub fn parse_or<T>(source: &impl ConfigSource, key: &str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(source, key) {
        Some(raw) => raw
            .parse()
            .map_err(|err: T::Err| ConfigError::invalid(key, format!("`{raw}`: {err}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn optional_trims_and_drops_empty() {
        let src = source(&[("A", "  value "), ("B", "   ")]);
        assert_eq!(optional(&src, "A").as_deref(), Some("value"));
        assert_eq!(optional(&src, "B"), None);
        assert_eq!(optional(&src, "C"), None);
    }

    #[test]
    fn required_reports_key() {
        let err = required(&source(&[]), "OPENAI_API_KEY").expect_err("missing");
        assert_eq!(
            err,
            ConfigError::Missing {
                key: "OPENAI_API_KEY".to_owned()
            }
        );
    }

    #[test]
    fn parse_or_uses_default_and_rejects_garbage() {
        let src = source(&[("TIMEOUT", "250"), ("BAD", "soon")]);
        assert_eq!(parse_or(&src, "TIMEOUT", 10_u64).unwrap(), 250);
        assert_eq!(parse_or(&src, "MISSING", 10_u64).unwrap(), 10);

        let err = parse_or(&src, "BAD", 10_u64).expect_err("not a number");
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "BAD"));
    }

    #[test]
    fn dotenv_file_is_merged_into_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "AGENT_CONFIG_DOTENV_MERGED=from-file\n").unwrap();

        assert_eq!(load_dotenv_from(&path), DotenvStatus::Loaded(path.clone()));
        assert_eq!(
            optional(&ProcessEnv, "AGENT_CONFIG_DOTENV_MERGED").as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn missing_dotenv_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let status = load_dotenv_from(dir.path().join(".env"));
        assert_eq!(status, DotenvStatus::NotFound);
    }

    #[test]
    fn malformed_dotenv_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "this is not a pair\n").unwrap();

        let status = load_dotenv_from(&path);
        assert!(matches!(status, DotenvStatus::Invalid(_)), "{status:?}");
        assert!(status.to_string().starts_with("malformed .env file"));
    }
}
