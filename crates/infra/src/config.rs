//! Configuration loading: TOML file plus environment overrides.
//!
//! ## Environment overrides
//!
//! A variable named `<PREFIX>_<SECTION>__<KEY>` overrides `section.key`
//! (names are lower-cased, `__` separates nesting levels). Values are typed
//! by inference (bool, integer, float, string); a value that replaces a
//! string in the file, or that is wrapped in double quotes, stays a string.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use toml::{Table, Value};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Deserialize(#[source] toml::de::Error),
}

/// Load `C` from `path`, then apply environment overrides under `env_prefix`.
///
/// A missing file is not an error: the configuration then comes from the
/// environment and `C`'s serde defaults alone.
pub fn load_config<C: DeserializeOwned>(
    path: impl AsRef<Path>,
    env_prefix: &str,
) -> Result<C, ConfigError> {
    load_config_from(path, env_prefix, std::env::vars())
}

/// [`load_config`] with an explicit variable set.
pub fn load_config_from<C, I>(
    path: impl AsRef<Path>,
    env_prefix: &str,
    vars: I,
) -> Result<C, ConfigError>
where
    C: DeserializeOwned,
    I: IntoIterator<Item = (String, String)>,
{
    let path = path.as_ref();
    let mut table = read_table(path)?;
    apply_env(&mut table, env_prefix, vars);

    let config = Value::Table(table)
        .try_into()
        .map_err(ConfigError::Deserialize)?;

    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

fn read_table(path: &Path) -> Result<Table, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "config file not found, using environment only");
            return Ok(Table::new());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    raw.parse::<Table>().map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Overlay matching variables onto `table`. An empty prefix matches every
/// variable.
pub fn apply_env<I>(table: &mut Table, env_prefix: &str, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let prefix = if env_prefix.is_empty() {
        String::new()
    } else {
        format!("{}_", env_prefix.to_ascii_uppercase())
    };

    for (key, raw) in vars {
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        let path: Vec<String> = rest.split("__").map(str::to_ascii_lowercase).collect();
        if path.iter().any(String::is_empty) {
            continue;
        }
        set_path(table, &path, &raw);
    }
}

fn set_path(table: &mut Table, path: &[String], raw: &str) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        let value = match table.get(head) {
            Some(Value::String(_)) => Value::String(unquote(raw).to_string()),
            _ => infer(raw),
        };
        table.insert(head.clone(), value);
        return;
    }

    let entry = table
        .entry(head.clone())
        .or_insert(Value::Table(Table::new()));
    if !entry.is_table() {
        *entry = Value::Table(Table::new());
    }
    if let Value::Table(child) = entry {
        set_path(child, rest, raw);
    }
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}

fn infer(raw: &str) -> Value {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Value::String(unquote(raw).to_string());
    }
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Boolean(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if raw.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::String(raw.to_string())
}
