//! The TOML configuration file. Every key is optional:
//!
//! ```toml
//! catalog = "https://example.com/catalog.json"   # or a path; builtin when absent
//! store = "/home/me/.local/share/switchboard/settings.json"
//! log = "switchboard=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml;

use crate::catalog::CatalogSource;

const USER_PATHS: [&str; 2] = [".config/switchboard/config.toml", ".switchboard.toml"];
const SYSTEM_PATH: &str = "/etc/switchboard.toml";
const DEFAULT_STORE: &str = ".local/share/switchboard/settings.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config \"{}\": {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config \"{}\": {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
    /// Location of the catalog document, a URL or a path.
    pub catalog: Option<String>,
    /// Path of the settings store.
    pub store: Option<PathBuf>,
    /// A tracing filter directive, overridden by `RUST_LOG`.
    pub log: Option<String>,
    /// Keys present in the file which are not part of the configuration.
    #[serde(skip)]
    pub extraneous_keys: Vec<String>,
}

impl Config {
    pub fn catalog_source(&self) -> CatalogSource {
        match &self.catalog {
            Some(location) => CatalogSource::from_location(location),
            None => CatalogSource::Builtin,
        }
    }

    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.store {
            return path.clone();
        }

        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(DEFAULT_STORE),
            None => PathBuf::from("switchboard-settings.json"),
        }
    }
}

fn get_config_path() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);

        for &path in USER_PATHS.iter() {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from(SYSTEM_PATH);

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn extra_fields_helper<'a>(
    path: &mut Vec<&'a str>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    extra: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        match (user_value, config.get(user_key)) {
            (toml::Value::Table(user_value), Some(toml::Value::Table(config_value))) => {
                extra_fields_helper(path, user_value, config_value, extra)
            }
            (_, Some(_)) => {}
            (_, None) => extra.push(path.join(".")),
        }

        path.pop();
    }
}

fn extra_fields(config: &Config, user_config: &toml::Table) -> Vec<String> {
    let config = match toml::Value::try_from(config) {
        Ok(toml::Value::Table(config)) => config,
        _ => return Vec::new(),
    };

    let mut path = Vec::new();
    let mut extra = Vec::new();

    extra_fields_helper(&mut path, user_config, &config, &mut extra);

    extra
}

/// Parse a configuration document. `path` is only used in errors.
pub fn parse_config(raw_config: &str, path: &Path) -> Result<Config, ConfigError> {
    let parse_err = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let user_config: toml::Table = toml::from_str(raw_config).map_err(parse_err)?;
    let mut config: Config = toml::from_str(raw_config).map_err(parse_err)?;

    config.extraneous_keys = extra_fields(&config, &user_config);

    Ok(config)
}

/// Read the configuration at `config`, or at the first default location which
/// exists. With no file at all, the defaults are used.
pub fn read_config(config: Option<PathBuf>) -> Result<Config, ConfigError> {
    let config_path = config.or_else(get_config_path);

    let path = match config_path {
        Some(path) => path,
        None => return Ok(Config::default()),
    };

    let raw_config = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    parse_config(&raw_config, &path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let raw = r#"
            catalog = "https://example.com/catalog.json"
            store = "/tmp/settings.json"
            log = "debug"
        "#;

        let config = parse_config(raw, Path::new("config.toml")).unwrap();

        assert!(matches!(config.catalog_source(), CatalogSource::Url(_)));
        assert_eq!(config.store_path(), PathBuf::from("/tmp/settings.json"));
        assert_eq!(config.log.as_deref(), Some("debug"));
        assert!(config.extraneous_keys.is_empty());
    }

    #[test]
    fn test_extraneous_keys() {
        let raw = r#"
            catalog = "catalog.json"
            editor = "vim"

            [providers.openai]
            api_key = "sk"
        "#;

        let config = parse_config(raw, Path::new("config.toml")).unwrap();

        assert_eq!(
            config.catalog_source(),
            CatalogSource::File(PathBuf::from("catalog.json"))
        );
        assert_eq!(config.extraneous_keys, ["editor", "providers"]);
    }

    #[test]
    fn test_parse_error() {
        let result = parse_config("catalog = [", Path::new("bad.toml"));

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_read_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(matches!(
            read_config(Some(path.clone())),
            Err(ConfigError::Read { .. })
        ));

        std::fs::write(&path, "log = \"warn\"\n").unwrap();

        let config = read_config(Some(path)).unwrap();
        assert_eq!(config.log.as_deref(), Some("warn"));
        assert_eq!(config.catalog_source(), CatalogSource::Builtin);
    }
}
