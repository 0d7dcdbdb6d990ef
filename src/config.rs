use directories::ProjectDirs;
use reqwest::Url;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const API_BASE_VAR: &str = "NOTED_API_BASE";
pub const BACKEND_URL_VAR: &str = "NOTED_BACKEND_URL";

/// Resolved configuration, handed to the adapter explicitly. Nothing else
/// in the crate reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: Url,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(
        "no notes API base URL configured; pass --api-base, set {API_BASE_VAR} or \
         {BACKEND_URL_VAR}, or put api_base in the config file"
    )]
    MissingBaseUrl,
    #[error("invalid API base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("reading {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub api_base: Option<String>,
}

/// Resolution order: CLI flag, primary env var, fallback env var, config
/// file. Absence of all four is a startup error raised before any network
/// attempt.
pub fn load(flag: Option<String>) -> Result<Config, ConfigError> {
    let file = match config_file_path() {
        Some(path) => load_file_config(&path)?,
        None => FileConfig::default(),
    };
    let raw = resolve(flag, env_var(API_BASE_VAR), env_var(BACKEND_URL_VAR), file.api_base)
        .ok_or(ConfigError::MissingBaseUrl)?;
    Ok(Config {
        api_base: parse_base(&raw)?,
    })
}

fn resolve(
    flag: Option<String>,
    primary: Option<String>,
    fallback: Option<String>,
    file: Option<String>,
) -> Option<String> {
    [flag, primary, fallback, file]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn parse_base(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|err| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "expected an http(s) URL".to_string(),
        });
    }
    Ok(url)
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn config_file_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "noted").map(|dirs| dirs.config_dir().join("config.yml"))
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn flag_beats_env_beats_file() {
        assert_eq!(
            resolve(s("http://flag"), s("http://primary"), s("http://fb"), s("http://file")),
            s("http://flag")
        );
        assert_eq!(
            resolve(None, s("http://primary"), s("http://fb"), s("http://file")),
            s("http://primary")
        );
        assert_eq!(resolve(None, None, s("http://fb"), s("http://file")), s("http://fb"));
        assert_eq!(resolve(None, None, None, s("http://file")), s("http://file"));
        assert_eq!(resolve(None, None, None, None), None);
    }

    #[test]
    fn blank_settings_fall_through() {
        assert_eq!(resolve(s("   "), None, s("http://fb"), None), s("http://fb"));
    }

    #[test]
    fn rejects_non_http_bases() {
        assert!(parse_base("http://localhost:4000/api").is_ok());
        assert!(parse_base("https://notes.example.com").is_ok());
        assert!(matches!(
            parse_base("ftp://example.com"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            parse_base("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn reads_yaml_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "api_base: http://example.test/api\n").unwrap();
        let file = load_file_config(&path).unwrap();
        assert_eq!(file.api_base.as_deref(), Some("http://example.test/api"));
    }

    #[test]
    fn missing_config_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let file = load_file_config(&dir.path().join("absent.yml")).unwrap();
        assert!(file.api_base.is_none());
    }
}
