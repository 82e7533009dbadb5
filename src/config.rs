#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use crate::extractor::DEFAULT_PROGRAM;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const ENV_FILE_KEY: &str = "YTFTPL_ENV_FILE";
pub const DB_PATH_KEY: &str = "YTFTPL_DB_PATH";
pub const YT_DLP_KEY: &str = "YTFTPL_YT_DLP";
pub const BROWSER_KEY: &str = "YTFTPL_BROWSER";
pub const SLEEP_KEY: &str = "YTFTPL_SLEEP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// `None` means "use FreeTube's default location".
    pub database_path: Option<PathBuf>,
    pub yt_dlp: PathBuf,
    pub browser: Option<String>,
    pub sleep_seconds: Option<u64>,
}

/// Values given on the command line; they beat the environment and `.env`.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub database_path: Option<PathBuf>,
    pub yt_dlp: Option<PathBuf>,
    pub browser: Option<String>,
    pub sleep_seconds: Option<u64>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_runtime_settings(overrides: RuntimeOverrides) -> Result<RuntimeSettings> {
    let env_path = overrides
        .env_path
        .clone()
        .or_else(|| env_var_string(ENV_FILE_KEY).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(&env_path)?;
    Ok(build_runtime_settings(&file_vars, env_var_string, overrides))
}

fn build_runtime_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> RuntimeSettings {
    let database_path = overrides
        .database_path
        .or_else(|| lookup_value(DB_PATH_KEY, file_vars, &env_lookup).map(PathBuf::from));
    let yt_dlp = overrides
        .yt_dlp
        .or_else(|| lookup_value(YT_DLP_KEY, file_vars, &env_lookup).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM));
    let browser = overrides
        .browser
        .and_then(|value| {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        })
        .or_else(|| lookup_value(BROWSER_KEY, file_vars, &env_lookup));
    let sleep_seconds = overrides.sleep_seconds.or_else(|| {
        lookup_value(SLEEP_KEY, file_vars, &env_lookup).and_then(|value| value.parse::<u64>().ok())
    });
    RuntimeSettings {
        database_path,
        yt_dlp,
        browser,
        sleep_seconds,
    }
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key)
        .or_else(|| file_vars.get(key).cloned())
        .filter(|value| !value.trim().is_empty())
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
