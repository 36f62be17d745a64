use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::hotkey::parse_hotkey;
use crate::title::DEFAULT_TITLE_PREFIX_CHARS;
use crate::web_search::EngineOverrides;

const APP_DIR_NAME: &str = "quicksearch";
const CONFIG_FILE_NAME: &str = "config.json";
pub const ENV_CONFIG_PATH: &str = "QUICKSEARCH_CONFIG";
pub const ENV_RELAY_URL: &str = "QUICKSEARCH_RELAY_URL";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
    Serialize(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Parse(error) => write!(f, "parse error: {error}"),
            Self::Invalid(error) => write!(f, "invalid config: {error}"),
            Self::Serialize(error) => write!(f, "serialize error: {error}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hotkey: String,
    pub relay_base_url: String,
    pub default_model: String,
    pub pro_model: String,
    pub system_prompt: Option<String>,
    pub translate_from: Option<String>,
    pub translate_to: Option<String>,
    pub title_prefix_chars: usize,
    pub connect_timeout_secs: u64,
    pub engines: BTreeMap<String, String>,
    pub log_level: String,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: "Alt+L".to_string(),
            relay_base_url: "http://localhost:3131/api".to_string(),
            default_model: "gemini-2.0-flash-001".to_string(),
            pro_model: "gemini-2.5-pro-exp-03-25".to_string(),
            system_prompt: None,
            translate_from: None,
            translate_to: None,
            title_prefix_chars: DEFAULT_TITLE_PREFIX_CHARS,
            connect_timeout_secs: 10,
            engines: BTreeMap::new(),
            log_level: "info".to_string(),
            config_path: stable_app_data_dir().join(CONFIG_FILE_NAME),
        }
    }
}

impl Config {
    /// Engine table overrides keyed by uppercase letter.
    pub fn engine_overrides(&self) -> EngineOverrides {
        self.engines
            .iter()
            .filter_map(|(key, url)| {
                let mut chars = key.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) => Some((letter.to_ascii_uppercase(), url.trim().to_string())),
                    _ => None,
                }
            })
            .collect()
    }
}

pub fn stable_app_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let base = std::env::var_os("APPDATA").map(PathBuf::from);

    #[cfg(not(target_os = "windows"))]
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));

    base.unwrap_or_else(std::env::temp_dir).join(APP_DIR_NAME)
}

pub fn validate(cfg: &Config) -> Result<(), String> {
    if !(50..=4000).contains(&cfg.title_prefix_chars) {
        return Err("title_prefix_chars out of range".into());
    }

    if cfg.connect_timeout_secs == 0 || cfg.connect_timeout_secs > 120 {
        return Err("connect_timeout_secs out of range".into());
    }

    match url::Url::parse(cfg.relay_base_url.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => return Err(format!("relay_base_url is not an http(s) URL: {}", cfg.relay_base_url)),
    }

    if cfg.default_model.trim().is_empty() || cfg.pro_model.trim().is_empty() {
        return Err("model names are required".into());
    }

    parse_hotkey(&cfg.hotkey).map_err(|error| format!("hotkey '{}': {error}", cfg.hotkey))?;

    for (key, value) in &cfg.engines {
        let mut chars = key.trim().chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(letter), None) if letter.is_ascii_alphabetic() => letter.to_ascii_uppercase(),
            _ => return Err(format!("engine key must be a single letter: '{key}'")),
        };
        if matches!(letter, 'I' | 'T' | 'U') {
            return Err(format!("engine letter '{letter}' is reserved"));
        }
        match url::Url::parse(value.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(format!("engine '{letter}' base URL is not http(s): {value}")),
        }
    }

    if cfg.config_path.as_os_str().is_empty() {
        return Err("config_path is required".into());
    }

    Ok(())
}

/// Values read from `QUICKSEARCH_CONFIG` and `QUICKSEARCH_RELAY_URL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub config_path: Option<PathBuf>,
    pub relay_url: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            config_path: std::env::var_os(ENV_CONFIG_PATH)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            relay_url: std::env::var(ENV_RELAY_URL).ok(),
        }
    }

    /// Blank relay values are treated as unset.
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(relay_url) = &self.relay_url {
            let relay_url = relay_url.trim();
            if !relay_url.is_empty() {
                cfg.relay_base_url = relay_url.to_string();
            }
        }
    }
}

/// Resolves the config file path: explicit argument, then environment, then
/// the per-user app data directory.
pub fn resolve_path(path: Option<&Path>, env: &EnvOverrides) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Some(path) = &env.config_path {
        return path.clone();
    }
    stable_app_data_dir().join(CONFIG_FILE_NAME)
}

pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_with(path, &EnvOverrides::from_env())
}

pub fn load_with(path: Option<&Path>, env: &EnvOverrides) -> Result<Config, ConfigError> {
    let config_path = resolve_path(path, env);
    let mut cfg = match std::fs::read_to_string(&config_path) {
        Ok(raw) => parse(&raw)?,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(error) => return Err(ConfigError::Io(error)),
    };
    cfg.config_path = config_path;
    env.apply(&mut cfg);

    validate(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

/// Accepts JSON5 so users can keep comments in the file.
pub fn parse(raw: &str) -> Result<Config, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    json5::from_str::<Config>(raw).map_err(|error| ConfigError::Parse(error.to_string()))
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    validate(cfg).map_err(ConfigError::Invalid)?;
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let encoded = serde_json::to_string_pretty(cfg)
        .map_err(|error| ConfigError::Serialize(error.to_string()))?;
    std::fs::write(&cfg.config_path, encoded)?;
    Ok(())
}
