use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "navigator.toml";
pub const DEFAULT_ORACLE_URL: &str = "http://127.0.0.1:3400";
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 7_000;

const SETTING_KEYS: [&str; 7] = [
    "oracle_url",
    "oracle_route_path",
    "oracle_timeout_ms",
    "tick_interval_ms",
    "narration_enabled",
    "narration_language",
    "speech_command",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub oracle_url: String,
    pub oracle_route_path: String,
    pub oracle_timeout_ms: u64,
    pub tick_interval_ms: u64,
    pub narration_enabled: bool,
    pub narration_language: String,
    pub speech_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            oracle_url: DEFAULT_ORACLE_URL.into(),
            oracle_route_path: "/optimize-route".into(),
            oracle_timeout_ms: 30_000,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            narration_enabled: true,
            narration_language: "en-US".into(),
            speech_command: default_speech_command().into(),
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn oracle_endpoint(&self) -> anyhow::Result<Url> {
        let base = normalize_oracle_url(&self.oracle_url);
        let path = self.oracle_route_path.trim().trim_start_matches('/');
        let raw = if path.is_empty() {
            base
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&raw).with_context(|| format!("invalid route oracle endpoint '{raw}'"))
    }
}

fn default_speech_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak"
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());

    settings
}

pub(crate) fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };
    for key in SETTING_KEYS {
        if let Some(value) = file_cfg.get(key) {
            let value = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            apply_value(settings, key, &value);
        }
    }
}

/// `NAV_<KEY>` is applied first, then `APP__<KEY>`, so the latter wins.
pub(crate) fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in SETTING_KEYS {
        let upper = key.to_ascii_uppercase();
        for name in [format!("NAV_{upper}"), format!("APP__{upper}")] {
            if let Some(value) = lookup(&name) {
                apply_value(settings, key, &value);
            }
        }
    }
}

fn apply_value(settings: &mut Settings, key: &str, value: &str) {
    let value = value.trim();
    match key {
        "oracle_url" => settings.oracle_url = normalize_oracle_url(value),
        "oracle_route_path" => settings.oracle_route_path = value.to_string(),
        "oracle_timeout_ms" => {
            if let Some(parsed) = parse_positive_ms(value) {
                settings.oracle_timeout_ms = parsed;
            }
        }
        "tick_interval_ms" => {
            if let Some(parsed) = parse_positive_ms(value) {
                settings.tick_interval_ms = parsed;
            }
        }
        "narration_enabled" => {
            if let Some(parsed) = parse_flag(value) {
                settings.narration_enabled = parsed;
            }
        }
        "narration_language" if !value.is_empty() => {
            settings.narration_language = value.to_string();
        }
        "speech_command" if !value.is_empty() => settings.speech_command = value.to_string(),
        _ => {}
    }
}

fn parse_positive_ms(value: &str) -> Option<u64> {
    value.parse::<u64>().ok().filter(|ms| *ms > 0)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn normalize_oracle_url(raw_oracle_url: &str) -> String {
    let raw_oracle_url = raw_oracle_url.trim();

    if raw_oracle_url.is_empty() {
        return DEFAULT_ORACLE_URL.to_string();
    }

    let with_scheme = if raw_oracle_url.contains("://") {
        raw_oracle_url.to_string()
    } else {
        format!("http://{raw_oracle_url}")
    };

    with_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
