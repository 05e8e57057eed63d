use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::protocol::ModelSettings;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "driftwood.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub draft_defaults: ModelSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: 120,
            draft_defaults: ModelSettings::default(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    draft: DraftDefaults,
}

#[derive(Debug, Default, Deserialize)]
struct DraftDefaults {
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

/// Defaults, then the config file, then the environment, then `--server-url`.
///
/// An explicit `config_path` must exist; the implicit `driftwood.toml` is
/// optional.
pub fn load_settings(config_path: Option<&Path>, server_url: Option<&str>) -> anyhow::Result<Settings> {
    let raw = match config_path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };

    let mut settings = resolve_settings(raw.as_deref(), |key| std::env::var(key).ok())?;
    if let Some(url) = server_url {
        settings.server_url = url.to_string();
    }
    Ok(settings)
}

fn resolve_settings(
    raw_file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Some(raw) = raw_file {
        let file_cfg: FileSettings = toml::from_str(raw).context("invalid config file")?;
        if let Some(v) = file_cfg.server_url {
            settings.server_url = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.draft.model {
            settings.draft_defaults.model = v;
        }
        if let Some(v) = file_cfg.draft.temperature {
            settings.draft_defaults.temperature = v;
        }
        if let Some(v) = file_cfg.draft.max_tokens {
            settings.draft_defaults.max_tokens = v;
        }
    }

    if let Some(v) = env("DRIFTWOOD_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(_) => warn!(value = %v, "ignoring unparsable APP__REQUEST_TIMEOUT_SECS"),
        }
    }

    if let Some(v) = env("APP__DEFAULT_MODEL") {
        settings.draft_defaults.model = v;
    }
    if let Some(v) = env("APP__DEFAULT_TEMPERATURE") {
        match v.parse::<f64>() {
            Ok(parsed) => settings.draft_defaults.temperature = parsed,
            Err(_) => warn!(value = %v, "ignoring unparsable APP__DEFAULT_TEMPERATURE"),
        }
    }
    if let Some(v) = env("APP__DEFAULT_MAX_TOKENS") {
        match v.parse::<u32>() {
            Ok(parsed) => settings.draft_defaults.max_tokens = parsed,
            Err(_) => warn!(value = %v, "ignoring unparsable APP__DEFAULT_MAX_TOKENS"),
        }
    }

    Ok(settings)
}
