use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::guard::DecoderBudget;

const DEFAULT_ENV_PREFIX: &str = "FEEDCARD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetSetting {
    #[default]
    Auto,
    Constrained,
    Unconstrained,
}

impl BudgetSetting {
    pub fn resolve(self) -> DecoderBudget {
        match self {
            BudgetSetting::Auto => DecoderBudget::for_current_platform(),
            BudgetSetting::Constrained => DecoderBudget::Constrained,
            BudgetSetting::Unconstrained => DecoderBudget::Unconstrained,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(BudgetSetting::Auto),
            "constrained" => Some(BudgetSetting::Constrained),
            "unconstrained" => Some(BudgetSetting::Unconstrained),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlayerConfig {
    #[serde(default)]
    pub decoder_budget: BudgetSetting,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f64,
    #[serde(default)]
    pub feed_path: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            feed_path: None,
        }
    }
}

fn default_visibility_threshold() -> f64 {
    0.6
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_tick_rate", with = "humantime_serde")]
    pub tick_rate: Duration,
    #[serde(default = "default_page_width")]
    pub page_width: f64,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            page_width: default_page_width(),
        }
    }
}

fn default_tick_rate() -> Duration {
    Duration::from_millis(120)
}

fn default_page_width() -> f64 {
    360.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaConfig {
    #[serde(default = "default_load_delay", with = "humantime_serde")]
    pub load_delay: Duration,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            load_delay: default_load_delay(),
            workers: default_workers(),
        }
    }
}

fn default_load_delay() -> Duration {
    Duration::from_millis(250)
}

fn default_workers() -> usize {
    2
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            cfg = read_config_file(path)?;
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            cfg = read_config_file(&default_path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);
    cfg.sanitize();

    Ok(cfg)
}

impl Config {
    fn sanitize(&mut self) {
        if !self.feed.visibility_threshold.is_finite() {
            self.feed.visibility_threshold = default_visibility_threshold();
        }
        self.feed.visibility_threshold = self.feed.visibility_threshold.clamp(0.0, 1.0);
        if !self.ui.page_width.is_finite() || self.ui.page_width <= 0.0 {
            self.ui.page_width = default_page_width();
        }
        if self.ui.tick_rate.is_zero() {
            self.ui.tick_rate = default_tick_rate();
        }
        if self.media.workers == 0 {
            self.media.workers = default_workers();
        }
    }
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "player.decoder_budget" => {
            if let Some(setting) = BudgetSetting::parse(&value) {
                cfg.player.decoder_budget = setting;
            }
        }
        "feed.visibility_threshold" => {
            if let Ok(parsed) = value.parse::<f64>() {
                cfg.feed.visibility_threshold = parsed;
            }
        }
        "feed.feed_path" => cfg.feed.feed_path = Some(PathBuf::from(value)),
        "ui.tick_rate" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.tick_rate = duration;
            }
        }
        "ui.page_width" => {
            if let Ok(parsed) = value.parse::<f64>() {
                cfg.ui.page_width = parsed;
            }
        }
        "media.load_delay" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.media.load_delay = duration;
            }
        }
        "media.workers" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.media.workers = parsed;
            }
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("feedcard").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated(prefix: &str) -> LoadOptions {
        let dir = tempdir().unwrap();
        LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some(prefix.to_string()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated("FEEDCARD_TEST_DEFAULTS")).unwrap();
        assert_eq!(cfg.player.decoder_budget, BudgetSetting::Auto);
        assert_eq!(cfg.feed.visibility_threshold, 0.6);
        assert_eq!(cfg.ui.tick_rate, Duration::from_millis(120));
    }

    #[test]
    fn reads_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "player:\n  decoder_budget: constrained\nui:\n  tick_rate: 50ms\nmedia:\n  load_delay: 1s\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("FEEDCARD_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.player.decoder_budget.resolve(), DecoderBudget::Constrained);
        assert_eq!(cfg.ui.tick_rate, Duration::from_millis(50));
        assert_eq!(cfg.media.load_delay, Duration::from_secs(1));
        assert_eq!(cfg.ui.page_width, 360.0);
    }

    #[test]
    fn env_overrides() {
        env::set_var("FEEDCARD_TEST_ENV_PLAYER__DECODER_BUDGET", "unconstrained");
        env::set_var("FEEDCARD_TEST_ENV_FEED__VISIBILITY_THRESHOLD", "3.5");
        let cfg = load(isolated("FEEDCARD_TEST_ENV")).unwrap();
        assert_eq!(cfg.player.decoder_budget, BudgetSetting::Unconstrained);
        assert_eq!(cfg.feed.visibility_threshold, 1.0);
        env::remove_var("FEEDCARD_TEST_ENV_PLAYER__DECODER_BUDGET");
        env::remove_var("FEEDCARD_TEST_ENV_FEED__VISIBILITY_THRESHOLD");
    }
}
