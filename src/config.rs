//! Application-level configuration loading: cosmetic pools, reveal pauses and chat limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use rand::{Rng, seq::IndexedRandom};
use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HEIST_BACK_CONFIG_PATH";
/// Fallback cosmetic value returned when a pool is empty.
const DEFAULT_CHARACTER: &str = "char1";
const DEFAULT_CHAT_COLOR: &str = "#82c9ff";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    characters: Vec<String>,
    chat_colors: Vec<String>,
    /// Pause between dealing roles and the first team selection.
    pub agent_reveal_delay: Duration,
    /// Pause during which votes are displayed before being tallied.
    pub vote_reveal_delay: Duration,
    /// Pause during which a mission outcome is displayed.
    pub mission_reveal_delay: Duration,
    /// Longest chat message accepted, in characters.
    pub max_chat_length: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        characters = app_config.characters.len(),
                        chat_colors = app_config.chat_colors.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Return the first character that is not already listed in `used`.
    ///
    /// When every character is taken a random one is drawn so callers always receive a value.
    pub fn first_unused_character<R: Rng + ?Sized>(&self, used: &[&str], rng: &mut R) -> String {
        first_unused(&self.characters, used, rng).unwrap_or_else(|| DEFAULT_CHARACTER.into())
    }

    /// Return the first chat colour that is not already listed in `used`.
    pub fn first_unused_chat_color<R: Rng + ?Sized>(&self, used: &[&str], rng: &mut R) -> String {
        first_unused(&self.chat_colors, used, rng).unwrap_or_else(|| DEFAULT_CHAT_COLOR.into())
    }
}

fn first_unused<R: Rng + ?Sized>(pool: &[String], used: &[&str], rng: &mut R) -> Option<String> {
    pool.iter()
        .find(|candidate| !used.contains(&candidate.as_str()))
        .or_else(|| pool.choose(rng))
        .cloned()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            characters: default_characters(),
            chat_colors: default_chat_colors(),
            agent_reveal_delay: Duration::from_millis(7_000),
            vote_reveal_delay: Duration::from_millis(4_000),
            mission_reveal_delay: Duration::from_millis(6_000),
            max_chat_length: 200,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    characters: Vec<String>,
    #[serde(default)]
    chat_colors: Vec<String>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default, rename = "agentRevealDelayMs")]
    agent_reveal_delay: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default, rename = "voteRevealDelayMs")]
    vote_reveal_delay: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default, rename = "missionRevealDelayMs")]
    mission_reveal_delay: Option<Duration>,
    #[serde(default)]
    max_chat_length: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            characters: non_empty_or(value.characters, defaults.characters),
            chat_colors: non_empty_or(value.chat_colors, defaults.chat_colors),
            agent_reveal_delay: value
                .agent_reveal_delay
                .unwrap_or(defaults.agent_reveal_delay),
            vote_reveal_delay: value
                .vote_reveal_delay
                .unwrap_or(defaults.vote_reveal_delay),
            mission_reveal_delay: value
                .mission_reveal_delay
                .unwrap_or(defaults.mission_reveal_delay),
            max_chat_length: value
                .max_chat_length
                .filter(|max| *max > 0)
                .unwrap_or(defaults.max_chat_length),
        }
    }
}

fn non_empty_or(values: Vec<String>, fallback: Vec<String>) -> Vec<String> {
    if values.is_empty() { fallback } else { values }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_characters() -> Vec<String> {
    (1..=8).map(|index| format!("char{index}")).collect()
}

fn default_chat_colors() -> Vec<String> {
    [
        "#82c9ff", // light blue
        "#a6e22e", // lime green
        "#ff6b6b", // light red
        "#facc15", // yellow
        "#e066ff", // light purple
        "#ff9f43", // orange
        "#48dbfb", // cyan
        "#1dd1a1", // teal
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
