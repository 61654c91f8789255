//! Process settings read from the environment.
//!
//! `main` loads `.env.local` / `.env` first, so everything here can also be
//! set through those files.

use std::path::PathBuf;
use std::time::Duration;

use chibibot_domain::{RuntimeConfig, DEFAULT_SKIN};

/// Starting chibi for a room's broadcaster.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialOperatorDetails {
    pub name: String,
    pub skin: String,
    pub stance: String,
    /// Empty means the stance's default animation.
    pub animations: Vec<String>,
    pub position_x: f64,
}

impl Default for InitialOperatorDetails {
    fn default() -> Self {
        Self {
            name: "Amiya".into(),
            skin: DEFAULT_SKIN.into(),
            stance: "base".into(),
            animations: Vec::new(),
            position_x: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_host: String,
    pub server_port: u16,
    pub asset_index: PathBuf,
    pub asset_url_prefix: String,
    pub channels: Vec<String>,
    pub exclude_names: Vec<String>,
    pub initial_operator: InitialOperatorDetails,
    /// Chatter eviction period, `None` when disabled.
    pub remove_chibi_after: Option<Duration>,
    /// Room GC threshold and interval, `None` when disabled.
    pub remove_unused_rooms_after: Option<Duration>,
    pub database_url: String,
    pub show_chat_messages: bool,
    pub runtime_config: RuntimeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: 8080,
            asset_index: PathBuf::from("assets/index.json"),
            asset_url_prefix: "/image/assets/".into(),
            channels: Vec::new(),
            exclude_names: Vec::new(),
            initial_operator: InitialOperatorDetails::default(),
            remove_chibi_after: minutes(40),
            remove_unused_rooms_after: minutes(360),
            database_url: "sqlite:chibibot.db".into(),
            show_chat_messages: true,
            runtime_config: RuntimeConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset or unparsable keys
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let initial_operator = InitialOperatorDetails {
            name: get("CHIBI_INITIAL_OPERATOR").unwrap_or(defaults.initial_operator.name),
            skin: get("CHIBI_INITIAL_SKIN").unwrap_or(defaults.initial_operator.skin),
            stance: get("CHIBI_INITIAL_STANCE").unwrap_or(defaults.initial_operator.stance),
            animations: get("CHIBI_INITIAL_ANIMATIONS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            position_x: get("CHIBI_INITIAL_POSITION_X")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.initial_operator.position_x),
        };

        Self {
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: get("SERVER_PORT")
                .or_else(|| get("PORT"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            asset_index: get("CHIBI_ASSET_INDEX")
                .map(PathBuf::from)
                .unwrap_or(defaults.asset_index),
            asset_url_prefix: get("CHIBI_ASSET_URL_PREFIX").unwrap_or(defaults.asset_url_prefix),
            channels: get("CHIBI_CHANNELS").map(|v| split_list(&v)).unwrap_or_default(),
            exclude_names: get("CHIBI_EXCLUDE_NAMES")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            initial_operator,
            remove_chibi_after: match get("CHIBI_REMOVE_CHIBI_AFTER_MINUTES") {
                Some(v) => v
                    .parse::<i64>()
                    .map(minutes)
                    .unwrap_or(defaults.remove_chibi_after),
                None => defaults.remove_chibi_after,
            },
            remove_unused_rooms_after: match get("CHIBI_REMOVE_UNUSED_ROOMS_AFTER_MINUTES") {
                Some(v) => v
                    .parse::<i64>()
                    .map(minutes)
                    .unwrap_or(defaults.remove_unused_rooms_after),
                None => defaults.remove_unused_rooms_after,
            },
            database_url: get("CHIBI_DATABASE_URL").unwrap_or(defaults.database_url),
            show_chat_messages: get("CHIBI_SHOW_CHAT_MESSAGES")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.show_chat_messages),
            runtime_config: defaults.runtime_config,
        }
    }
}

/// Non-positive values disable the timer.
fn minutes(value: i64) -> Option<Duration> {
    u64::try_from(value)
        .ok()
        .filter(|m| *m > 0)
        .map(|m| Duration::from_secs(m * 60))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = settings_from(&[]);
        assert_eq!(settings.server_port, 8080);
        assert_eq!(settings.remove_chibi_after, Some(Duration::from_secs(40 * 60)));
        assert_eq!(
            settings.remove_unused_rooms_after,
            Some(Duration::from_secs(360 * 60))
        );
        assert_eq!(settings.initial_operator.name, "Amiya");
        assert!(settings.show_chat_messages);
    }

    #[test]
    fn lists_and_flags_are_parsed() {
        let settings = settings_from(&[
            ("CHIBI_CHANNELS", "stym, other ,"),
            ("CHIBI_EXCLUDE_NAMES", "nightbot,streamelements"),
            ("CHIBI_SHOW_CHAT_MESSAGES", "false"),
            ("CHIBI_INITIAL_ANIMATIONS", "Relax,Sit"),
        ]);
        assert_eq!(settings.channels, vec!["stym", "other"]);
        assert_eq!(settings.exclude_names.len(), 2);
        assert!(!settings.show_chat_messages);
        assert_eq!(settings.initial_operator.animations, vec!["Relax", "Sit"]);
    }

    #[test]
    fn non_positive_periods_disable_timers() {
        let settings = settings_from(&[
            ("CHIBI_REMOVE_CHIBI_AFTER_MINUTES", "0"),
            ("CHIBI_REMOVE_UNUSED_ROOMS_AFTER_MINUTES", "-5"),
        ]);
        assert_eq!(settings.remove_chibi_after, None);
        assert_eq!(settings.remove_unused_rooms_after, None);
    }
}
