use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::paytable::Paytable;

pub const DEFAULT_INITIAL_BALANCE: u64 = 1000;
pub const DEFAULT_BET: u64 = 10;
pub const DEFAULT_WIN_CHANCE_PERCENT: u8 = 15;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;
pub const DEFAULT_HISTORY_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// In-memory game configuration. Reverts to defaults on restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub initial_balance: u64,
    pub default_bet: u64,
    pub win_chance_percent: u8,
    pub slot_bet_presets: Vec<u64>,
    pub crash_bet_presets: Vec<u64>,
    pub tick_interval_ms: u64,
    pub history_len: usize,
    pub paytable: Paytable,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_balance: DEFAULT_INITIAL_BALANCE,
            default_bet: DEFAULT_BET,
            win_chance_percent: DEFAULT_WIN_CHANCE_PERCENT,
            slot_bet_presets: vec![10, 20, 50, 100],
            crash_bet_presets: vec![10, 50, 100, 500],
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            history_len: DEFAULT_HISTORY_LEN,
            paytable: Paytable::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_bet == 0 {
            return Err(ConfigError::Invalid("default_bet must be positive".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.paytable.0.is_empty() {
            return Err(ConfigError::Invalid("paytable has no paylines".into()));
        }
        if self.slot_bet_presets.contains(&0) || self.crash_bet_presets.contains(&0) {
            return Err(ConfigError::Invalid("bet presets must be positive".into()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Probability, in whole percent, that a round is predestined to win.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "u8", into = "u8")]
pub struct WinBias(u8);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Fair,
    Medium,
    Harsh,
}

impl WinBias {
    pub const MAX: u8 = 100;

    /// Clamps to `[0, 100]`.
    pub fn new(percent: i64) -> Self {
        Self(percent.clamp(0, Self::MAX as i64) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    pub fn difficulty(self) -> Difficulty {
        match self.0 {
            51.. => Difficulty::Fair,
            21..=50 => Difficulty::Medium,
            _ => Difficulty::Harsh,
        }
    }
}

impl Default for WinBias {
    fn default() -> Self {
        Self(DEFAULT_WIN_CHANCE_PERCENT)
    }
}

impl From<u8> for WinBias {
    fn from(percent: u8) -> Self {
        Self::new(percent as i64)
    }
}

impl From<WinBias> for u8 {
    fn from(bias: WinBias) -> Self {
        bias.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_is_clamped() {
        assert_eq!(WinBias::new(-5).percent(), 0);
        assert_eq!(WinBias::new(250).percent(), 100);
        assert_eq!(WinBias::from(200u8).percent(), 100);
        assert_eq!(WinBias::new(42).percent(), 42);
    }

    #[test]
    fn test_difficulty_labels() {
        assert_eq!(WinBias::new(51).difficulty(), Difficulty::Fair);
        assert_eq!(WinBias::new(50).difficulty(), Difficulty::Medium);
        assert_eq!(WinBias::new(21).difficulty(), Difficulty::Medium);
        assert_eq!(WinBias::new(20).difficulty(), Difficulty::Harsh);
        assert_eq!(WinBias::default().difficulty(), Difficulty::Harsh);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json(r#"{"initial_balance": 500, "win_chance_percent": 40}"#)
            .unwrap();
        assert_eq!(config.initial_balance, 500);
        assert_eq!(config.win_chance_percent, 40);
        assert_eq!(config.default_bet, DEFAULT_BET);
        assert_eq!(config.paytable, Paytable::default());
    }

    #[test]
    fn test_rejects_zero_bet() {
        let err = GameConfig::from_json(r#"{"default_bet": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
