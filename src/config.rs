use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::constants::{grid, playfield, timing};
use crate::game::world::WorldConfig;

/// Env var naming an optional JSON config file
pub const CONFIG_FILE_VAR: &str = "WRAPFIELD_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine and demo configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Playfield width in pixels
    pub playfield_width: f32,
    /// Playfield height in pixels
    pub playfield_height: f32,
    /// Grid cell edge length
    pub cell_size: f32,
    /// Target frames per second
    pub tick_rate: u32,
    /// Frames the demo runs for
    pub frames: u64,
    /// Asteroids spawned by the demo
    pub asteroid_count: usize,
    /// RNG seed for the demo; random when unset
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            playfield_width: playfield::WIDTH,
            playfield_height: playfield::HEIGHT,
            cell_size: grid::CELL_SIZE,
            tick_rate: timing::TICK_RATE,
            frames: 600,
            asteroid_count: 8,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Load config from an optional JSON file and the environment, or use defaults
    pub fn load_or_default() -> Self {
        let mut config = match std::env::var(CONFIG_FILE_VAR) {
            Ok(path) => match Self::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring {} '{}': {}", CONFIG_FILE_VAR, path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        config.apply_env();
        config
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Override fields from individual env vars
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let positive = |v: &f32| v.is_finite() && *v > 0.0;

        override_from(&lookup, "PLAYFIELD_WIDTH", &mut self.playfield_width, positive);
        override_from(&lookup, "PLAYFIELD_HEIGHT", &mut self.playfield_height, positive);
        override_from(&lookup, "CELL_SIZE", &mut self.cell_size, positive);
        override_from(&lookup, "TICK_RATE", &mut self.tick_rate, |v| *v > 0 && *v <= 1000);
        override_from(&lookup, "FRAMES", &mut self.frames, |_| true);
        override_from(&lookup, "ASTEROID_COUNT", &mut self.asteroid_count, |v| *v <= 10_000);

        if let Some(seed) = lookup("SEED") {
            match seed.parse::<u64>() {
                Ok(parsed) => self.seed = Some(parsed),
                Err(_) => tracing::warn!("Invalid SEED '{}', keeping {:?}", seed, self.seed),
            }
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dims = [
            ("playfield_width", self.playfield_width),
            ("playfield_height", self.playfield_height),
            ("cell_size", self.cell_size),
        ];
        for (name, value) in dims {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be finite and > 0, got {}",
                    name, value
                )));
            }
        }
        let columns = (self.playfield_width / self.cell_size).ceil();
        let rows = (self.playfield_height / self.cell_size).ceil();
        if columns * rows > grid::MAX_CELLS as f32 {
            return Err(ConfigError::Invalid(format!(
                "{}x{} playfield at cell_size {} needs more than {} cells",
                self.playfield_width, self.playfield_height, self.cell_size, grid::MAX_CELLS
            )));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Geometry for `World::new`
    pub fn world(&self) -> WorldConfig {
        WorldConfig {
            playfield_width: self.playfield_width,
            playfield_height: self.playfield_height,
            cell_size: self.cell_size,
        }
    }
}

fn override_from<T, L, V>(lookup: &L, name: &str, field: &mut T, accept: V)
where
    T: FromStr + std::fmt::Debug,
    L: Fn(&str) -> Option<String>,
    V: Fn(&T) -> bool,
{
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(parsed) if accept(&parsed) => *field = parsed,
        Ok(_) => tracing::warn!("{} out of range '{}', keeping {:?}", name, raw, field),
        Err(_) => tracing::warn!("Invalid {} '{}', keeping {:?}", name, raw, field),
    }
}
