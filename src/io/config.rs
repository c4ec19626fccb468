use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::algorithms::point_based_reg::MIN_FIDUCIALS;
use crate::error::FredError;

/// Top level configuration, usually read from a TOML file.
///
/// ```toml
/// [logger]
/// log_file_name = "fred_results.log"
/// overwrite_existing = false
///
/// [game]
/// initial_margin = 1.0
/// fle_sd_range = [0.5, 5.0]
///
/// [simulation]
/// fiducials = 10
/// fixed_fle_sd = [1.0, 1.0, 0.0]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FredConfig {
    /// Results are only logged when this section is present.
    pub logger: Option<LoggerConfig>,
    pub game: GameConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_file_name: PathBuf,
    pub overwrite_existing: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            log_file_name: PathBuf::from("fred_results.log"),
            overwrite_existing: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub initial_margin: f64,
    pub margin_increment: f64,
    /// Smallest margin the player can shrink to.
    pub margin_floor: f64,
    pub target_radius: f64,
    /// Range the per round FLE standard deviation is drawn from.
    pub fle_sd_range: [f64; 2],
    pub edge_buffer: f64,
    pub repeats: usize,
    /// Number of closing rounds that rotate through the hidden statistic
    /// views. A multiple of 4, smaller than `repeats`.
    pub visibility_buffer: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            initial_margin: 1.0,
            margin_increment: 0.1,
            margin_floor: 0.0,
            target_radius: 10.0,
            fle_sd_range: [0.5, 5.0],
            edge_buffer: 0.9,
            repeats: 20,
            visibility_buffer: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub fiducials: usize,
    pub radius: f64,
    pub centre: [f64; 3],
    pub target: [f64; 3],
    pub fixed_fle_sd: [f64; 3],
    pub repeats: usize,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            fiducials: 10,
            radius: 2.0,
            centre: [0.0, 0.0, 0.0],
            target: [0.0, 0.0, 0.0],
            fixed_fle_sd: [1.0, 1.0, 0.0],
            repeats: 1000,
            seed: 0,
        }
    }
}

fn invalid(message: String) -> FredError {
    FredError::InvalidValue(message)
}

impl GameConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        let [low, high] = self.fle_sd_range;
        if !(low >= 0.0 && high > low) {
            return Err(invalid(format!(
                "fle_sd_range must satisfy 0 <= low < high, got [{}, {}]",
                low, high
            )));
        }
        if !(self.initial_margin >= 0.0) || !(self.margin_increment > 0.0) {
            return Err(invalid(
                "initial_margin must be >= 0 and margin_increment > 0".to_string(),
            ));
        }
        if !(self.margin_floor >= 0.0 && self.margin_floor <= self.initial_margin) {
            return Err(invalid(format!(
                "margin_floor must be in [0, initial_margin], got {}",
                self.margin_floor
            )));
        }
        if self.repeats == 0 {
            return Err(invalid("game repeats must be positive".to_string()));
        }
        if self.visibility_buffer % 4 != 0 || self.visibility_buffer >= self.repeats {
            return Err(invalid(format!(
                "visibility_buffer must be a multiple of 4 below repeats ({}), got {}",
                self.repeats, self.visibility_buffer
            )));
        }
        if !(self.target_radius > 0.0) {
            return Err(invalid(format!(
                "target_radius must be positive, got {}",
                self.target_radius
            )));
        }
        if !(self.edge_buffer > 0.0 && self.edge_buffer <= 1.0) {
            return Err(invalid(format!(
                "edge_buffer must be in (0, 1], got {}",
                self.edge_buffer
            )));
        }
        Ok(())
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.fiducials < MIN_FIDUCIALS {
            return Err(invalid(format!(
                "simulation needs at least {} fiducials, got {}",
                MIN_FIDUCIALS, self.fiducials
            )));
        }
        if self.repeats == 0 {
            return Err(invalid("simulation repeats must be positive".to_string()));
        }
        if !(self.radius > 0.0) {
            return Err(invalid(format!(
                "simulation radius must be positive, got {}",
                self.radius
            )));
        }
        if self.fixed_fle_sd.iter().any(|&s| !(s >= 0.0)) {
            return Err(invalid(
                "fixed_fle_sd must be non negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl FredConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: FredConfig =
            toml::from_str(contents).context("failed to parse FRED configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path).with_context(|| {
            format!("failed to read configuration file {:?}", path.as_ref())
        })?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid configuration in {:?}", path.as_ref()))
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        self.game.validate()?;
        self.simulation.validate()
    }
}
