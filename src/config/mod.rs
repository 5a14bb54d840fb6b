//! Engine configuration
//!
//! Every tunable constant the engine uses lives here. Values are loaded from a
//! TOML file; any section or key left out falls back to the defaults below.
//!
//! ```toml
//! [reference]
//! cutting_speed = 100.0
//!
//! [search]
//! max_tool_life_minutes = 30.0
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value {key} = {value}: {reason}")]
    Invalid {
        key: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Calibration reference for the Johnson-Cook correction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Speed (m/min) at which Kienzle coefficients are presumed calibrated
    pub cutting_speed: f64,
    /// Johnson-Cook reference strain rate ε̇₀ (1/s)
    pub strain_rate: f64,
    /// Effective plastic strain in the primary shear zone
    pub effective_strain: f64,
    /// Primary shear zone thickness (mm), converts V into a strain rate
    pub shear_zone_thickness: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            cutting_speed: 100.0,
            strain_rate: 1.0,
            effective_strain: 1.0,
            shear_zone_thickness: 0.025,
        }
    }
}

/// Cutting-zone temperature estimate: T = room + rise_per_speed × V
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThermalConfig {
    pub room_temperature: f64,
    /// °C per m/min, used when a material carries no override
    pub rise_per_speed: f64,
    /// Searched speeds stay below this fraction of the speed that melts the chip
    pub melting_speed_fraction: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            room_temperature: 20.0,
            rise_per_speed: 1.0,
            melting_speed_fraction: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Absolute floor of the speed interval (m/min)
    pub min_cutting_speed: f64,
    /// Speeds giving a longer tool life than this are not searched
    pub max_tool_life_minutes: f64,
    /// Speed ceiling (m/min) for a 100% machinability material
    pub machinability_speed_ceiling: f64,
    pub bisection_steps: u32,
    pub scan_steps: u32,
    pub max_adjust_iterations: u32,
    /// Bisection stops once the bracket is narrower than this (m/min)
    pub speed_tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_cutting_speed: 10.0,
            max_tool_life_minutes: 30.0,
            machinability_speed_ceiling: 1200.0,
            bisection_steps: 40,
            scan_steps: 48,
            max_adjust_iterations: 4,
            speed_tolerance: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngagementConfig {
    /// Radial width of cut as a fraction of diameter (1.0 = full slot)
    pub radial_engagement: f64,
    /// Tool lead angle κ in degrees; h = fz · sin(κ)
    pub lead_angle_deg: f64,
    /// Nominal feed per tooth as a fraction of diameter when the tool has none
    pub feed_per_tooth_ratio: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            radial_engagement: 1.0,
            lead_angle_deg: 90.0,
            feed_per_tooth_ratio: 0.005,
        }
    }
}

/// Shop economics for the Taylor cost optimum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Economics {
    /// Machine and operator rate, currency per minute
    pub machine_rate: f64,
    /// Tool cost per cutting edge
    pub tool_cost: f64,
    /// Minutes lost per tool change
    pub tool_change_minutes: f64,
}

impl Default for Economics {
    fn default() -> Self {
        Self {
            machine_rate: 1.5,
            tool_cost: 12.0,
            tool_change_minutes: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub reference: ReferenceConfig,
    pub thermal: ThermalConfig,
    pub search: SearchConfig,
    pub engagement: EngagementConfig,
    pub economics: Economics,
}

impl EngineConfig {
    /// Load and validate a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject constants the models cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("reference.cutting_speed", self.reference.cutting_speed),
            ("reference.strain_rate", self.reference.strain_rate),
            (
                "reference.shear_zone_thickness",
                self.reference.shear_zone_thickness,
            ),
            ("search.min_cutting_speed", self.search.min_cutting_speed),
            (
                "search.max_tool_life_minutes",
                self.search.max_tool_life_minutes,
            ),
            (
                "search.machinability_speed_ceiling",
                self.search.machinability_speed_ceiling,
            ),
            ("search.speed_tolerance", self.search.speed_tolerance),
            (
                "engagement.feed_per_tooth_ratio",
                self.engagement.feed_per_tooth_ratio,
            ),
            ("economics.machine_rate", self.economics.machine_rate),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    key,
                    value,
                    reason: "must be a positive number",
                });
            }
        }

        let non_negative = [
            ("reference.effective_strain", self.reference.effective_strain),
            ("thermal.rise_per_speed", self.thermal.rise_per_speed),
            ("economics.tool_cost", self.economics.tool_cost),
            (
                "economics.tool_change_minutes",
                self.economics.tool_change_minutes,
            ),
        ];
        for (key, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid {
                    key,
                    value,
                    reason: "must be zero or positive",
                });
            }
        }

        if !self.thermal.room_temperature.is_finite() {
            return Err(ConfigError::Invalid {
                key: "thermal.room_temperature",
                value: self.thermal.room_temperature,
                reason: "must be finite",
            });
        }

        let ae = self.engagement.radial_engagement;
        if !(ae > 0.0 && ae <= 1.0) {
            return Err(ConfigError::Invalid {
                key: "engagement.radial_engagement",
                value: ae,
                reason: "must lie in (0, 1]",
            });
        }

        let fraction = self.thermal.melting_speed_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::Invalid {
                key: "thermal.melting_speed_fraction",
                value: fraction,
                reason: "must lie in (0, 1]",
            });
        }

        let kappa = self.engagement.lead_angle_deg;
        if !(kappa > 0.0 && kappa <= 90.0) {
            return Err(ConfigError::Invalid {
                key: "engagement.lead_angle_deg",
                value: kappa,
                reason: "must lie in (0, 90]",
            });
        }

        if self.search.scan_steps < 2 {
            return Err(ConfigError::Invalid {
                key: "search.scan_steps",
                value: self.search.scan_steps as f64,
                reason: "needs at least two scan points",
            });
        }

        if self.search.max_adjust_iterations == 0 {
            return Err(ConfigError::Invalid {
                key: "search.max_adjust_iterations",
                value: 0.0,
                reason: "needs at least one iteration",
            });
        }

        Ok(())
    }
}
