//! Machining process parameter engine
//!
//! Turns a material's empirical coefficients plus a tool and a machine into a
//! feasible cutting speed at the tool's feed, with the force, torque, power and
//! tool life predicted for it.
//!
//! Models, leaf-first:
//! - [`adapter`] - validated material coefficients
//! - [`kienzle`] - specific cutting force, torque and power
//! - [`johnson_cook`] - thermal / strain-rate softening of the Kienzle force
//! - [`taylor`] - tool life and the economic optimum
//! - [`feasibility`] - spindle speed, power and torque limits
//! - [`optimizer`] - speed search for a stated objective
//!
//! Every call is a pure function of its arguments. An [`Engine`] only carries
//! configuration and can be shared freely between threads.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

use crate::config::{Economics, EngineConfig};

pub mod adapter;
pub mod feasibility;
pub mod johnson_cook;
pub mod kienzle;
pub mod optimizer;
pub mod taylor;

pub use adapter::{
    JohnsonCookCoefficients, KienzleCoefficients, Material, MaterialPhysicalModel,
    TaylorCoefficients,
};
pub use feasibility::{Constraint, ConstraintViolation, Verdict};
pub use optimizer::{Objective, Outcome, ParameterResult, SearchMode};
pub use taylor::EconomicOptimum;

/// Violations raised inside the Kienzle, Johnson-Cook and Taylor models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid chip geometry: {quantity} = {value}")]
    InvalidChipGeometry { quantity: &'static str, value: f64 },

    #[error("cutting zone at {temperature:.0} °C reaches melting point {melting_point:.0} °C")]
    InvalidThermalState {
        temperature: f64,
        melting_point: f64,
    },

    #[error("degenerate tool life: {quantity} = {value}")]
    DegenerateToolLife { quantity: &'static str, value: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid input: {field} = {value} ({reason})")]
    InvalidInput {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("material {material}: {coefficient} = {value} ({reason})")]
    InvalidMaterial {
        material: String,
        coefficient: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("no feasible search space: all {probes} probed speeds failed, last error: {last_error}")]
    NoFeasibleSearchSpace { probes: u32, last_error: ModelError },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Tool coatings and the tool-life multiplier each one earns
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub enum ToolCoating {
    #[serde(rename = "none", alias = "NONE")]
    #[default]
    None,
    #[serde(rename = "TiN", alias = "TIN")]
    TiN,
    #[serde(rename = "TiCN", alias = "TICN")]
    TiCN,
    #[serde(rename = "TiAlN", alias = "TIALN")]
    TiAlN,
    #[serde(rename = "AlTiN", alias = "ALTIN")]
    AlTiN,
    #[serde(rename = "diamond", alias = "DIAMOND")]
    Diamond,
}

impl ToolCoating {
    pub fn life_multiplier(self) -> f64 {
        match self {
            ToolCoating::None => 1.0,
            ToolCoating::TiN => 1.2,
            ToolCoating::TiCN => 1.3,
            ToolCoating::TiAlN => 1.5,
            ToolCoating::AlTiN => 1.6,
            ToolCoating::Diamond => 2.0,
        }
    }
}

impl std::fmt::Display for ToolCoating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolCoating::None => write!(f, "uncoated"),
            ToolCoating::TiN => write!(f, "TiN"),
            ToolCoating::TiCN => write!(f, "TiCN"),
            ToolCoating::TiAlN => write!(f, "TiAlN"),
            ToolCoating::AlTiN => write!(f, "AlTiN"),
            ToolCoating::Diamond => write!(f, "Diamond"),
        }
    }
}

/// Cutter geometry (metric: mm, rev/min)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolGeometry {
    #[serde(default)]
    pub name: String,
    pub diameter: f64,
    pub flute_count: u8,
    pub length_of_cut: f64,
    pub max_rpm: f64,
    #[serde(default)]
    pub coating: ToolCoating,
    /// Overrides the multiplier implied by `coating`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coating_life_multiplier: Option<f64>,
    /// Nominal chip load; falls back to a fraction of the diameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_per_tooth: Option<f64>,
}

impl ToolGeometry {
    /// Dimensionless Taylor life multiplier, always >= 1 for a valid tool
    pub fn life_multiplier(&self) -> f64 {
        self.coating_life_multiplier
            .unwrap_or_else(|| self.coating.life_multiplier())
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        require_positive("tool.diameter", self.diameter)?;
        if self.flute_count < 1 {
            return Err(EngineError::InvalidInput {
                field: "tool.flute_count",
                value: self.flute_count as f64,
                reason: "at least one flute is required",
            });
        }
        require_positive("tool.length_of_cut", self.length_of_cut)?;
        require_positive("tool.max_rpm", self.max_rpm)?;

        let k = self.life_multiplier();
        if !(k.is_finite() && k >= 1.0) {
            return Err(EngineError::InvalidInput {
                field: "tool.coating_life_multiplier",
                value: k,
                reason: "must be at least 1",
            });
        }
        if let Some(fz) = self.feed_per_tooth {
            require_positive("tool.feed_per_tooth", fz)?;
        }
        Ok(())
    }
}

/// Spindle envelope of a machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineEnvelope {
    #[serde(default)]
    pub name: String,
    pub max_rpm: f64,
    /// Continuous spindle power, kW
    #[serde(rename = "max_power_kw")]
    pub max_power: f64,
    /// Spindle torque, N·m
    #[serde(rename = "max_torque_nm")]
    pub max_torque: f64,
}

impl MachineEnvelope {
    pub fn validate(&self) -> Result<(), EngineError> {
        require_positive("machine.max_rpm", self.max_rpm)?;
        require_positive("machine.max_power_kw", self.max_power)?;
        require_positive("machine.max_torque_nm", self.max_torque)?;
        Ok(())
    }
}

/// The unknowns being solved for, plus the fixed engagement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CuttingConditions {
    /// V, m/min
    pub cutting_speed: f64,
    /// fz, mm
    pub feed_per_tooth: f64,
    /// ap, mm
    pub axial_depth: f64,
    /// ae, mm
    pub radial_width: f64,
}

impl CuttingConditions {
    /// n = 1000·V / (π·D)
    pub fn spindle_rpm(&self, diameter: f64) -> f64 {
        kienzle::spindle_rpm(self.cutting_speed, diameter)
    }

    /// h = fz · sin(κ)
    pub fn chip_thickness(&self, lead_angle_deg: f64) -> f64 {
        kienzle::chip_thickness(self.feed_per_tooth, lead_angle_deg)
    }

    /// Table feed vf = fz · z · n, mm/min
    pub fn feed_rate(&self, diameter: f64, flutes: u8) -> f64 {
        self.feed_per_tooth * flutes as f64 * self.spindle_rpm(diameter)
    }

    /// MRR = ap · ae · vf, cm³/min
    pub fn material_removal_rate(&self, diameter: f64, flutes: u8) -> f64 {
        self.axial_depth * self.radial_width * self.feed_rate(diameter, flutes) / 1000.0
    }
}

/// Everything the models predict for one candidate speed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub conditions: CuttingConditions,
    pub spindle_rpm: f64,
    pub chip_thickness: f64,
    /// kc after the Johnson-Cook correction, N/mm²
    pub specific_force: f64,
    pub softening_ratio: f64,
    /// N
    pub tangential_force: f64,
    /// N·m
    pub torque: f64,
    /// kW
    pub power: f64,
    /// minutes
    pub tool_life: f64,
}

/// The parameter engine. Holds configuration only.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Find the best feasible cutting speed for `objective`, using the
    /// configured shop economics.
    pub fn compute_parameters(
        &self,
        material: &Material,
        tool: &ToolGeometry,
        machine: &MachineEnvelope,
        depth_of_cut: f64,
        objective: Objective,
    ) -> Result<ParameterResult, EngineError> {
        self.compute_parameters_with(
            material,
            tool,
            machine,
            depth_of_cut,
            objective,
            self.config.economics,
        )
    }

    /// Same as [`Engine::compute_parameters`] with explicit economics.
    pub fn compute_parameters_with(
        &self,
        material: &Material,
        tool: &ToolGeometry,
        machine: &MachineEnvelope,
        depth_of_cut: f64,
        objective: Objective,
        economics: Economics,
    ) -> Result<ParameterResult, EngineError> {
        validate_request(tool, machine, depth_of_cut)?;
        if let Objective::TargetLife { minutes } = objective {
            require_positive("target_life_minutes", minutes)?;
        }
        validate_economics(&economics)?;

        let conditions = self.conditions(tool, depth_of_cut, 0.0);
        optimizer::Optimizer::new(&self.config, material, tool, machine, conditions, economics)
            .run(objective)
    }

    /// Predict force, power and life at one fixed speed and check it
    /// against the machine.
    pub fn evaluate(
        &self,
        material: &Material,
        tool: &ToolGeometry,
        machine: &MachineEnvelope,
        depth_of_cut: f64,
        cutting_speed: f64,
    ) -> Result<(Evaluation, Verdict), EngineError> {
        validate_request(tool, machine, depth_of_cut)?;
        require_positive("cutting_speed", cutting_speed)?;

        let conditions = self.conditions(tool, depth_of_cut, cutting_speed);
        let optimizer = optimizer::Optimizer::new(
            &self.config,
            material,
            tool,
            machine,
            conditions,
            self.config.economics,
        );
        let evaluation = optimizer.evaluate(cutting_speed)?;
        let verdict = feasibility::check(&evaluation, tool, machine);
        Ok((evaluation, verdict))
    }

    /// Taylor tool life at `cutting_speed`, minutes
    pub fn tool_life(
        &self,
        material: &Material,
        tool: &ToolGeometry,
        cutting_speed: f64,
    ) -> Result<f64, EngineError> {
        tool.validate()?;
        Ok(taylor::tool_life(
            material.taylor(),
            tool.life_multiplier(),
            cutting_speed,
        )?)
    }

    /// Speed that wears the tool out after `minutes`
    pub fn speed_for_life(
        &self,
        material: &Material,
        tool: &ToolGeometry,
        minutes: f64,
    ) -> Result<f64, EngineError> {
        tool.validate()?;
        Ok(taylor::speed_for_life(
            material.taylor(),
            tool.life_multiplier(),
            minutes,
        )?)
    }

    pub fn economic_optimum(
        &self,
        material: &Material,
        tool: &ToolGeometry,
        economics: &Economics,
    ) -> Result<EconomicOptimum, EngineError> {
        tool.validate()?;
        validate_economics(economics)?;
        Ok(taylor::economic_optimum(
            material.taylor(),
            tool.life_multiplier(),
            economics,
        )?)
    }

    /// Nominal chip load used for a tool
    pub fn nominal_feed_per_tooth(&self, tool: &ToolGeometry) -> f64 {
        tool.feed_per_tooth
            .unwrap_or(self.config.engagement.feed_per_tooth_ratio * tool.diameter)
    }

    fn conditions(&self, tool: &ToolGeometry, depth_of_cut: f64, speed: f64) -> CuttingConditions {
        CuttingConditions {
            cutting_speed: speed,
            feed_per_tooth: self.nominal_feed_per_tooth(tool),
            axial_depth: depth_of_cut,
            radial_width: self.config.engagement.radial_engagement * tool.diameter,
        }
    }
}

fn validate_request(
    tool: &ToolGeometry,
    machine: &MachineEnvelope,
    depth_of_cut: f64,
) -> Result<(), EngineError> {
    tool.validate()?;
    machine.validate()?;
    require_positive("depth_of_cut", depth_of_cut)?;
    if depth_of_cut > tool.length_of_cut {
        return Err(EngineError::InvalidInput {
            field: "depth_of_cut",
            value: depth_of_cut,
            reason: "deeper than the tool's length of cut",
        });
    }
    Ok(())
}

fn validate_economics(economics: &Economics) -> Result<(), EngineError> {
    require_positive("economics.machine_rate", economics.machine_rate)?;
    for (field, value) in [
        ("economics.tool_cost", economics.tool_cost),
        ("economics.tool_change_minutes", economics.tool_change_minutes),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(EngineError::InvalidInput {
                field,
                value,
                reason: "must be zero or positive",
            });
        }
    }
    Ok(())
}

fn require_positive(field: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidInput {
            field,
            value,
            reason: "must be a positive number",
        })
    }
}

/// Surface speed implied by a spindle speed, m/min
pub fn surface_speed(spindle_rpm: f64, diameter: f64) -> f64 {
    PI * diameter * spindle_rpm / 1000.0
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_rpm_from_surface_speed() {
        let c = CuttingConditions {
            cutting_speed: 100.0,
            feed_per_tooth: 0.1,
            axial_depth: 3.0,
            radial_width: 12.0,
        };
        let rpm = c.spindle_rpm(10.0);
        assert!((rpm - 3183.1).abs() < 0.1, "rpm = {}", rpm);
        assert!((surface_speed(rpm, 10.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_material_removal_rate() {
        let c = CuttingConditions {
            cutting_speed: 100.0,
            feed_per_tooth: 0.1,
            axial_depth: 3.0,
            radial_width: 12.0,
        };
        // vf = 0.1 * 4 * 2652.6 = 1061 mm/min
        let vf = c.feed_rate(12.0, 4);
        assert!((vf - 1061.03).abs() < 0.1, "vf = {}", vf);
        let mrr = c.material_removal_rate(12.0, 4);
        assert!((mrr - 38.197).abs() < 0.01, "mrr = {}", mrr);
    }

    #[test]
    fn test_coating_multiplier() {
        let mut tool = end_mill();
        assert_eq!(tool.life_multiplier(), 1.5);
        tool.coating_life_multiplier = Some(1.1);
        assert_eq!(tool.life_multiplier(), 1.1);
        tool.coating_life_multiplier = Some(0.8);
        assert!(tool.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_requests() {
        let engine = Engine::default();
        let steel = bearing_steel();

        let mut tool = end_mill();
        tool.diameter = 0.0;
        let err = engine
            .compute_parameters(&steel, &tool, &machine(15.0), 3.0, Objective::MaxMrr)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidInput {
                field: "tool.diameter",
                ..
            }
        ));

        let mut tool = end_mill();
        tool.flute_count = 0;
        assert!(engine
            .compute_parameters(&steel, &tool, &machine(15.0), 3.0, Objective::MaxMrr)
            .is_err());

        let err = engine
            .compute_parameters(&steel, &end_mill(), &machine(15.0), 0.0, Objective::MaxMrr)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidInput {
                field: "depth_of_cut",
                ..
            }
        ));

        let err = engine
            .compute_parameters(
                &steel,
                &end_mill(),
                &machine(15.0),
                3.0,
                Objective::TargetLife { minutes: -5.0 },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidInput {
                field: "target_life_minutes",
                ..
            }
        ));
    }

    #[test]
    fn test_depth_limited_by_length_of_cut() {
        let engine = Engine::default();
        let err = engine
            .compute_parameters(
                &bearing_steel(),
                &end_mill(),
                &machine(15.0),
                30.0,
                Objective::MaxMrr,
            )
            .unwrap_err();
        assert!(err.to_string().contains("length of cut"));
    }

    #[test]
    fn test_default_feed_from_diameter() {
        let engine = Engine::default();
        let mut tool = end_mill();
        tool.feed_per_tooth = None;
        assert!((engine.nominal_feed_per_tooth(&tool) - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_fixed_speed() {
        let engine = Engine::default();
        let (eval, verdict) = engine
            .evaluate(&bearing_steel(), &end_mill(), &machine(15.0), 3.0, 200.0)
            .unwrap();
        assert!(verdict.is_feasible());
        assert!(eval.power > 0.0 && eval.torque > 0.0);
        assert!((eval.spindle_rpm - 5305.2).abs() < 0.1);
    }
}
