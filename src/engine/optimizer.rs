//! Parameter optimizer
//!
//! Searches cutting speed at the tool's nominal feed:
//!
//! 1. Bound the speed interval by the spindle ceiling, the material's
//!    machinability, a margin below the melting speed and the longest useful
//!    tool life.
//! 2. Bisect for the fastest feasible speed. When the slow end of the interval
//!    is already infeasible a coarse linear scan looks for feasible speeds
//!    above it.
//! 3. Pull the speed down to the economic or target-life speed if the
//!    objective asks for it.
//! 4. Re-check the adjusted speed a bounded number of times.
//! 5. Emit a fully populated [`ParameterResult`], feasible or not.
//!
//! Every loop is bounded by [`SearchConfig`](crate::config::SearchConfig).

use serde::{Deserialize, Serialize};

use super::feasibility::{self, Constraint, ConstraintViolation, Verdict};
use super::johnson_cook::FlowStressModel;
use super::{
    kienzle, surface_speed, taylor, CuttingConditions, EngineError, Evaluation,
    MachineEnvelope, Material, ModelError, ToolGeometry,
};
use crate::config::{Economics, EngineConfig};

/// What the search optimizes for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum Objective {
    /// Fastest feasible speed
    #[serde(rename = "maxMRR")]
    MaxMrr,
    /// Taylor economic speed, capped by feasibility
    #[serde(rename = "minCost")]
    MinCost,
    /// Speed that wears the tool out after `minutes`
    #[serde(rename = "targetLife")]
    TargetLife { minutes: f64 },
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Objective::MaxMrr => write!(f, "maxMRR"),
            Objective::MinCost => write!(f, "minCost"),
            Objective::TargetLife { minutes } => write!(f, "targetLife({} min)", minutes),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Bisection,
    /// Degraded: a feasible speed was found above an infeasible one
    Scan,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    FeasibleConverged,
    /// Feasible boundary, the objective's speed never satisfied the limits
    FeasibleNotConverged,
    Infeasible,
}

/// Final answer for one request. Always populated; an infeasible result
/// carries the closest attempt and what it violated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterResult {
    pub feasible: bool,
    pub converged: bool,
    pub outcome: Outcome,
    pub search_mode: SearchMode,
    pub objective: Objective,
    /// m/min
    pub cutting_speed: f64,
    /// mm
    pub feed_per_tooth: f64,
    pub axial_depth: f64,
    pub radial_width: f64,
    pub spindle_rpm: f64,
    /// mm/min
    pub feed_rate: f64,
    /// mm
    pub chip_thickness: f64,
    /// N/mm², after thermal correction
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
    /// cm³/min
    pub material_removal_rate: f64,
    /// MRR for maxMRR, cost per cm³ for minCost, tool life for targetLife
    pub objective_value: f64,
    /// Life-adjust rounds taken
    pub iterations: u32,
    /// Model evaluations spent
    pub probes: u32,
    pub violations: Vec<ConstraintViolation>,
    pub warnings: Vec<String>,
}

/// Relative distance within which a computed spindle speed is taken to be
/// the spindle ceiling itself
const RPM_ROUNDING: f64 = 1e-9;

enum Probe {
    Feasible(Evaluation),
    Infeasible(Evaluation, Verdict),
    Failed(ModelError),
}

#[derive(Default)]
struct Search {
    probes: u32,
    last_error: Option<ModelError>,
    best_attempt: Option<(Evaluation, Verdict)>,
}

impl Search {
    fn record(&mut self, probe: &Probe) {
        self.probes += 1;
        match probe {
            Probe::Feasible(_) => {}
            Probe::Infeasible(eval, verdict) => {
                let closer = self
                    .best_attempt
                    .as_ref()
                    .map_or(true, |(_, best)| verdict.total_overshoot() < best.total_overshoot());
                if closer {
                    self.best_attempt = Some((*eval, verdict.clone()));
                }
            }
            Probe::Failed(err) => self.last_error = Some(err.clone()),
        }
    }
}

pub(crate) struct Optimizer<'a> {
    config: &'a EngineConfig,
    material: &'a Material,
    tool: &'a ToolGeometry,
    machine: &'a MachineEnvelope,
    base: CuttingConditions,
    economics: Economics,
    flow: FlowStressModel,
}

impl<'a> Optimizer<'a> {
    pub(crate) fn new(
        config: &'a EngineConfig,
        material: &'a Material,
        tool: &'a ToolGeometry,
        machine: &'a MachineEnvelope,
        base: CuttingConditions,
        economics: Economics,
    ) -> Self {
        Self {
            config,
            material,
            tool,
            machine,
            base,
            economics,
            flow: FlowStressModel::new(material, config),
        }
    }

    /// Run every model at one speed
    pub(crate) fn evaluate(&self, cutting_speed: f64) -> Result<Evaluation, ModelError> {
        let conditions = CuttingConditions {
            cutting_speed,
            ..self.base
        };
        let diameter = self.tool.diameter;
        // Speeds derived from the ceiling come back within a few ulps of it
        let rpm_ceiling = self.rpm_ceiling();
        let spindle_rpm = match conditions.spindle_rpm(diameter) {
            rpm if (rpm - rpm_ceiling).abs() <= RPM_ROUNDING * rpm_ceiling => rpm_ceiling,
            rpm => rpm,
        };
        let chip_thickness = conditions.chip_thickness(self.config.engagement.lead_angle_deg);

        let softening_ratio = self.flow.softening_ratio(cutting_speed)?;
        let cut = kienzle::CutGeometry {
            chip_thickness,
            width: conditions.axial_depth,
            engaged_flutes: kienzle::engaged_flutes(
                self.tool.flute_count,
                conditions.radial_width,
                diameter,
            ),
        };
        let load = kienzle::cutting_load(
            self.material.kienzle(),
            &cut,
            diameter,
            spindle_rpm,
            softening_ratio,
        )?;
        let tool_life = taylor::tool_life(
            self.material.taylor(),
            self.tool.life_multiplier(),
            cutting_speed,
        )?;

        Ok(Evaluation {
            conditions,
            spindle_rpm,
            chip_thickness,
            specific_force: load.specific_force,
            softening_ratio,
            tangential_force: load.tangential_force,
            torque: load.torque,
            power: load.power,
            tool_life,
        })
    }

    fn probe(&self, cutting_speed: f64, search: &mut Search) -> Probe {
        let probe = match self.evaluate(cutting_speed) {
            Ok(eval) => {
                let verdict = feasibility::check(&eval, self.tool, self.machine);
                if verdict.is_feasible() {
                    Probe::Feasible(eval)
                } else {
                    Probe::Infeasible(eval, verdict)
                }
            }
            Err(err) => Probe::Failed(err),
        };
        search.record(&probe);
        probe
    }

    fn rpm_ceiling(&self) -> f64 {
        Constraint::SpindleSpeed.limit(self.tool, self.machine)
    }

    /// Search interval (lo, hi) in m/min, lo < hi
    fn speed_bounds(&self, warnings: &mut Vec<String>) -> (f64, f64) {
        let s = &self.config.search;

        let by_rpm = surface_speed(self.rpm_ceiling(), self.tool.diameter);
        let by_machinability =
            self.material.machinability_rating() / 100.0 * s.machinability_speed_ceiling;
        let by_melting =
            self.config.thermal.melting_speed_fraction * self.flow.thermal_speed_limit();

        let hi = by_rpm.min(by_machinability);
        let hi = if by_melting < hi {
            warnings.push(format!(
                "Speed capped at {:.1} m/min to stay clear of the {:.0} °C melting point",
                by_melting,
                self.material.melting_point()
            ));
            by_melting
        } else {
            hi
        };

        let by_life = taylor::speed_for_life(
            self.material.taylor(),
            self.tool.life_multiplier(),
            s.max_tool_life_minutes,
        )
        .unwrap_or(s.min_cutting_speed);
        let lo = s.min_cutting_speed.max(by_life);

        if lo < hi {
            (lo, hi)
        } else {
            (s.min_cutting_speed.min(hi / 2.0), hi)
        }
    }

    /// Fastest feasible speed in [lo, hi]
    fn find_boundary(&self, lo: f64, hi: f64, search: &mut Search) -> (SearchMode, Option<Evaluation>) {
        let mut feasible = match self.probe(lo, search) {
            Probe::Feasible(eval) => eval,
            _ => {
                return match self.scan(lo, hi, search) {
                    Some(eval) => (SearchMode::Scan, Some(eval)),
                    None => (SearchMode::Bisection, None),
                }
            }
        };
        if let Probe::Feasible(eval) = self.probe(hi, search) {
            return (SearchMode::Bisection, Some(eval));
        }

        let s = &self.config.search;
        let (mut a, mut b) = (lo, hi);
        for _ in 0..s.bisection_steps {
            if b - a <= s.speed_tolerance {
                break;
            }
            let mid = 0.5 * (a + b);
            match self.probe(mid, search) {
                Probe::Feasible(eval) => {
                    a = mid;
                    feasible = eval;
                }
                _ => b = mid,
            }
        }
        (SearchMode::Bisection, Some(feasible))
    }

    /// Walk down from `hi` and stop at the first feasible speed
    fn scan(&self, lo: f64, hi: f64, search: &mut Search) -> Option<Evaluation> {
        let steps = self.config.search.scan_steps.max(1);
        for i in (0..=steps).rev() {
            let speed = lo + (hi - lo) * i as f64 / steps as f64;
            if let Probe::Feasible(eval) = self.probe(speed, search) {
                return Some(eval);
            }
        }
        None
    }

    /// Speed the objective would rather run at, if any
    fn life_target(&self, objective: Objective, warnings: &mut Vec<String>) -> Option<f64> {
        let taylor = self.material.taylor();
        let k = self.tool.life_multiplier();
        match objective {
            Objective::MaxMrr => None,
            Objective::MinCost => match taylor::economic_optimum(taylor, k, &self.economics) {
                Ok(opt) => Some(opt.cutting_speed),
                Err(err) => {
                    warnings.push(format!(
                        "No economic optimum ({}); keeping the fastest feasible speed",
                        err
                    ));
                    None
                }
            },
            Objective::TargetLife { minutes } => match taylor::speed_for_life(taylor, k, minutes) {
                Ok(speed) => Some(speed),
                Err(err) => {
                    warnings.push(format!(
                        "Cannot solve for a {} min tool life ({}); keeping the fastest feasible speed",
                        minutes, err
                    ));
                    None
                }
            },
        }
    }

    /// Re-check `target` until it satisfies the limits, moving it halfway
    /// toward the feasible boundary after each miss.
    fn converge(
        &self,
        target: f64,
        boundary: &Evaluation,
        search: &mut Search,
        warnings: &mut Vec<String>,
    ) -> (Evaluation, Outcome, u32) {
        let cap = self.config.search.max_adjust_iterations;
        let feasible_speed = boundary.conditions.cutting_speed;

        let mut candidate = target;
        for iteration in 1..=cap {
            if let Probe::Feasible(eval) = self.probe(candidate, search) {
                return (eval, Outcome::FeasibleConverged, iteration);
            }
            candidate = 0.5 * (candidate + feasible_speed);
        }

        warnings.push(format!(
            "Adjusted speed {:.1} m/min still violates machine limits after {} iterations; reporting {:.1} m/min",
            target, cap, feasible_speed
        ));
        (*boundary, Outcome::FeasibleNotConverged, cap)
    }

    pub(crate) fn run(self, objective: Objective) -> Result<ParameterResult, EngineError> {
        let mut warnings = Vec::new();
        let (lo, hi) = self.speed_bounds(&mut warnings);
        let mut search = Search::default();

        let (mode, boundary) = self.find_boundary(lo, hi, &mut search);

        let boundary = match boundary {
            Some(eval) => eval,
            None => {
                let probes = search.probes;
                return match (search.best_attempt, search.last_error) {
                    (Some((eval, verdict)), _) => Ok(self.emit(
                        eval,
                        verdict.violations,
                        objective,
                        mode,
                        Outcome::Infeasible,
                        0,
                        probes,
                        warnings,
                    )),
                    (None, Some(last_error)) => Err(EngineError::NoFeasibleSearchSpace {
                        probes,
                        last_error,
                    }),
                    (None, None) => Err(EngineError::InvalidInput {
                        field: "search_interval",
                        value: hi,
                        reason: "no speed could be probed",
                    }),
                };
            }
        };

        let feasible_speed = boundary.conditions.cutting_speed;
        let (result, outcome, iterations) = match self.life_target(objective, &mut warnings) {
            Some(target) if target < feasible_speed => {
                self.converge(target, &boundary, &mut search, &mut warnings)
            }
            Some(target) => {
                match objective {
                    Objective::TargetLife { minutes } => warnings.push(format!(
                        "A {} min tool life needs {:.1} m/min; machine limits cap speed at {:.1} m/min, so the tool lasts {:.1} min",
                        minutes, target, feasible_speed, boundary.tool_life
                    )),
                    _ => warnings.push(format!(
                        "Economic speed {:.1} m/min is above the feasible {:.1} m/min",
                        target, feasible_speed
                    )),
                }
                (boundary, Outcome::FeasibleConverged, 0)
            }
            None => (boundary, Outcome::FeasibleConverged, 0),
        };

        if result.tool_life < 1.0 {
            warnings.push(format!(
                "Predicted tool life {:.2} min is under one minute",
                result.tool_life
            ));
        }

        Ok(self.emit(
            result,
            Vec::new(),
            objective,
            mode,
            outcome,
            iterations,
            search.probes,
            warnings,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        eval: Evaluation,
        violations: Vec<ConstraintViolation>,
        objective: Objective,
        search_mode: SearchMode,
        outcome: Outcome,
        iterations: u32,
        probes: u32,
        warnings: Vec<String>,
    ) -> ParameterResult {
        let c = &eval.conditions;
        let diameter = self.tool.diameter;
        let flutes = self.tool.flute_count;
        let material_removal_rate = c.material_removal_rate(diameter, flutes);

        let objective_value = match objective {
            Objective::MaxMrr => material_removal_rate,
            Objective::MinCost => self.cost_per_volume(&eval, material_removal_rate),
            Objective::TargetLife { .. } => eval.tool_life,
        };

        ParameterResult {
            feasible: outcome != Outcome::Infeasible,
            converged: outcome == Outcome::FeasibleConverged,
            outcome,
            search_mode,
            objective,
            cutting_speed: c.cutting_speed,
            feed_per_tooth: c.feed_per_tooth,
            axial_depth: c.axial_depth,
            radial_width: c.radial_width,
            spindle_rpm: eval.spindle_rpm,
            feed_rate: c.feed_rate(diameter, flutes),
            chip_thickness: eval.chip_thickness,
            specific_force: eval.specific_force,
            softening_ratio: eval.softening_ratio,
            tangential_force: eval.tangential_force,
            torque: eval.torque,
            power: eval.power,
            tool_life: eval.tool_life,
            material_removal_rate,
            objective_value,
            iterations,
            probes,
            violations,
            warnings,
        }
    }

    /// Machine time plus amortized tool cost per cm³ removed
    fn cost_per_volume(&self, eval: &Evaluation, material_removal_rate: f64) -> f64 {
        let e = &self.economics;
        let per_minute =
            e.machine_rate + (e.machine_rate * e.tool_change_minutes + e.tool_cost) / eval.tool_life;
        per_minute / material_removal_rate
    }
}
