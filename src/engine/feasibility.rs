//! Hard-limit checks against the tool and machine

use serde::{Deserialize, Serialize};

use super::{Evaluation, MachineEnvelope, ToolGeometry};

/// A machine or tool hard limit. Ordering is the canonical report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    SpindleSpeed,
    Power,
    Torque,
}

impl Constraint {
    pub const ALL: [Constraint; 3] = [Constraint::SpindleSpeed, Constraint::Power, Constraint::Torque];

    pub fn limit(self, tool: &ToolGeometry, machine: &MachineEnvelope) -> f64 {
        match self {
            Constraint::SpindleSpeed => machine.max_rpm.min(tool.max_rpm),
            Constraint::Power => machine.max_power,
            Constraint::Torque => machine.max_torque,
        }
    }

    pub fn actual(self, candidate: &Evaluation) -> f64 {
        match self {
            Constraint::SpindleSpeed => candidate.spindle_rpm,
            Constraint::Power => candidate.power,
            Constraint::Torque => candidate.torque,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Constraint::SpindleSpeed => "rpm",
            Constraint::Power => "kW",
            Constraint::Torque => "N·m",
        }
    }

    fn check(
        self,
        candidate: &Evaluation,
        tool: &ToolGeometry,
        machine: &MachineEnvelope,
    ) -> Option<ConstraintViolation> {
        let limit = self.limit(tool, machine);
        let actual = self.actual(candidate);
        (actual > limit).then(|| ConstraintViolation {
            constraint: self,
            limit,
            actual,
            margin: actual - limit,
        })
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::SpindleSpeed => write!(f, "spindle speed"),
            Constraint::Power => write!(f, "power"),
            Constraint::Torque => write!(f, "torque"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConstraintViolation {
    pub constraint: Constraint,
    pub limit: f64,
    pub actual: f64,
    /// actual - limit
    pub margin: f64,
}

impl ConstraintViolation {
    /// Margin relative to the limit
    pub fn overshoot(&self) -> f64 {
        self.margin / self.limit
    }
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = self.constraint.unit();
        write!(
            f,
            "{} {:.2} {} exceeds limit {:.2} {} by {:.2} {} ({:.0}%)",
            self.constraint,
            self.actual,
            unit,
            self.limit,
            unit,
            self.margin,
            unit,
            self.overshoot() * 100.0
        )
    }
}

/// Outcome of a feasibility check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    pub violations: Vec<ConstraintViolation>,
}

impl Verdict {
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }

    /// Sum of relative overshoots, 0 when feasible
    pub fn total_overshoot(&self) -> f64 {
        self.violations.iter().map(|v| v.overshoot()).sum()
    }
}

/// Check every limit and report all that are exceeded
pub fn check(candidate: &Evaluation, tool: &ToolGeometry, machine: &MachineEnvelope) -> Verdict {
    check_in_order(candidate, tool, machine, &Constraint::ALL)
}

/// Check the given constraints in the given order. The verdict is the same
/// for any ordering of the same set.
pub fn check_in_order(
    candidate: &Evaluation,
    tool: &ToolGeometry,
    machine: &MachineEnvelope,
    order: &[Constraint],
) -> Verdict {
    let mut violations: Vec<ConstraintViolation> = order
        .iter()
        .filter_map(|c| c.check(candidate, tool, machine))
        .collect();
    violations.sort_by_key(|v| v.constraint);
    violations.dedup_by_key(|v| v.constraint);
    Verdict { violations }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{end_mill, machine};
    use super::super::CuttingConditions;
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate(rpm: f64, power: f64, torque: f64) -> Evaluation {
        Evaluation {
            conditions: CuttingConditions {
                cutting_speed: 100.0,
                feed_per_tooth: 0.1,
                axial_depth: 3.0,
                radial_width: 12.0,
            },
            spindle_rpm: rpm,
            chip_thickness: 0.1,
            specific_force: 3000.0,
            softening_ratio: 1.0,
            tangential_force: 1000.0,
            torque,
            power,
            tool_life: 10.0,
        }
    }

    #[test]
    fn test_within_limits() {
        let verdict = check(&candidate(8000.0, 10.0, 50.0), &end_mill(), &machine(15.0));
        assert!(verdict.is_feasible());
        assert_eq!(verdict.total_overshoot(), 0.0);
    }

    #[test]
    fn test_tool_rpm_limit_applies() {
        let mut tool = end_mill();
        tool.max_rpm = 6000.0;
        let verdict = check(&candidate(8000.0, 1.0, 1.0), &tool, &machine(15.0));
        assert_eq!(
            verdict.violations,
            vec![ConstraintViolation {
                constraint: Constraint::SpindleSpeed,
                limit: 6000.0,
                actual: 8000.0,
                margin: 2000.0,
            }]
        );
    }

    #[test]
    fn test_reports_every_violation() {
        let verdict = check(&candidate(13000.0, 3.0, 150.0), &end_mill(), &machine(2.0));
        let constraints: Vec<_> = verdict.violations.iter().map(|v| v.constraint).collect();
        assert_eq!(
            constraints,
            vec![Constraint::SpindleSpeed, Constraint::Power, Constraint::Torque]
        );
        assert!((verdict.violations[1].margin - 1.0).abs() < 1e-12);
        assert!((verdict.violations[1].overshoot() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_order_does_not_matter() {
        let c = candidate(13000.0, 3.0, 150.0);
        let forward = check(&c, &end_mill(), &machine(2.0));
        let reverse = check_in_order(
            &c,
            &end_mill(),
            &machine(2.0),
            &[Constraint::Torque, Constraint::Power, Constraint::SpindleSpeed],
        );
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_limit_is_inclusive() {
        let verdict = check(&candidate(12000.0, 15.0, 120.0), &end_mill(), &machine(15.0));
        assert!(verdict.is_feasible());
    }

    #[test]
    fn test_violation_message() {
        let verdict = check(&candidate(1000.0, 3.0, 1.0), &end_mill(), &machine(2.0));
        assert_eq!(
            verdict.violations[0].to_string(),
            "power 3.00 kW exceeds limit 2.00 kW by 1.00 kW (50%)"
        );
    }
}
