//! Taylor tool life
//!
//! V · T^n = C, with a coating multiplier on life:
//! T = k · (C/V)^(1/n) and inversely V = C · (k/T)^n.

use serde::{Deserialize, Serialize};

use super::{ModelError, TaylorCoefficients};
use crate::config::Economics;

/// Tool life / speed pair that minimizes machining cost
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EconomicOptimum {
    /// minutes
    pub tool_life: f64,
    /// m/min
    pub cutting_speed: f64,
}

fn degenerate(quantity: &'static str, value: f64) -> ModelError {
    ModelError::DegenerateToolLife { quantity, value }
}

fn check_coefficients(t: &TaylorCoefficients, coating_multiplier: f64) -> Result<(), ModelError> {
    if !(t.n.is_finite() && t.n > 0.0) {
        return Err(degenerate("taylor.n", t.n));
    }
    if !(t.c.is_finite() && t.c > 0.0) {
        return Err(degenerate("taylor.c", t.c));
    }
    if !(coating_multiplier.is_finite() && coating_multiplier > 0.0) {
        return Err(degenerate("coating_multiplier", coating_multiplier));
    }
    Ok(())
}

/// Tool life in minutes at `cutting_speed` (m/min)
pub fn tool_life(
    t: &TaylorCoefficients,
    coating_multiplier: f64,
    cutting_speed: f64,
) -> Result<f64, ModelError> {
    check_coefficients(t, coating_multiplier)?;
    if !(cutting_speed.is_finite() && cutting_speed > 0.0) {
        return Err(degenerate("cutting_speed", cutting_speed));
    }

    let life = coating_multiplier * (t.c / cutting_speed).powf(1.0 / t.n);
    if !life.is_finite() {
        return Err(degenerate("tool_life", life));
    }
    Ok(life)
}

/// Cutting speed in m/min that yields `life` minutes
pub fn speed_for_life(
    t: &TaylorCoefficients,
    coating_multiplier: f64,
    life: f64,
) -> Result<f64, ModelError> {
    check_coefficients(t, coating_multiplier)?;
    if !(life.is_finite() && life > 0.0) {
        return Err(degenerate("tool_life", life));
    }

    let speed = t.c * (coating_multiplier / life).powf(t.n);
    if !(speed.is_finite() && speed > 0.0) {
        return Err(degenerate("cutting_speed", speed));
    }
    Ok(speed)
}

/// Minimum-cost tool life: T_opt = (1/n − 1) · (tc + Ct/Cm)
pub fn economic_optimum(
    t: &TaylorCoefficients,
    coating_multiplier: f64,
    economics: &Economics,
) -> Result<EconomicOptimum, ModelError> {
    check_coefficients(t, coating_multiplier)?;
    if !(economics.machine_rate.is_finite() && economics.machine_rate > 0.0) {
        return Err(degenerate("machine_rate", economics.machine_rate));
    }

    let life = (1.0 / t.n - 1.0)
        * (economics.tool_change_minutes + economics.tool_cost / economics.machine_rate);
    // n = 1 or free tools: no finite optimum
    if !(life.is_finite() && life > 0.0) {
        return Err(degenerate("economic_tool_life", life));
    }

    Ok(EconomicOptimum {
        tool_life: life,
        cutting_speed: speed_for_life(t, coating_multiplier, life)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEEL: TaylorCoefficients = TaylorCoefficients { c: 150.0, n: 0.21 };

    #[test]
    fn test_life_at_taylor_constant() {
        // V = C gives one minute for an uncoated tool
        let life = tool_life(&STEEL, 1.0, 150.0).unwrap();
        assert!((life - 1.0).abs() < 1e-12);
        let coated = tool_life(&STEEL, 1.5, 150.0).unwrap();
        assert!((coated - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_faster_wears_sooner() {
        let slow = tool_life(&STEEL, 1.0, 80.0).unwrap();
        let fast = tool_life(&STEEL, 1.0, 160.0).unwrap();
        assert!(fast < slow);
    }

    #[test]
    fn test_inverse() {
        // Uncoated: V = C / T^n
        let v = speed_for_life(&STEEL, 1.0, 30.0).unwrap();
        assert!((v - 150.0 / 30.0_f64.powf(0.21)).abs() < 1e-9);
        let back = tool_life(&STEEL, 1.0, v).unwrap();
        assert!((back - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_speed_is_degenerate() {
        let err = tool_life(&STEEL, 1.0, 0.0).unwrap_err();
        assert_eq!(
            err,
            ModelError::DegenerateToolLife {
                quantity: "cutting_speed",
                value: 0.0
            }
        );
    }

    #[test]
    fn test_zero_exponent_is_degenerate() {
        let t = TaylorCoefficients { c: 150.0, n: 0.0 };
        let err = tool_life(&t, 1.0, 100.0).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DegenerateToolLife {
                quantity: "taylor.n",
                ..
            }
        ));
    }

    #[test]
    fn test_overflowing_life_is_degenerate() {
        let t = TaylorCoefficients { c: 150.0, n: 1e-4 };
        assert!(tool_life(&t, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_economic_optimum() {
        let economics = Economics {
            machine_rate: 1.5,
            tool_cost: 12.0,
            tool_change_minutes: 0.0,
        };
        let opt = economic_optimum(&STEEL, 1.0, &economics).unwrap();
        // (1/0.21 - 1) * 8
        assert!((opt.tool_life - 30.0952).abs() < 1e-3, "T = {}", opt.tool_life);
        assert!((opt.cutting_speed - 150.0 / opt.tool_life.powf(0.21)).abs() < 1e-9);
    }

    #[test]
    fn test_tool_change_time_extends_life() {
        let base = Economics::default();
        let with_change = Economics {
            tool_change_minutes: 2.0,
            ..base
        };
        let a = economic_optimum(&STEEL, 1.0, &base).unwrap();
        let b = economic_optimum(&STEEL, 1.0, &with_change).unwrap();
        assert!(b.tool_life > a.tool_life);
        assert!(b.cutting_speed < a.cutting_speed);
    }

    #[test]
    fn test_unit_exponent_has_no_optimum() {
        let t = TaylorCoefficients { c: 150.0, n: 1.0 };
        assert!(economic_optimum(&t, 1.0, &Economics::default()).is_err());
    }
}
