//! Kienzle specific cutting force model
//!
//! kc = kc1_1 · h^(-mc), Fc = kc · b · h · z_eng. Torque and power follow from
//! the cutter radius and spindle speed. The Kienzle coefficients are
//! calibrated near conventional speeds; callers pass the Johnson-Cook
//! softening ratio r(V) and every reported quantity uses kc · r(V).

use std::f64::consts::PI;

use super::{KienzleCoefficients, ModelError};

/// Chip cross-section seen by the cutter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutGeometry {
    /// Uncut chip thickness h, mm
    pub chip_thickness: f64,
    /// Width of cut b (axial depth for an end mill), mm
    pub width: f64,
    /// Average number of flutes in the cut
    pub engaged_flutes: f64,
}

/// Force, torque and power for one cut
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuttingLoad {
    /// N/mm²
    pub specific_force: f64,
    /// N
    pub tangential_force: f64,
    /// N·m
    pub torque: f64,
    /// kW
    pub power: f64,
}

/// Uncorrected specific cutting force kc, N/mm²
pub fn specific_force(k: &KienzleCoefficients, chip_thickness: f64) -> Result<f64, ModelError> {
    if !(chip_thickness.is_finite() && chip_thickness > 0.0) {
        return Err(ModelError::InvalidChipGeometry {
            quantity: "chip_thickness",
            value: chip_thickness,
        });
    }
    Ok(k.kc1_1 * chip_thickness.powf(-k.mc))
}

/// Cutting force, torque and power with kc scaled by `softening_ratio`
pub fn cutting_load(
    k: &KienzleCoefficients,
    cut: &CutGeometry,
    diameter: f64,
    spindle_rpm: f64,
    softening_ratio: f64,
) -> Result<CuttingLoad, ModelError> {
    let kc = specific_force(k, cut.chip_thickness)? * softening_ratio;

    if !(cut.width.is_finite() && cut.width > 0.0) {
        return Err(ModelError::InvalidChipGeometry {
            quantity: "width_of_cut",
            value: cut.width,
        });
    }
    if !(cut.engaged_flutes.is_finite() && cut.engaged_flutes > 0.0) {
        return Err(ModelError::InvalidChipGeometry {
            quantity: "engaged_flutes",
            value: cut.engaged_flutes,
        });
    }

    let tangential_force = kc * cut.width * cut.chip_thickness * cut.engaged_flutes;
    // D in mm -> lever arm in m
    let torque = tangential_force * diameter / 2000.0;
    let omega = 2.0 * PI * spindle_rpm / 60.0;
    let power = torque * omega / 1000.0;

    if !(tangential_force.is_finite() && power.is_finite()) {
        return Err(ModelError::InvalidChipGeometry {
            quantity: "tangential_force",
            value: tangential_force,
        });
    }

    Ok(CuttingLoad {
        specific_force: kc,
        tangential_force,
        torque,
        power,
    })
}

/// n = 1000·V / (π·D), rev/min
pub fn spindle_rpm(cutting_speed: f64, diameter: f64) -> f64 {
    1000.0 * cutting_speed / (PI * diameter)
}

/// h = fz · sin(κ)
pub fn chip_thickness(feed_per_tooth: f64, lead_angle_deg: f64) -> f64 {
    feed_per_tooth * lead_angle_deg.to_radians().sin()
}

/// z_eng = z · φ / 2π with immersion angle φ = arccos(1 - 2·ae/D)
pub fn engaged_flutes(flutes: u8, radial_width: f64, diameter: f64) -> f64 {
    let ratio = (radial_width / diameter).clamp(0.0, 1.0);
    let immersion = (1.0 - 2.0 * ratio).acos();
    flutes as f64 * immersion / (2.0 * PI)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEEL: KienzleCoefficients = KienzleCoefficients {
        kc1_1: 1880.0,
        mc: 0.24,
    };

    #[test]
    fn test_specific_force_at_unit_chip() {
        let kc = specific_force(&STEEL, 1.0).unwrap();
        assert!((kc - 1880.0).abs() < 1e-9);
    }

    #[test]
    fn test_thin_chips_cut_harder() {
        let thin = specific_force(&STEEL, 0.05).unwrap();
        let thick = specific_force(&STEEL, 0.2).unwrap();
        assert!(thin > thick);
        // 1880 * 0.1^-0.24 = 3267.1
        let kc = specific_force(&STEEL, 0.1).unwrap();
        assert!((kc - 3267.1).abs() < 0.1, "kc = {}", kc);
    }

    #[test]
    fn test_rejects_zero_chip() {
        let err = specific_force(&STEEL, 0.0).unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidChipGeometry {
                quantity: "chip_thickness",
                value: 0.0
            }
        );
    }

    #[test]
    fn test_rejects_zero_width() {
        let cut = CutGeometry {
            chip_thickness: 0.1,
            width: 0.0,
            engaged_flutes: 2.0,
        };
        let err = cutting_load(&STEEL, &cut, 12.0, 5000.0, 1.0).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidChipGeometry {
                quantity: "width_of_cut",
                ..
            }
        ));
    }

    #[test]
    fn test_load_slotting() {
        let cut = CutGeometry {
            chip_thickness: 0.1,
            width: 3.0,
            engaged_flutes: engaged_flutes(4, 12.0, 12.0),
        };
        let load = cutting_load(&STEEL, &cut, 12.0, 5000.0, 1.0).unwrap();

        // Fc = 3267.1 * 3 * 0.1 * 2
        assert!((load.tangential_force - 1960.2).abs() < 0.1);
        assert!((load.torque - 11.761).abs() < 0.001);
        // P = M * 2π n / 60
        let expected_kw = load.torque * 2.0 * PI * 5000.0 / 60.0 / 1000.0;
        assert!((load.power - expected_kw).abs() < 1e-12);
    }

    #[test]
    fn test_softening_scales_force() {
        let cut = CutGeometry {
            chip_thickness: 0.08,
            width: 3.0,
            engaged_flutes: 1.0,
        };
        let base = cutting_load(&STEEL, &cut, 12.0, 8000.0, 1.0).unwrap();
        let soft = cutting_load(&STEEL, &cut, 12.0, 8000.0, 0.75).unwrap();
        assert!((soft.tangential_force / base.tangential_force - 0.75).abs() < 1e-12);
        assert!((soft.power / base.power - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_engaged_flutes() {
        assert!((engaged_flutes(4, 12.0, 12.0) - 2.0).abs() < 1e-12);
        assert!((engaged_flutes(4, 6.0, 12.0) - 1.0).abs() < 1e-12);
        assert!(engaged_flutes(4, 1.2, 12.0) < 1.0);
    }

    #[test]
    fn test_chip_thickness_lead_angle() {
        assert!((chip_thickness(0.1, 90.0) - 0.1).abs() < 1e-12);
        assert!((chip_thickness(0.1, 45.0) - 0.070711).abs() < 1e-6);
    }
}
