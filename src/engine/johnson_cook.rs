//! Johnson-Cook flow stress correction
//!
//! σ = (A + B·ε^n) · (1 + C·ln(ε̇/ε̇₀)) · (1 − θ*^m), θ* = (T − T_room)/(T_melt − T_room)
//!
//! The engine does not simulate the cutting zone. Temperature is a bounded
//! estimate, linear in cutting speed from ambient, and the strain rate is the
//! cutting speed over the primary shear zone thickness. What the rest of the
//! engine consumes is the ratio σ(V)/σ(V_ref): how much softer or harder the
//! material cuts at V than at the speed its Kienzle data was taken at.

use super::{JohnsonCookCoefficients, Material, ModelError};
use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy)]
pub struct FlowStressModel {
    coefficients: JohnsonCookCoefficients,
    melting_point: f64,
    room_temperature: f64,
    /// °C per m/min
    thermal_rise: f64,
    reference_speed: f64,
    reference_strain_rate: f64,
    effective_strain: f64,
    /// m
    shear_zone_thickness: f64,
}

impl FlowStressModel {
    pub fn new(material: &Material, config: &EngineConfig) -> Self {
        Self {
            coefficients: *material.johnson_cook(),
            melting_point: material.melting_point(),
            room_temperature: config.thermal.room_temperature,
            thermal_rise: material
                .thermal_rise_per_speed()
                .unwrap_or(config.thermal.rise_per_speed),
            reference_speed: config.reference.cutting_speed,
            reference_strain_rate: config.reference.strain_rate,
            effective_strain: config.reference.effective_strain,
            shear_zone_thickness: config.reference.shear_zone_thickness / 1000.0,
        }
    }

    /// ε̇ = v / δ, 1/s
    pub fn strain_rate(&self, cutting_speed: f64) -> f64 {
        (cutting_speed / 60.0) / self.shear_zone_thickness
    }

    /// Estimated cutting-zone temperature, °C
    pub fn temperature(&self, cutting_speed: f64) -> f64 {
        self.room_temperature + self.thermal_rise * cutting_speed
    }

    /// Speed at which the temperature estimate reaches the melting point
    pub fn thermal_speed_limit(&self) -> f64 {
        if self.thermal_rise > 0.0 {
            (self.melting_point - self.room_temperature) / self.thermal_rise
        } else {
            f64::INFINITY
        }
    }

    /// Flow stress at `cutting_speed`, MPa
    pub fn flow_stress(&self, cutting_speed: f64) -> Result<f64, ModelError> {
        let jc = &self.coefficients;
        let temperature = self.temperature(cutting_speed);
        if !(temperature < self.melting_point && self.melting_point > self.room_temperature) {
            return Err(ModelError::InvalidThermalState {
                temperature,
                melting_point: self.melting_point,
            });
        }

        let hardening = jc.a + jc.b * self.effective_strain.powf(jc.n);

        // Below the reference rate the rate term is taken as 1
        let rate_ratio = (self.strain_rate(cutting_speed) / self.reference_strain_rate).max(1.0);
        let rate = 1.0 + jc.c * rate_ratio.ln();

        let homologous = ((temperature - self.room_temperature)
            / (self.melting_point - self.room_temperature))
            .max(0.0);
        let thermal = 1.0 - homologous.powf(jc.m);

        Ok(hardening * rate * thermal)
    }

    /// r(V) = σ(V) / σ(V_ref)
    pub fn softening_ratio(&self, cutting_speed: f64) -> Result<f64, ModelError> {
        let reference = self.flow_stress(self.reference_speed)?;
        let stress = self.flow_stress(cutting_speed)?;
        let ratio = stress / reference;
        if ratio.is_finite() && ratio > 0.0 {
            Ok(ratio)
        } else {
            Err(ModelError::InvalidThermalState {
                temperature: self.temperature(cutting_speed),
                melting_point: self.melting_point,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::bearing_steel;
    use super::*;

    fn model() -> FlowStressModel {
        FlowStressModel::new(&bearing_steel(), &EngineConfig::default())
    }

    #[test]
    fn test_ratio_is_one_at_reference() {
        let r = model().softening_ratio(100.0).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_high_speed_softens() {
        let m = model();
        let r = m.softening_ratio(450.0).unwrap();
        assert!(r < 1.0, "r = {}", r);
        // thermal 0.6795/0.9288 times rate 1.5423/1.4777
        assert!((r - 0.7636).abs() < 0.005, "r = {}", r);
    }

    #[test]
    fn test_low_speed_is_stiffer() {
        let r = model().softening_ratio(40.0).unwrap();
        assert!(r > 1.0, "r = {}", r);
    }

    #[test]
    fn test_strain_rate_and_temperature() {
        let m = model();
        // 100 m/min over 25 µm
        assert!((m.strain_rate(100.0) - 66_666.67).abs() < 0.01);
        assert!((m.temperature(100.0) - 120.0).abs() < 1e-12);
        assert!((m.thermal_speed_limit() - 1404.0).abs() < 1e-9);
    }

    #[test]
    fn test_melting_is_rejected() {
        let m = model();
        let err = m.softening_ratio(1500.0).unwrap_err();
        assert!(matches!(err, ModelError::InvalidThermalState { .. }));
        assert!(m.softening_ratio(1403.0).is_ok());
    }

    #[test]
    fn test_material_thermal_override() {
        let mut record = bearing_steel().record().clone();
        record.thermal_rise_per_speed = Some(0.25);
        let material = Material::from_record("cool", record).unwrap();
        let m = FlowStressModel::new(&material, &EngineConfig::default());
        assert!((m.temperature(400.0) - 120.0).abs() < 1e-12);
    }
}
