//! Material model adapter
//!
//! Catalog records carry raw empirical coefficients. [`Material::from_record`]
//! checks them once, when the record is loaded; the models only ever see a
//! validated [`Material`].

use serde::{Deserialize, Serialize};

use super::EngineError;

/// Kienzle specific-force law: kc = kc1_1 · h^(-mc)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct KienzleCoefficients {
    /// N/mm² at 1 mm chip thickness
    pub kc1_1: f64,
    pub mc: f64,
}

/// Johnson-Cook flow stress law
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct JohnsonCookCoefficients {
    /// Yield stress, MPa
    pub a: f64,
    /// Hardening modulus, MPa
    pub b: f64,
    /// Strain-hardening exponent
    pub n: f64,
    /// Strain-rate sensitivity
    pub c: f64,
    /// Thermal-softening exponent
    pub m: f64,
}

/// Taylor tool-life law: V · T^n = C
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TaylorCoefficients {
    /// m/min
    pub c: f64,
    pub n: f64,
}

/// Physical-model record as it appears in a catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialPhysicalModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kienzle: KienzleCoefficients,
    pub johnson_cook: JohnsonCookCoefficients,
    pub taylor: TaylorCoefficients,
    /// Percent relative to free-machining steel
    pub machinability_rating: f64,
    /// °C
    #[serde(alias = "melting_point_c")]
    pub melting_point: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardness_hrc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardness_hb: Option<u32>,
    /// °C of cutting-zone rise per m/min; the engine default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_rise_per_speed: Option<f64>,
}

/// A material whose coefficients satisfy every model invariant
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    id: String,
    record: MaterialPhysicalModel,
}

impl Material {
    pub fn from_record(
        id: impl Into<String>,
        record: MaterialPhysicalModel,
    ) -> Result<Self, EngineError> {
        let id = id.into().trim().to_string();
        let check = Checker { material: &id };

        let k = &record.kienzle;
        check.positive("kienzle.kc1_1", k.kc1_1)?;
        check.unit_interval("kienzle.mc", k.mc)?;

        let jc = &record.johnson_cook;
        check.positive("johnson_cook.a", jc.a)?;
        check.non_negative("johnson_cook.b", jc.b)?;
        check.non_negative("johnson_cook.n", jc.n)?;
        check.non_negative("johnson_cook.c", jc.c)?;
        check.unit_interval("johnson_cook.m", jc.m)?;

        let t = &record.taylor;
        check.positive("taylor.c", t.c)?;
        check.unit_interval("taylor.n", t.n)?;

        check.positive("machinability_rating", record.machinability_rating)?;
        check.positive("melting_point", record.melting_point)?;

        if let Some(hrc) = record.hardness_hrc {
            check.positive("hardness_hrc", hrc)?;
        }
        if let Some(hb) = record.hardness_hb {
            check.positive("hardness_hb", hb as f64)?;
        }
        if let Some(rise) = record.thermal_rise_per_speed {
            check.non_negative("thermal_rise_per_speed", rise)?;
        }

        Ok(Self { id, record })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn record(&self) -> &MaterialPhysicalModel {
        &self.record
    }

    pub fn kienzle(&self) -> &KienzleCoefficients {
        &self.record.kienzle
    }

    pub fn johnson_cook(&self) -> &JohnsonCookCoefficients {
        &self.record.johnson_cook
    }

    pub fn taylor(&self) -> &TaylorCoefficients {
        &self.record.taylor
    }

    pub fn machinability_rating(&self) -> f64 {
        self.record.machinability_rating
    }

    pub fn melting_point(&self) -> f64 {
        self.record.melting_point
    }

    pub fn thermal_rise_per_speed(&self) -> Option<f64> {
        self.record.thermal_rise_per_speed
    }
}

struct Checker<'a> {
    material: &'a str,
}

impl Checker<'_> {
    fn fail(&self, coefficient: &'static str, value: f64, reason: &'static str) -> EngineError {
        EngineError::InvalidMaterial {
            material: self.material.to_string(),
            coefficient,
            value,
            reason,
        }
    }

    fn positive(&self, coefficient: &'static str, value: f64) -> Result<(), EngineError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(self.fail(coefficient, value, "must be positive"))
        }
    }

    fn non_negative(&self, coefficient: &'static str, value: f64) -> Result<(), EngineError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(self.fail(coefficient, value, "must not be negative"))
        }
    }

    /// Exponents live in (0, 1]
    fn unit_interval(&self, coefficient: &'static str, value: f64) -> Result<(), EngineError> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(())
        } else {
            Err(self.fail(coefficient, value, "must lie in (0, 1]"))
        }
    }
}
