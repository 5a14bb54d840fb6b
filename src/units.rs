//! Display units
//!
//! The engine works in metric throughout (m/min, mm, kW, N·m). Shop-floor
//! output can be switched to inch units; conversions go through `uom`.

use uom::si::f64::{Force, Length, Power, Torque, Volume};
use uom::si::force::{newton, pound_force};
use uom::si::length::{foot, inch, meter, millimeter};
use uom::si::power::{horsepower, kilowatt};
use uom::si::torque::{newton_meter, pound_force_foot};
use uom::si::volume::{cubic_centimeter, cubic_inch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

/// A converted value and its unit label
pub type Measure = (f64, &'static str);

impl UnitSystem {
    /// Cutting speed given in m/min
    pub fn cutting_speed(self, meters_per_minute: f64) -> Measure {
        match self {
            UnitSystem::Metric => (meters_per_minute, "m/min"),
            UnitSystem::Imperial => (
                Length::new::<meter>(meters_per_minute).get::<foot>(),
                "SFM",
            ),
        }
    }

    /// Chip load, depth or width given in mm
    pub fn length(self, mm: f64) -> Measure {
        match self {
            UnitSystem::Metric => (mm, "mm"),
            UnitSystem::Imperial => (Length::new::<millimeter>(mm).get::<inch>(), "in"),
        }
    }

    /// Table feed given in mm/min
    pub fn feed_rate(self, mm_per_minute: f64) -> Measure {
        match self {
            UnitSystem::Metric => (mm_per_minute, "mm/min"),
            UnitSystem::Imperial => (Length::new::<millimeter>(mm_per_minute).get::<inch>(), "IPM"),
        }
    }

    pub fn force(self, newtons: f64) -> Measure {
        match self {
            UnitSystem::Metric => (newtons, "N"),
            UnitSystem::Imperial => (Force::new::<newton>(newtons).get::<pound_force>(), "lbf"),
        }
    }

    pub fn torque(self, newton_meters: f64) -> Measure {
        match self {
            UnitSystem::Metric => (newton_meters, "N·m"),
            UnitSystem::Imperial => (
                Torque::new::<newton_meter>(newton_meters).get::<pound_force_foot>(),
                "lbf·ft",
            ),
        }
    }

    pub fn power(self, kw: f64) -> Measure {
        match self {
            UnitSystem::Metric => (kw, "kW"),
            UnitSystem::Imperial => (Power::new::<kilowatt>(kw).get::<horsepower>(), "hp"),
        }
    }

    /// Removal rate given in cm³/min
    pub fn removal_rate(self, cm3_per_minute: f64) -> Measure {
        match self {
            UnitSystem::Metric => (cm3_per_minute, "cm³/min"),
            UnitSystem::Imperial => (
                Volume::new::<cubic_centimeter>(cm3_per_minute).get::<cubic_inch>(),
                "in³/min",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_metric_is_identity() {
        let m = UnitSystem::Metric;
        assert_eq!(m.cutting_speed(120.0), (120.0, "m/min"));
        assert_eq!(m.power(7.5), (7.5, "kW"));
    }

    #[test]
    fn test_imperial_conversions() {
        let i = UnitSystem::Imperial;
        assert!(close(i.cutting_speed(100.0).0, 328.084, 1e-3));
        assert!(close(i.length(25.4).0, 1.0, 1e-12));
        assert!(close(i.feed_rate(254.0).0, 10.0, 1e-12));
        assert!(close(i.force(4.448222).0, 1.0, 1e-6));
        assert!(close(i.torque(1.355818).0, 1.0, 1e-6));
        assert!(close(i.power(0.745700).0, 1.0, 1e-4));
        assert!(close(i.removal_rate(16.387064).0, 1.0, 1e-6));
    }
}
