//! chipload - machining process parameter engine
//!
//! Given a material's Kienzle, Johnson-Cook and Taylor coefficients, a cutter
//! and a machine envelope, find the cutting speed and feed that best meet an
//! objective without exceeding the spindle's speed, power or torque.
//!
//! ```no_run
//! use chipload::catalog::Catalog;
//! use chipload::engine::{Engine, Objective};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Catalog::builtin()?;
//! let material = catalog.material("52100-annealed").ok_or("no material")?;
//! let (_, tool) = catalog.tool("EM_12_4FL").ok_or("no tool")?;
//! let (_, machine) = catalog.machine("vmc-15kw").ok_or("no machine")?;
//!
//! let result = Engine::default().compute_parameters(material, tool, machine, 3.0, Objective::MinCost)?;
//! println!("{:.0} m/min at {:.0} rpm", result.cutting_speed, result.spindle_rpm);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod service;
pub mod units;

pub use catalog::{Catalog, CatalogError, CatalogHandle};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, EngineError, Objective, ParameterResult};
pub use service::{Command, Context, Response, ServiceError};
