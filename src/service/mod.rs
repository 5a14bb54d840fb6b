//! Command layer
//!
//! Hosts build a [`Context`] once and hand it [`Command`]s. Each command
//! resolves its catalog identifiers against one snapshot, runs the engine and
//! returns a serializable [`Response`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::{Catalog, CatalogError, CatalogHandle};
use crate::config::Economics;
use crate::engine::{
    ConstraintViolation, EconomicOptimum, Engine, EngineError, Evaluation, MachineEnvelope,
    Material, Objective, ParameterResult, ToolGeometry,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("unknown material '{0}'")]
    UnknownMaterial(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("unknown machine '{0}'")]
    UnknownMachine(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    ComputeParameters {
        material: String,
        tool: String,
        machine: String,
        depth_of_cut: f64,
        objective: Objective,
        /// Overrides the configured shop economics
        #[serde(default, skip_serializing_if = "Option::is_none")]
        economics: Option<Economics>,
    },
    ToolLife {
        material: String,
        tool: String,
        cutting_speed: f64,
    },
    SpeedForLife {
        material: String,
        tool: String,
        tool_life: f64,
    },
    EconomicSpeed {
        material: String,
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        economics: Option<Economics>,
    },
    CheckFeasibility {
        material: String,
        tool: String,
        machine: String,
        depth_of_cut: f64,
        cutting_speed: f64,
    },
    ListMaterials,
    ListTools,
    ListMachines,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialSummary {
    pub id: String,
    pub name: String,
    pub machinability_rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardness_hrc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardness_hb: Option<u32>,
}

impl From<&Material> for MaterialSummary {
    fn from(m: &Material) -> Self {
        Self {
            id: m.id().to_string(),
            name: m.name().to_string(),
            machinability_rating: m.machinability_rating(),
            hardness_hrc: m.record().hardness_hrc,
            hardness_hb: m.record().hardness_hb,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolEntry {
    pub id: String,
    #[serde(flatten)]
    pub tool: ToolGeometry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineEntry {
    pub id: String,
    #[serde(flatten)]
    pub machine: MachineEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum Response {
    Parameters(ParameterResult),
    ToolLife {
        material: String,
        tool: String,
        /// m/min
        cutting_speed: f64,
        /// minutes
        tool_life: f64,
    },
    SpeedForLife {
        material: String,
        tool: String,
        /// minutes
        tool_life: f64,
        /// m/min
        cutting_speed: f64,
    },
    EconomicSpeed {
        material: String,
        tool: String,
        #[serde(flatten)]
        optimum: EconomicOptimum,
    },
    Feasibility {
        feasible: bool,
        evaluation: Evaluation,
        violations: Vec<ConstraintViolation>,
    },
    Materials {
        materials: Vec<MaterialSummary>,
    },
    Tools {
        tools: Vec<ToolEntry>,
    },
    Machines {
        machines: Vec<MachineEntry>,
    },
}

/// Everything a command needs, owned by the host
#[derive(Debug, Clone)]
pub struct Context {
    pub catalog: Arc<CatalogHandle>,
    pub engine: Engine,
}

impl Context {
    pub fn new(catalog: Arc<CatalogHandle>, engine: Engine) -> Self {
        Self { catalog, engine }
    }

    /// Built-in catalog with the default engine configuration
    pub fn builtin() -> Result<Self, ServiceError> {
        Ok(Self::new(
            Arc::new(CatalogHandle::new(Catalog::builtin()?)),
            Engine::default(),
        ))
    }

    /// Swap in a catalog file. Commands already running keep their snapshot.
    pub fn reload_catalog(&self, path: impl AsRef<Path>) -> Result<(), ServiceError> {
        self.catalog.reload_from_file(path)?;
        Ok(())
    }

    pub fn execute(&self, command: &Command) -> Result<Response, ServiceError> {
        let catalog = self.catalog.snapshot();
        let engine = &self.engine;

        match command {
            Command::ComputeParameters {
                material,
                tool,
                machine,
                depth_of_cut,
                objective,
                economics,
            } => {
                let material = find_material(&catalog, material)?;
                let (_, tool) = find_tool(&catalog, tool)?;
                let machine = find_machine(&catalog, machine)?;
                let economics = economics.unwrap_or(engine.config().economics);
                let result = engine.compute_parameters_with(
                    material,
                    tool,
                    machine,
                    *depth_of_cut,
                    *objective,
                    economics,
                )?;
                Ok(Response::Parameters(result))
            }

            Command::ToolLife {
                material,
                tool,
                cutting_speed,
            } => {
                let m = find_material(&catalog, material)?;
                let (tool_id, t) = find_tool(&catalog, tool)?;
                let tool_life = engine.tool_life(m, t, *cutting_speed)?;
                Ok(Response::ToolLife {
                    material: m.id().to_string(),
                    tool: tool_id.to_string(),
                    cutting_speed: *cutting_speed,
                    tool_life,
                })
            }

            Command::SpeedForLife {
                material,
                tool,
                tool_life,
            } => {
                let m = find_material(&catalog, material)?;
                let (tool_id, t) = find_tool(&catalog, tool)?;
                let cutting_speed = engine.speed_for_life(m, t, *tool_life)?;
                Ok(Response::SpeedForLife {
                    material: m.id().to_string(),
                    tool: tool_id.to_string(),
                    tool_life: *tool_life,
                    cutting_speed,
                })
            }

            Command::EconomicSpeed {
                material,
                tool,
                economics,
            } => {
                let m = find_material(&catalog, material)?;
                let (tool_id, t) = find_tool(&catalog, tool)?;
                let economics = economics.unwrap_or(engine.config().economics);
                let optimum = engine.economic_optimum(m, t, &economics)?;
                Ok(Response::EconomicSpeed {
                    material: m.id().to_string(),
                    tool: tool_id.to_string(),
                    optimum,
                })
            }

            Command::CheckFeasibility {
                material,
                tool,
                machine,
                depth_of_cut,
                cutting_speed,
            } => {
                let material = find_material(&catalog, material)?;
                let (_, tool) = find_tool(&catalog, tool)?;
                let machine = find_machine(&catalog, machine)?;
                let (evaluation, verdict) =
                    engine.evaluate(material, tool, machine, *depth_of_cut, *cutting_speed)?;
                Ok(Response::Feasibility {
                    feasible: verdict.is_feasible(),
                    evaluation,
                    violations: verdict.violations,
                })
            }

            Command::ListMaterials => Ok(Response::Materials {
                materials: catalog.materials().map(MaterialSummary::from).collect(),
            }),

            Command::ListTools => Ok(Response::Tools {
                tools: catalog
                    .tools()
                    .map(|(id, tool)| ToolEntry {
                        id: id.to_string(),
                        tool: tool.clone(),
                    })
                    .collect(),
            }),

            Command::ListMachines => Ok(Response::Machines {
                machines: catalog
                    .machines()
                    .map(|(id, machine)| MachineEntry {
                        id: id.to_string(),
                        machine: machine.clone(),
                    })
                    .collect(),
            }),
        }
    }

    /// Run independent commands in parallel. Results come back in input order.
    pub fn execute_batch(&self, commands: &[Command]) -> Vec<Result<Response, ServiceError>> {
        commands.par_iter().map(|c| self.execute(c)).collect()
    }
}

fn find_material<'a>(catalog: &'a Catalog, key: &str) -> Result<&'a Material, ServiceError> {
    catalog
        .material(key)
        .ok_or_else(|| ServiceError::UnknownMaterial(key.to_string()))
}

fn find_tool<'a>(
    catalog: &'a Catalog,
    key: &str,
) -> Result<(&'a str, &'a ToolGeometry), ServiceError> {
    catalog
        .tool(key)
        .ok_or_else(|| ServiceError::UnknownTool(key.to_string()))
}

fn find_machine<'a>(catalog: &'a Catalog, key: &str) -> Result<&'a MachineEnvelope, ServiceError> {
    catalog
        .machine(key)
        .map(|(_, machine)| machine)
        .ok_or_else(|| ServiceError::UnknownMachine(key.to_string()))
}
