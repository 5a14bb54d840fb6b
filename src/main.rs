use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;

use chipload::catalog::{Catalog, CatalogError, CatalogHandle};
use chipload::config::{ConfigError, EngineConfig};
use chipload::engine::{Engine, Objective, ParameterResult};
use chipload::service::{Command, Context, Response, ServiceError};
use chipload::units::{Measure, UnitSystem};

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("--objective target-life needs --target-life MINUTES")]
    MissingTargetLife,
}

#[derive(Parser)]
#[command(
    name = "chipload",
    version,
    about = "Cutting speed and feed from material, tool and machine limits"
)]
struct Cli {
    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog to use instead of the built-in one (JSON)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Inch units in tables
    #[arg(long, global = true)]
    imperial: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Solve for cutting speed and feed
    Compute {
        #[command(flatten)]
        setup: Setup,
        #[arg(long, value_enum, default_value_t = ObjectiveArg::MaxMrr)]
        objective: ObjectiveArg,
        /// Minutes, for --objective target-life
        #[arg(long)]
        target_life: Option<f64>,
    },
    /// Taylor tool life at a cutting speed
    Life {
        #[arg(long)]
        material: String,
        #[arg(long)]
        tool: String,
        /// m/min
        #[arg(long)]
        speed: f64,
    },
    /// Cutting speed that gives a tool life
    Speed {
        #[arg(long)]
        material: String,
        #[arg(long)]
        tool: String,
        /// Minutes
        #[arg(long)]
        life: f64,
    },
    /// Minimum-cost tool life and speed
    Economics {
        #[arg(long)]
        material: String,
        #[arg(long)]
        tool: String,
    },
    /// Check one cutting speed against the machine
    Check {
        #[command(flatten)]
        setup: Setup,
        /// m/min
        #[arg(long)]
        speed: f64,
    },
    /// List catalog entries
    List {
        #[arg(value_enum)]
        what: ListKind,
    },
    /// Run a JSON array of commands in parallel
    Batch { file: PathBuf },
}

#[derive(Args)]
struct Setup {
    #[arg(long)]
    material: String,
    #[arg(long)]
    tool: String,
    #[arg(long)]
    machine: String,
    /// Axial depth of cut, mm
    #[arg(long)]
    depth: f64,
}

#[derive(ValueEnum, Clone, Copy)]
enum ObjectiveArg {
    MaxMrr,
    MinCost,
    TargetLife,
}

#[derive(ValueEnum, Clone, Copy)]
enum ListKind {
    Materials,
    Tools,
    Machines,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_file(path)?,
        None => Catalog::builtin()?,
    };
    let ctx = Context::new(Arc::new(CatalogHandle::new(catalog)), Engine::new(config));
    let units = if cli.imperial {
        UnitSystem::Imperial
    } else {
        UnitSystem::Metric
    };

    let command = match cli.command {
        Cmd::Batch { file } => return run_batch(&ctx, &file),
        Cmd::Compute {
            setup,
            objective,
            target_life,
        } => Command::ComputeParameters {
            material: setup.material,
            tool: setup.tool,
            machine: setup.machine,
            depth_of_cut: setup.depth,
            objective: match objective {
                ObjectiveArg::MaxMrr => Objective::MaxMrr,
                ObjectiveArg::MinCost => Objective::MinCost,
                ObjectiveArg::TargetLife => Objective::TargetLife {
                    minutes: target_life.ok_or(CliError::MissingTargetLife)?,
                },
            },
            economics: None,
        },
        Cmd::Life {
            material,
            tool,
            speed,
        } => Command::ToolLife {
            material,
            tool,
            cutting_speed: speed,
        },
        Cmd::Speed {
            material,
            tool,
            life,
        } => Command::SpeedForLife {
            material,
            tool,
            tool_life: life,
        },
        Cmd::Economics { material, tool } => Command::EconomicSpeed {
            material,
            tool,
            economics: None,
        },
        Cmd::Check { setup, speed } => Command::CheckFeasibility {
            material: setup.material,
            tool: setup.tool,
            machine: setup.machine,
            depth_of_cut: setup.depth,
            cutting_speed: speed,
        },
        Cmd::List { what } => match what {
            ListKind::Materials => Command::ListMaterials,
            ListKind::Tools => Command::ListTools,
            ListKind::Machines => Command::ListMachines,
        },
    };

    let response = ctx.execute(&command)?;
    if let Response::Parameters(result) = &response {
        for warning in &result.warnings {
            eprintln!("warning: {warning}");
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response, units);
    }
    Ok(())
}

fn run_batch(ctx: &Context, file: &Path) -> Result<(), CliError> {
    let content = std::fs::read_to_string(file).map_err(|source| CliError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let commands: Vec<Command> = serde_json::from_str(&content)?;

    let mut output = Vec::with_capacity(commands.len());
    for result in ctx.execute_batch(&commands) {
        output.push(match result {
            Ok(response) => serde_json::to_value(response)?,
            Err(err) => json!({ "error": err.to_string() }),
        });
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn row(label: &str, (value, unit): Measure, precision: usize) {
    println!("{:<16}{:>12.*} {}", label, precision, value, unit);
}

fn print_response(response: &Response, units: UnitSystem) {
    match response {
        Response::Parameters(result) => print_parameters(result, units),
        Response::ToolLife {
            material,
            tool,
            cutting_speed,
            tool_life,
        } => {
            println!("{material} with {tool}");
            row("Cutting speed", units.cutting_speed(*cutting_speed), 1);
            row("Tool life", (*tool_life, "min"), 2);
        }
        Response::SpeedForLife {
            material,
            tool,
            tool_life,
            cutting_speed,
        } => {
            println!("{material} with {tool}");
            row("Tool life", (*tool_life, "min"), 2);
            row("Cutting speed", units.cutting_speed(*cutting_speed), 1);
        }
        Response::EconomicSpeed {
            material,
            tool,
            optimum,
        } => {
            println!("{material} with {tool}, minimum cost");
            row("Cutting speed", units.cutting_speed(optimum.cutting_speed), 1);
            row("Tool life", (optimum.tool_life, "min"), 2);
        }
        Response::Feasibility {
            feasible,
            evaluation,
            violations,
        } => {
            println!("{}", if *feasible { "Within limits" } else { "EXCEEDS LIMITS" });
            row("Spindle", (evaluation.spindle_rpm, "rpm"), 0);
            row("Torque", units.torque(evaluation.torque), 2);
            row("Power", units.power(evaluation.power), 2);
            row("Tool life", (evaluation.tool_life, "min"), 2);
            for v in violations {
                println!("  - {v}");
            }
        }
        Response::Materials { materials } => {
            for m in materials {
                let hardness = match (m.hardness_hrc, m.hardness_hb) {
                    (Some(hrc), _) => format!("{hrc} HRC"),
                    (None, Some(hb)) => format!("{hb} HB"),
                    (None, None) => String::new(),
                };
                println!(
                    "{:<16} {:<40} {:>5.0}%  {}",
                    m.id, m.name, m.machinability_rating, hardness
                );
            }
        }
        Response::Tools { tools } => {
            for t in tools {
                let (d, unit) = units.length(t.tool.diameter);
                println!(
                    "{:<12} {:>7.3} {:<3} {}FL {:<8} {}",
                    t.id,
                    d,
                    unit,
                    t.tool.flute_count,
                    t.tool.coating.to_string(),
                    t.tool.name
                );
            }
        }
        Response::Machines { machines } => {
            for m in machines {
                let (p, p_unit) = units.power(m.machine.max_power);
                let (tq, tq_unit) = units.torque(m.machine.max_torque);
                println!(
                    "{:<16} {:>6.0} rpm {:>6.1} {} {:>6.0} {}  {}",
                    m.id, m.machine.max_rpm, p, p_unit, tq, tq_unit, m.machine.name
                );
            }
        }
    }
}

fn print_parameters(r: &ParameterResult, units: UnitSystem) {
    let state = match (r.feasible, r.converged) {
        (true, true) => "feasible",
        (true, false) => "feasible, not converged",
        (false, _) => "INFEASIBLE",
    };
    println!("{} ({}, {:?} search)", state, r.objective, r.search_mode);

    row("Cutting speed", units.cutting_speed(r.cutting_speed), 1);
    row("Spindle", (r.spindle_rpm, "rpm"), 0);
    row("Feed/tooth", units.length(r.feed_per_tooth), 4);
    row("Feed rate", units.feed_rate(r.feed_rate), 1);
    row("Axial depth", units.length(r.axial_depth), 3);
    row("Radial width", units.length(r.radial_width), 3);
    row("Cutting force", units.force(r.tangential_force), 0);
    row("Torque", units.torque(r.torque), 2);
    row("Power", units.power(r.power), 2);
    row("Tool life", (r.tool_life, "min"), 2);
    row("Removal rate", units.removal_rate(r.material_removal_rate), 2);

    if !r.violations.is_empty() {
        println!("Violations:");
        for v in &r.violations {
            println!("  - {v}");
        }
    }
}
