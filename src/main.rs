use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use serde::{de::DeserializeOwned, Serialize};

use clinker_flow::config::PlannerConfig;
use clinker_flow::planner::{PlanReport, Planner};
use clinker_flow::problem::{LaneKey, Period, Tables};
use clinker_flow::solution::PENDING;
use clinker_flow::solver::{MicroLp, Solver};

#[derive(Parser)]
#[clap(name = "clinker-flow", about = "Clinker production planning")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and solve the planning model, then write the shipment plan
    Solve(SolveArgs),
    /// Fix the flow of a lane to a quantity for every later solve
    Pin(PinArgs),
    /// Change the status label of a planned shipment
    UpdateStatus(StatusArgs),
}

#[derive(Args)]
struct SolveArgs {
    #[clap(long)]
    tables: PathBuf,
    #[clap(long)]
    output: Option<PathBuf>,
    #[clap(long)]
    config: Option<PathBuf>,
    #[clap(long)]
    time_limit: Option<f64>,
    #[clap(long)]
    holding_rate: Option<f64>,
    #[clap(long)]
    unmet_penalty: Option<f64>,
    /// Solve with Gurobi instead of the built-in solver
    #[clap(long)]
    gurobi: bool,
}

#[derive(Args)]
struct LaneArgs {
    #[clap(long)]
    from: String,
    #[clap(long)]
    to: String,
    #[clap(long)]
    mode: String,
    #[clap(long)]
    period: Period,
}

impl LaneArgs {
    fn key(&self) -> LaneKey {
        LaneKey::new(
            self.from.as_str(),
            self.to.as_str(),
            self.mode.as_str(),
            self.period,
        )
    }
}

#[derive(Args)]
struct PinArgs {
    #[clap(long)]
    tables: PathBuf,
    #[clap(flatten)]
    lane: LaneArgs,
    #[clap(long)]
    quantity: f64,
    /// Also record the allocation in this plan
    #[clap(long)]
    plan: Option<PathBuf>,
}

#[derive(Args)]
struct StatusArgs {
    #[clap(long)]
    plan: PathBuf,
    #[clap(flatten)]
    lane: LaneArgs,
    #[clap(long)]
    status: String,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn solve(args: SolveArgs) -> Result<ExitCode, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => PlannerConfig::from_reader(BufReader::new(File::open(path)?))?,
        None => PlannerConfig::default(),
    };
    if let Some(limit) = args.time_limit {
        config.solver.time_limit_secs = Some(limit);
    }
    if let Some(rate) = args.holding_rate {
        config.model.holding_rate = rate;
    }
    if let Some(penalty) = args.unmet_penalty {
        config.model.unmet_penalty = penalty;
    }

    let tables = Tables::from_reader(BufReader::new(File::open(&args.tables)?))?;
    let solver = backend(args.gurobi)?;
    let report = match Planner::new(solver, config).plan(&tables) {
        Ok(report) => report,
        Err(err) => match err.status() {
            Some(status) => {
                error!("No plan: {}", status);
                println!("Status: {}", status);
                return Ok(ExitCode::FAILURE);
            }
            None => return Err(err.into()),
        },
    };

    println!("Status: Optimal");
    println!("Objective: {:.2}", report.plan.objective);
    println!("Shipments: {}", report.plan.shipments.len());
    println!("Unmet demand: {:.2}", report.plan.total_unmet());
    if !report.diagnostics.is_clean() {
        println!("Skipped input records: {}", report.diagnostics.total());
    }
    if let Some(path) = &args.output {
        write_json(path, &report)?;
        info!("Wrote plan to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(feature = "gurobi")]
fn backend(gurobi: bool) -> Result<Box<dyn Solver>, Box<dyn Error>> {
    if gurobi {
        Ok(Box::new(clinker_flow::solver::Gurobi))
    } else {
        Ok(Box::new(MicroLp))
    }
}

#[cfg(not(feature = "gurobi"))]
fn backend(gurobi: bool) -> Result<Box<dyn Solver>, Box<dyn Error>> {
    if gurobi {
        return Err("built without the gurobi feature".into());
    }
    Ok(Box::new(MicroLp))
}

fn pin(args: PinArgs) -> Result<ExitCode, Box<dyn Error>> {
    let mut tables = Tables::from_reader(BufReader::new(File::open(&args.tables)?))?;
    let key = args.lane.key();
    tables.pin_allocation(&key, args.quantity);
    tables.validate()?;
    write_json(&args.tables, &tables)?;
    info!("Pinned {} to {}", key, args.quantity);

    if let Some(path) = &args.plan {
        let mut report: PlanReport = read_json(path)?;
        let trips = tables
            .logistics
            .iter()
            .find(|r| r.key() == key && r.multiplier > 0.0)
            .map(|r| (args.quantity / r.multiplier).ceil() as u64)
            .unwrap_or(0);
        let plan = &mut report.plan;
        plan.record_allocation(&key, args.quantity, trips, PENDING);
        write_json(path, &report)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn update_status(args: StatusArgs) -> Result<ExitCode, Box<dyn Error>> {
    let mut report: PlanReport = read_json(&args.plan)?;
    report.plan.update_status(&args.lane.key(), &args.status)?;
    write_json(&args.plan, &report)?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    env_logger::init();

    match Cli::parse().command {
        Command::Solve(args) => solve(args),
        Command::Pin(args) => pin(args),
        Command::UpdateStatus(args) => update_status(args),
    }
}
