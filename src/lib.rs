//! Production and logistics planning for clinker: builds a mixed-integer program from the
//! planning tables, hands it to a solver backend and reads the shipment plan back.
pub mod config;
pub mod models;
pub mod planner;
pub mod problem;
pub mod solution;
pub mod solver;

pub use config::{ModelConfig, PlannerConfig, SolverConfig};
pub use models::clinker::{ClinkerModel, Diagnostics};
pub use planner::{PlanError, PlanReport, Planner};
pub use problem::{LaneKey, Tables};
pub use solution::{ShipmentPlan, StatusPolicy};
pub use solver::{MicroLp, SolveStatus, Solver};
