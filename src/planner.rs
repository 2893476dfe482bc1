use derive_more::Display;
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::models::clinker::{ClinkerModel, Diagnostics};
use crate::problem::{TableError, Tables};
use crate::solution::{ExtractError, FirstPeriodActive, ShipmentPlan, StatusPolicy};
use crate::solver::{SolveStatus, Solver, SolverError};

#[derive(Debug, Display)]
pub enum PlanError {
    #[display(fmt = "{}", _0)]
    Tables(TableError),
    #[display(fmt = "{}", _0)]
    Solver(SolverError),
    #[display(fmt = "{}", _0)]
    Extract(ExtractError),
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Tables(err) => Some(err),
            PlanError::Solver(err) => Some(err),
            PlanError::Extract(err) => Some(err),
        }
    }
}

impl From<TableError> for PlanError {
    fn from(err: TableError) -> Self {
        PlanError::Tables(err)
    }
}

impl From<SolverError> for PlanError {
    fn from(err: SolverError) -> Self {
        PlanError::Solver(err)
    }
}

impl From<ExtractError> for PlanError {
    fn from(err: ExtractError) -> Self {
        PlanError::Extract(err)
    }
}

impl PlanError {
    /// The solve status if the run stopped because no optimal plan exists
    pub fn status(&self) -> Option<SolveStatus> {
        match self {
            PlanError::Extract(ExtractError::NotOptimal(status)) => Some(*status),
            _ => None,
        }
    }
}

/// The outcome of a planning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub plan: ShipmentPlan,
    pub diagnostics: Diagnostics,
}

/// Builds, solves and extracts in one go.
pub struct Planner<S> {
    solver: S,
    config: PlannerConfig,
    policy: Box<dyn StatusPolicy>,
}

impl<S: Solver> Planner<S> {
    pub fn new(solver: S, config: PlannerConfig) -> Self {
        Planner {
            solver,
            config,
            policy: Box::new(FirstPeriodActive),
        }
    }

    pub fn with_status_policy(mut self, policy: impl StatusPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn build(&self, tables: &Tables) -> Result<ClinkerModel, PlanError> {
        Ok(ClinkerModel::from_tables(tables, &self.config.model)?)
    }

    pub fn plan(&self, tables: &Tables) -> Result<PlanReport, PlanError> {
        let model = self.build(tables)?;
        let outcome = self.solver.solve(&model.program, &self.config.solver)?;
        info!("Solve finished with status {}", outcome.status);
        let plan = ShipmentPlan::extract(&model, &outcome, self.policy.as_ref())?;
        Ok(PlanReport {
            plan,
            diagnostics: model.diagnostics,
        })
    }
}
