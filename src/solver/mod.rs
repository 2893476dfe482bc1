//! Solver backends. A backend receives a finished [`Program`] and reports how the solve ended.
pub mod microlp;

#[cfg(feature = "gurobi")]
pub mod gurobi;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use typed_index_collections::TiVec;

pub use crate::config::SolverConfig;
use crate::models::program::{Assignment, Program};

pub use self::microlp::MicroLp;
#[cfg(feature = "gurobi")]
pub use self::gurobi::Gurobi;

/// Terminal status of a solve
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    #[display(fmt = "Not Solved")]
    NotSolved,
}

/// How a solve ended, with one value per variable when it ended optimally
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: SolveStatus,
    pub values: Assignment,
}

impl Outcome {
    pub fn optimal(values: Assignment) -> Self {
        Outcome {
            status: SolveStatus::Optimal,
            values,
        }
    }

    pub fn without_solution(status: SolveStatus) -> Self {
        Outcome {
            status,
            values: TiVec::new(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

/// A backend failure that is not a solve status
#[derive(Debug, Display)]
pub enum SolverError {
    #[display(fmt = "solver backend failed: {}", _0)]
    Backend(String),
}

impl std::error::Error for SolverError {}

pub trait Solver {
    /// Solves `program` to optimality (or gives up), honouring `config` where the backend can.
    fn solve(&self, program: &Program, config: &SolverConfig) -> Result<Outcome, SolverError>;
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn solve(&self, program: &Program, config: &SolverConfig) -> Result<Outcome, SolverError> {
        (**self).solve(program, config)
    }
}

impl<S: Solver + ?Sized> Solver for &S {
    fn solve(&self, program: &Program, config: &SolverConfig) -> Result<Outcome, SolverError> {
        (**self).solve(program, config)
    }
}
