//! Pure-Rust backend: branch and bound over `microlp`, driven through `good_lp`.
use good_lp::{
    default_solver, variable, variables, Expression, ResolutionError, Solution, SolverModel,
    Variable as LpVar,
};
use log::{debug, info, warn};
use typed_index_collections::{TiSlice, TiVec};

use super::{Outcome, SolveStatus, Solver, SolverConfig, SolverError};
use crate::models::program::{LinExpr, Program, Sense, VarId, VarType};

/// The default backend. Needs no external solver installation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLp;

fn expression(expr: &LinExpr, handles: &TiSlice<VarId, LpVar>) -> Expression {
    let mut out = Expression::with_capacity(expr.terms().count());
    for (var, coef) in expr.terms() {
        out.add_mul(coef, handles[var]);
    }
    out
}

impl Solver for MicroLp {
    fn solve(&self, program: &Program, config: &SolverConfig) -> Result<Outcome, SolverError> {
        if let Some(limit) = config.time_limit_secs {
            debug!("microlp has no time limit, ignoring {}s", limit);
        }
        info!(
            "Solving {} with microlp: {} variables, {} constraints",
            program.name(),
            program.num_vars(),
            program.num_constrs()
        );

        let mut vars = variables!();
        let handles: TiVec<VarId, LpVar> = program
            .variables()
            .iter()
            .map(|def| {
                let mut definition = variable().name(def.name.clone());
                if def.lower.is_finite() {
                    definition = definition.min(def.lower);
                }
                if def.upper.is_finite() {
                    definition = definition.max(def.upper);
                }
                if def.vtype == VarType::Integer {
                    definition = definition.integer();
                }
                vars.add(definition)
            })
            .collect();

        // the constant offset is left out, evaluation adds it back
        let objective = expression(program.objective(), &handles);
        let mut problem = vars.minimise(objective).using(default_solver);

        for constraint in program.constraints() {
            let lhs = expression(&constraint.lhs, &handles);
            let c = match constraint.sense {
                Sense::Le => lhs.leq(constraint.rhs),
                Sense::Ge => lhs.geq(constraint.rhs),
                Sense::Eq => lhs.eq(constraint.rhs),
            };
            problem = problem.with(c);
        }

        match problem.solve() {
            Ok(solution) => {
                let values = handles.iter().map(|&v| solution.value(v)).collect();
                info!("Finished solving {}: optimal", program.name());
                Ok(Outcome::optimal(values))
            }
            Err(ResolutionError::Infeasible) => {
                warn!("{} is infeasible", program.name());
                Ok(Outcome::without_solution(SolveStatus::Infeasible))
            }
            Err(ResolutionError::Unbounded) => {
                warn!("{} is unbounded", program.name());
                Ok(Outcome::without_solution(SolveStatus::Unbounded))
            }
            Err(err) => {
                warn!("microlp did not solve {}: {}", program.name(), err);
                Ok(Outcome::without_solution(SolveStatus::NotSolved))
            }
        }
    }
}
