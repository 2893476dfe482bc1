//! Gurobi backend. Requires a local Gurobi installation and licence.
use grb::prelude::*;
use log::{info, warn};

use super::{Outcome, SolveStatus, Solver, SolverConfig, SolverError};
use crate::models::program::{LinExpr, Program, Sense, VarType};

#[derive(Debug, Clone, Copy, Default)]
pub struct Gurobi;

impl From<grb::Error> for SolverError {
    fn from(err: grb::Error) -> Self {
        SolverError::Backend(format!("{:?}", err))
    }
}

fn expr(expr: &LinExpr, vars: &[Var]) -> Expr {
    expr.terms()
        .map(|(var, coef)| coef * vars[usize::from(var)])
        .grb_sum()
}

impl Solver for Gurobi {
    fn solve(&self, program: &Program, config: &SolverConfig) -> Result<Outcome, SolverError> {
        info!("Building gurobi model for {}", program.name());

        let mut model = Model::new(program.name())?;
        model.set_param(param::OutputFlag, if config.verbose { 1 } else { 0 })?;
        if let Some(limit) = config.time_limit_secs {
            model.set_param(param::TimeLimit, limit)?;
        }

        let vars = program
            .variables()
            .iter()
            .map(|def| {
                let vtype = match def.vtype {
                    VarType::Continuous => grb::VarType::Continuous,
                    VarType::Integer => grb::VarType::Integer,
                };
                model.add_var(
                    &def.name,
                    vtype,
                    0.0,
                    def.lower,
                    def.upper,
                    std::iter::empty(),
                )
            })
            .collect::<grb::Result<Vec<Var>>>()?;

        model.update()?;

        for constraint in program.constraints() {
            let lhs = expr(&constraint.lhs, &vars);
            let rhs = constraint.rhs;
            let c = match constraint.sense {
                Sense::Le => c!(lhs <= rhs),
                Sense::Ge => c!(lhs >= rhs),
                Sense::Eq => c!(lhs == rhs),
            };
            model.add_constr(&constraint.name, c)?;
        }

        model.set_objective(expr(program.objective(), &vars), Minimize)?;
        model.update()?;

        info!("Solving {} with gurobi", program.name());
        model.optimize()?;

        let status = match model.status()? {
            Status::Optimal => SolveStatus::Optimal,
            Status::Infeasible => SolveStatus::Infeasible,
            Status::Unbounded | Status::InfOrUnbd => SolveStatus::Unbounded,
            other => {
                warn!("gurobi stopped with status {:?}", other);
                SolveStatus::NotSolved
            }
        };

        if status != SolveStatus::Optimal {
            return Ok(Outcome::without_solution(status));
        }

        let mut values = Vec::with_capacity(vars.len());
        for var in &vars {
            values.push(model.get_obj_attr(attr::X, var)?);
        }
        Ok(Outcome::optimal(values.into()))
    }
}
