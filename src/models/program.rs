//! A backend-neutral linear / mixed-integer program.
//!
//! The model builders emit a [`Program`], and a [`crate::solver::Solver`] translates it into
//! whatever representation its backend needs. Keeping the program as plain data means it can be
//! compared, inspected and checked against an assignment without any solver present.
use std::{
    collections::BTreeMap,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Range, Sub, SubAssign},
};

use derive_more::{Display, From, Into};
use typed_index_collections::{TiSlice, TiVec};

/// Handle of a variable within its [`Program`]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[display(fmt = "x{}", _0)]
pub struct VarId(usize);

/// Solved value of every variable, indexed by [`VarId`]
pub type Assignment = TiVec<VarId, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Continuous,
    Integer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub vtype: VarType,
    pub lower: f64,
    pub upper: f64,
}

impl Variable {
    /// Whether `value` lies within the bounds (and is integral for integer variables)
    pub fn admits(&self, value: f64, tolerance: f64) -> bool {
        let integral = match self.vtype {
            VarType::Continuous => true,
            VarType::Integer => (value - value.round()).abs() <= tolerance,
        };
        integral && value >= self.lower - tolerance && value <= self.upper + tolerance
    }
}

/// A linear expression `sum(coef * var) + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinExpr {
    pub fn constant(value: f64) -> Self {
        LinExpr {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().copied()
    }

    pub fn offset(&self) -> f64 {
        self.constant
    }

    pub fn evaluate(&self, values: &TiSlice<VarId, f64>) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values[var])
            .sum::<f64>()
            + self.constant
    }

    /// Merges repeated variables and drops zero coefficients. Terms end up ordered by variable.
    pub fn merged(self) -> Self {
        let mut coefs: BTreeMap<VarId, f64> = BTreeMap::new();
        for (var, coef) in self.terms {
            *coefs.entry(var).or_insert(0.0) += coef;
        }
        LinExpr {
            terms: coefs.into_iter().filter(|&(_, coef)| coef != 0.0).collect(),
            constant: self.constant,
        }
    }
}

impl From<VarId> for LinExpr {
    fn from(var: VarId) -> Self {
        LinExpr {
            terms: vec![(var, 1.0)],
            constant: 0.0,
        }
    }
}

impl From<f64> for LinExpr {
    fn from(value: f64) -> Self {
        LinExpr::constant(value)
    }
}

impl<T: Into<LinExpr>> AddAssign<T> for LinExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinExpr>> SubAssign<T> for LinExpr {
    fn sub_assign(&mut self, rhs: T) {
        *self += -rhs.into();
    }
}

impl<T: Into<LinExpr>> Add<T> for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: T) -> LinExpr {
        self += rhs;
        self
    }
}

impl<T: Into<LinExpr>> Sub<T> for LinExpr {
    type Output = LinExpr;

    fn sub(mut self, rhs: T) -> LinExpr {
        self -= rhs;
        self
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self * -1.0
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(self, rhs: f64) -> LinExpr {
        LinExpr {
            terms: self
                .terms
                .into_iter()
                .map(|(var, coef)| (var, coef * rhs))
                .collect(),
            constant: self.constant * rhs,
        }
    }
}

impl Mul<VarId> for f64 {
    type Output = LinExpr;

    fn mul(self, rhs: VarId) -> LinExpr {
        LinExpr {
            terms: vec![(rhs, self)],
            constant: 0.0,
        }
    }
}

impl Sum<VarId> for LinExpr {
    fn sum<I: Iterator<Item = VarId>>(iter: I) -> Self {
        LinExpr {
            terms: iter.map(|var| (var, 1.0)).collect(),
            constant: 0.0,
        }
    }
}

impl<'a> Sum<&'a VarId> for LinExpr {
    fn sum<I: Iterator<Item = &'a VarId>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    #[display(fmt = "<=")]
    Le,
    #[display(fmt = ">=")]
    Ge,
    #[display(fmt = "==")]
    Eq,
}

/// A named linear constraint `lhs <sense> rhs`, with every variable on the left
#[derive(Debug, Display, Clone, PartialEq)]
#[display(fmt = "{}: {} {}", name, sense, rhs)]
pub struct Constraint {
    pub name: String,
    pub lhs: LinExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(name: String, lhs: LinExpr, sense: Sense, rhs: LinExpr) -> Self {
        let mut lhs = (lhs - rhs).merged();
        let rhs = -lhs.constant;
        lhs.constant = 0.0;
        Constraint {
            name,
            lhs,
            sense,
            rhs,
        }
    }

    pub fn is_satisfied(&self, values: &TiSlice<VarId, f64>, tolerance: f64) -> bool {
        let activity = self.lhs.evaluate(values);
        match self.sense {
            Sense::Le => activity <= self.rhs + tolerance,
            Sense::Ge => activity >= self.rhs - tolerance,
            Sense::Eq => (activity - self.rhs).abs() <= tolerance,
        }
    }
}

/// A minimisation problem over named, bounded variables
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    name: String,
    variables: TiVec<VarId, Variable>,
    constraints: Vec<Constraint>,
    objective: LinExpr,
}

impl Program {
    pub fn new(name: &str) -> Self {
        Program {
            name: name.to_string(),
            variables: TiVec::new(),
            constraints: Vec::new(),
            objective: LinExpr::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_var(&mut self, name: &str, vtype: VarType, bounds: &Range<f64>) -> VarId {
        self.variables.push_and_get_key(Variable {
            name: name.to_string(),
            vtype,
            lower: bounds.start,
            upper: bounds.end,
        })
    }

    pub fn add_constr(
        &mut self,
        name: &str,
        lhs: impl Into<LinExpr>,
        sense: Sense,
        rhs: impl Into<LinExpr>,
    ) {
        self.constraints.push(Constraint::new(
            name.to_string(),
            lhs.into(),
            sense,
            rhs.into(),
        ));
    }

    /// Sets the expression to minimise
    pub fn set_objective(&mut self, objective: LinExpr) {
        self.objective = objective.merged();
    }

    pub fn variables(&self) -> &TiSlice<VarId, Variable> {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn objective(&self) -> &LinExpr {
        &self.objective
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constrs(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value of an assignment
    pub fn evaluate(&self, values: &TiSlice<VarId, f64>) -> f64 {
        self.objective.evaluate(values)
    }

    /// Constraints that `values` does not satisfy within `tolerance`
    pub fn violations<'a>(
        &'a self,
        values: &'a TiSlice<VarId, f64>,
        tolerance: f64,
    ) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| !c.is_satisfied(values, tolerance))
    }

    /// Variables whose value in `values` is out of bounds or not integral
    pub fn bound_violations<'a>(
        &'a self,
        values: &'a TiSlice<VarId, f64>,
        tolerance: f64,
    ) -> impl Iterator<Item = VarId> + 'a {
        self.variables
            .iter_enumerated()
            .filter(move |(var, def)| !def.admits(values[*var], tolerance))
            .map(|(var, _)| var)
    }
}
