use std::collections::BTreeMap;

use itertools::iproduct;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::sets_and_parameters::{Parameters, Sets};
use crate::config::ModelConfig;
use crate::models::program::{LinExpr, Program, Sense, VarId};
use crate::models::utils::AddVars;
use crate::problem::{Bound, LaneKey, NodePeriod, Period, TableError, Tables};

#[derive(Debug, Clone, PartialEq)]
pub struct Variables {
    /// quantity shipped on lane l
    pub flow: BTreeMap<LaneKey, VarId>,
    /// vehicle trips covering the flow on lane l
    pub trips: BTreeMap<LaneKey, VarId>,
    /// ending inventory of node n in period t
    pub inventory: BTreeMap<NodePeriod, VarId>,
    /// production of node n in period t
    pub production: BTreeMap<NodePeriod, VarId>,
    /// demand of node n in period t left unmet
    pub unmet: BTreeMap<NodePeriod, VarId>,
}

/// Counts of input records the build skipped because they reference something the model does not contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// User constraints naming a lane/period without a flow variable
    pub dangling_user_constraints: usize,
    /// Closing stock bounds for a (node, period) without an inventory variable
    pub unmatched_closing_stock: usize,
    /// Opening stock for a node outside the node universe
    pub unused_opening_stock: usize,
    /// Capacity records outside the planning periods
    pub off_horizon_capacity: usize,
    /// Lanes whose period is outside the planning periods
    pub off_horizon_lanes: usize,
    /// Lanes with an origin or destination outside the node universe
    pub detached_lane_endpoints: usize,
    /// Production costs without a production variable
    pub unused_production_costs: usize,
}

impl Diagnostics {
    pub fn total(&self) -> usize {
        self.dangling_user_constraints
            + self.unmatched_closing_stock
            + self.unused_opening_stock
            + self.off_horizon_capacity
            + self.off_horizon_lanes
            + self.detached_lane_endpoints
            + self.unused_production_costs
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

/// A built planning model: the program, the keyed variables and what the build skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinkerModel {
    pub program: Program,
    pub vars: Variables,
    pub diagnostics: Diagnostics,
    pub periods: Vec<Period>,
}

#[allow(non_snake_case)]
impl ClinkerModel {
    /// Validates `tables` and builds the model from them
    pub fn from_tables(tables: &Tables, config: &ModelConfig) -> Result<ClinkerModel, TableError> {
        tables.validate()?;
        let sets = Sets::new(tables);
        let parameters = Parameters::new(tables);
        Ok(ClinkerModel::build(&sets, &parameters, config))
    }

    /// builds the clinker planning model
    pub fn build(sets: &Sets, parameters: &Parameters, config: &ModelConfig) -> ClinkerModel {
        info!(
            "Building clinker model: {} nodes, {} periods, {} lanes",
            sets.N.len(),
            sets.T.len(),
            sets.L.len()
        );

        let mut program = Program::new("Clinker_Optimization");
        let mut diagnostics = Diagnostics::default();

        //*************CREATE VARIABLES*************//

        let flow = sets.L.iter().cloned().cont(&mut program, "Flow");
        let trips = sets.L.iter().cloned().int(&mut program, "Trips");
        let inventory = iproduct!(&sets.N, &sets.T)
            .map(|(n, t)| NodePeriod::new(n.clone(), *t))
            .cont(&mut program, "Stock");
        let production = sets.P.iter().cloned().cont(&mut program, "Prod");
        let unmet = sets.D.iter().cloned().cont(&mut program, "Unmet");

        let vars = Variables {
            flow,
            trips,
            inventory,
            production,
            unmet,
        };

        // ******************** ADD CONSTRAINTS ********************
        Self::capacity_constraints(&mut program, sets, parameters, &vars, &mut diagnostics);
        Self::inventory_balance(&mut program, sets, parameters, &vars, &mut diagnostics);
        Self::trip_constraints(&mut program, sets, parameters, &vars);
        Self::closing_stock_constraints(&mut program, parameters, &vars, &mut diagnostics);
        Self::user_constraints(&mut program, parameters, &vars, &mut diagnostics);

        let objective = Self::objective(parameters, &vars, config, &mut diagnostics);
        program.set_objective(objective);

        info!(
            "Successfully built clinker model: {} variables, {} constraints",
            program.num_vars(),
            program.num_constrs()
        );
        if !diagnostics.is_clean() {
            warn!(
                "Skipped {} input records while building: {:?}",
                diagnostics.total(),
                diagnostics
            );
        }

        ClinkerModel {
            program,
            vars,
            diagnostics,
            periods: sets.T.clone(),
        }
    }

    pub fn first_period(&self) -> Option<Period> {
        self.periods.first().copied()
    }

    /// production can not exceed capacity
    fn capacity_constraints(
        program: &mut Program,
        sets: &Sets,
        parameters: &Parameters,
        vars: &Variables,
        diagnostics: &mut Diagnostics,
    ) {
        for (key, &cap) in &parameters.capacity {
            match vars.production.get(key) {
                Some(&prod) => {
                    program.add_constr(&format!("ProdCap_{}", key), prod, Sense::Le, cap)
                }
                None => {
                    debug!(
                        "capacity for {} is outside the planning periods {:?}",
                        key, sets.T
                    );
                    diagnostics.off_horizon_capacity += 1;
                }
            }
        }
    }

    /// Chains inventory through the periods of every node:
    /// stock(t) = stock(t-1) + production + inbound - outbound - (demand - unmet)
    fn inventory_balance(
        program: &mut Program,
        sets: &Sets,
        parameters: &Parameters,
        vars: &Variables,
        diagnostics: &mut Diagnostics,
    ) {
        let mut inbound: BTreeMap<NodePeriod, Vec<VarId>> = BTreeMap::new();
        let mut outbound: BTreeMap<NodePeriod, Vec<VarId>> = BTreeMap::new();
        for (lane, &var) in &vars.flow {
            if !sets.in_horizon(lane.period) {
                warn!("lane {} is outside the planning periods", lane);
                diagnostics.off_horizon_lanes += 1;
            }
            if !sets.N.contains(&lane.origin) || !sets.N.contains(&lane.destination) {
                warn!("lane {} has an endpoint without capacity or demand", lane);
                diagnostics.detached_lane_endpoints += 1;
            }
            inbound
                .entry(NodePeriod::new(lane.destination.clone(), lane.period))
                .or_default()
                .push(var);
            outbound
                .entry(NodePeriod::new(lane.origin.clone(), lane.period))
                .or_default()
                .push(var);
        }

        for node in parameters.S_0.keys() {
            if !sets.N.contains(node) {
                warn!("opening stock for unknown node {}", node);
                diagnostics.unused_opening_stock += 1;
            }
        }

        // Periods are sorted, so the fold carries the previous period's stock forward.
        for n in &sets.N {
            let opening = LinExpr::constant(parameters.opening_stock(n));
            sets.T.iter().fold(opening, |previous, &t| {
                let key = NodePeriod::new(n.clone(), t);
                let stock = vars.inventory[&key];

                let mut rhs = previous;
                if let Some(&prod) = vars.production.get(&key) {
                    rhs += prod;
                }
                if let Some(flows) = inbound.get(&key) {
                    rhs += flows.iter().sum::<LinExpr>();
                }
                if let Some(flows) = outbound.get(&key) {
                    rhs -= flows.iter().sum::<LinExpr>();
                }
                rhs -= parameters.demand(&key);
                if let Some(&unmet) = vars.unmet.get(&key) {
                    rhs += unmet;
                }

                program.add_constr(&format!("InvBal_{}", key), stock, Sense::Eq, rhs);
                LinExpr::from(stock)
            });
        }
    }

    /// the flow on a lane is carried by whole trips
    fn trip_constraints(
        program: &mut Program,
        sets: &Sets,
        parameters: &Parameters,
        vars: &Variables,
    ) {
        for lane in &sets.L {
            let q = parameters.lanes[lane].multiplier;
            let flow = vars.flow[lane];
            let trips = vars.trips[lane];
            program.add_constr(&format!("TripCap_{}", lane), flow, Sense::Le, q * trips);
        }
    }

    fn closing_stock_constraints(
        program: &mut Program,
        parameters: &Parameters,
        vars: &Variables,
        diagnostics: &mut Diagnostics,
    ) {
        for (key, bounds) in &parameters.S_close {
            let stock = match vars.inventory.get(key) {
                Some(&stock) => stock,
                None => {
                    warn!("closing stock bounds for {} have no inventory", key);
                    diagnostics.unmatched_closing_stock += 1;
                    continue;
                }
            };
            if let Some(min) = bounds.min {
                program.add_constr(&format!("MinStock_{}", key), stock, Sense::Ge, min);
            }
            if let Some(max) = bounds.max {
                program.add_constr(&format!("MaxStock_{}", key), stock, Sense::Le, max);
            }
        }
    }

    /// User bounds on lane flows. Bounds on lanes that do not exist are skipped.
    fn user_constraints(
        program: &mut Program,
        parameters: &Parameters,
        vars: &Variables,
        diagnostics: &mut Diagnostics,
    ) {
        for fb in &parameters.flow_bounds {
            let flow = match vars.flow.get(&fb.lane) {
                Some(&flow) => flow,
                None => {
                    warn!(
                        "{} constraint of {} on {} references no lane",
                        fb.bound, fb.value, fb.lane
                    );
                    diagnostics.dangling_user_constraints += 1;
                    continue;
                }
            };
            let (name, sense) = match fb.bound {
                Bound::AtMost => ("UserConst_Max", Sense::Le),
                Bound::AtLeast => ("UserConst_Min", Sense::Ge),
                Bound::Exactly => ("UserConst_Eq", Sense::Eq),
            };
            program.add_constr(&format!("{}_{}", name, fb.lane), flow, sense, fb.value);
        }
    }

    /// production cost + logistics cost + holding cost + unmet demand penalty
    fn objective(
        parameters: &Parameters,
        vars: &Variables,
        config: &ModelConfig,
        diagnostics: &mut Diagnostics,
    ) -> LinExpr {
        let mut objective = LinExpr::default();

        for (key, &prod) in &vars.production {
            objective.add_term(prod, parameters.production_cost(key));
        }
        for key in parameters.C_prod.keys() {
            if !vars.production.contains_key(key) {
                debug!("production cost for {} has no production to price", key);
                diagnostics.unused_production_costs += 1;
            }
        }

        for (lane, params) in &parameters.lanes {
            objective.add_term(vars.flow[lane], params.unit_cost);
        }

        if config.trip_cost != 0.0 {
            for &trips in vars.trips.values() {
                objective.add_term(trips, config.trip_cost);
            }
        }

        for &stock in vars.inventory.values() {
            objective.add_term(stock, config.holding_rate);
        }

        for &unmet in vars.unmet.values() {
            objective.add_term(unmet, config.unmet_penalty);
        }

        objective
    }
}
