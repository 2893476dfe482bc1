use std::collections::{BTreeMap, BTreeSet};

use crate::problem::{Bound, Cost, LaneKey, NodeCode, NodePeriod, Period, Quantity, Tables};

/// sets for the clinker planning model
#[derive(Debug, Clone, PartialEq)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Set of nodes: every production unit and every demand unit
    pub N: BTreeSet<NodeCode>,
    /// Planning periods in ascending order, taken from the demand table
    pub T: Vec<Period>,
    /// Set of lane/period combinations
    pub L: BTreeSet<LaneKey>,
    /// (node, period) pairs that may produce: capacity records inside the planning horizon
    pub P: BTreeSet<NodePeriod>,
    /// (node, period) pairs with a demand record
    pub D: BTreeSet<NodePeriod>,
}

#[allow(non_snake_case)]
impl Sets {
    pub fn new(tables: &Tables) -> Sets {
        let T: Vec<Period> = tables
            .demand
            .iter()
            .map(|r| r.period)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let N = tables
            .capacity_production
            .iter()
            .map(|r| r.node.clone())
            .chain(tables.demand.iter().map(|r| r.node.clone()))
            .collect();

        let P = tables
            .capacity_production
            .iter()
            .filter(|r| T.binary_search(&r.period).is_ok())
            .map(|r| r.key())
            .collect();

        Sets {
            N,
            L: tables.logistics.iter().map(|r| r.key()).collect(),
            P,
            D: tables.demand.iter().map(|r| r.key()).collect(),
            T,
        }
    }

    pub fn in_horizon(&self, period: Period) -> bool {
        self.T.binary_search(&period).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneParameters {
    /// Quantity carried by one trip
    pub multiplier: Quantity,
    /// Freight plus handling cost per unit
    pub unit_cost: Cost,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StockBounds {
    pub min: Option<Quantity>,
    pub max: Option<Quantity>,
}

/// A user bound on the flow of a lane
#[derive(Debug, Clone, PartialEq)]
pub struct FlowBound {
    pub lane: LaneKey,
    pub bound: Bound,
    pub value: Quantity,
}

/// parameters for the clinker planning model
#[derive(Debug, Clone, PartialEq)]
#[allow(non_snake_case)]
pub struct Parameters {
    /// Production capacity of node n in period t
    pub capacity: BTreeMap<NodePeriod, Quantity>,
    /// Demand of node n in period t
    pub demand: BTreeMap<NodePeriod, Quantity>,
    /// Opening stock of node n, applied before the earliest period
    pub S_0: BTreeMap<NodeCode, Quantity>,
    /// Closing stock bounds of node n in period t
    pub S_close: BTreeMap<NodePeriod, StockBounds>,
    /// Trip size and unit cost of every lane/period
    pub lanes: BTreeMap<LaneKey, LaneParameters>,
    /// Unit production cost of node n in period t
    pub C_prod: BTreeMap<NodePeriod, Cost>,
    /// User bounds on lane flows, sorted so the model does not depend on record order
    pub flow_bounds: Vec<FlowBound>,
}

#[allow(non_snake_case)]
impl Parameters {
    pub fn new(tables: &Tables) -> Parameters {
        let capacity = tables
            .capacity_production
            .iter()
            .map(|r| (r.key(), r.capacity))
            .collect();

        let demand = tables.demand.iter().map(|r| (r.key(), r.demand)).collect();

        let S_0 = tables
            .stock_opening
            .iter()
            .map(|r| (r.node.clone(), r.stock))
            .collect();

        let S_close = tables
            .stock_closing
            .iter()
            .map(|r| {
                let bounds = StockBounds {
                    min: r.min,
                    max: r.max,
                };
                (r.key(), bounds)
            })
            .collect();

        let lanes = tables
            .logistics
            .iter()
            .map(|r| {
                let lane = LaneParameters {
                    multiplier: r.multiplier,
                    unit_cost: r.unit_cost(),
                };
                (r.key(), lane)
            })
            .collect();

        let C_prod = tables
            .cost_production
            .iter()
            .map(|r| (r.key(), r.cost))
            .collect();

        let mut flow_bounds: Vec<FlowBound> = tables
            .constraints
            .iter()
            .map(|r| FlowBound {
                lane: r.key(),
                bound: r.bound,
                value: r.value,
            })
            .collect();
        flow_bounds.sort_by(|a, b| {
            (&a.lane, a.bound)
                .cmp(&(&b.lane, b.bound))
                .then(a.value.total_cmp(&b.value))
        });

        Parameters {
            capacity,
            demand,
            S_0,
            S_close,
            lanes,
            C_prod,
            flow_bounds,
        }
    }

    /// Demand of `key`, zero if there is no demand record
    pub fn demand(&self, key: &NodePeriod) -> Quantity {
        self.demand.get(key).copied().unwrap_or(0.0)
    }

    /// Opening stock of `node`, zero if there is no opening stock record
    pub fn opening_stock(&self, node: &NodeCode) -> Quantity {
        self.S_0.get(node).copied().unwrap_or(0.0)
    }

    /// Unit production cost of `key`, zero if there is no cost record
    pub fn production_cost(&self, key: &NodePeriod) -> Cost {
        self.C_prod.get(key).copied().unwrap_or(0.0)
    }
}
