use derive_more::Display;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::models::clinker::ClinkerModel;
use crate::models::utils::{ConvertVars, EPSILON};
use crate::problem::{LaneKey, ModeCode, NodeCode, Period, Quantity};
use crate::solver::{Outcome, SolveStatus};

pub const ACTIVE: &str = "Active";
pub const PENDING: &str = "Pending";

/// One lane/period of the plan that actually carries clinker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    #[serde(rename = "From")]
    pub from: NodeCode,
    #[serde(rename = "To")]
    pub to: NodeCode,
    #[serde(rename = "Mode")]
    pub mode: ModeCode,
    #[serde(rename = "Period")]
    pub period: Period,
    #[serde(rename = "Quantity")]
    pub quantity: Quantity,
    #[serde(rename = "Trips")]
    pub trips: u64,
    #[serde(rename = "Status")]
    pub status: String,
}

impl Shipment {
    pub fn key(&self) -> LaneKey {
        LaneKey::new(
            self.from.clone(),
            self.to.clone(),
            self.mode.clone(),
            self.period,
        )
    }
}

/// Demand the plan leaves unsatisfied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmetDemand {
    #[serde(rename = "Node")]
    pub node: NodeCode,
    #[serde(rename = "Period")]
    pub period: Period,
    #[serde(rename = "Quantity")]
    pub quantity: Quantity,
}

/// Decides the initial status label of a shipment.
pub trait StatusPolicy {
    fn label(&self, period: Period, first_period: Period) -> String;
}

/// Shipments in the first plan period are `Active`, later ones `Pending`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPeriodActive;

impl StatusPolicy for FirstPeriodActive {
    fn label(&self, period: Period, first_period: Period) -> String {
        if period == first_period {
            ACTIVE.to_string()
        } else {
            PENDING.to_string()
        }
    }
}

impl<F> StatusPolicy for F
where
    F: Fn(Period, Period) -> String,
{
    fn label(&self, period: Period, first_period: Period) -> String {
        self(period, first_period)
    }
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum ExtractError {
    #[display(fmt = "solver finished with status {}, no plan available", _0)]
    NotOptimal(SolveStatus),
    #[display(fmt = "assignment has {} values for {} variables", actual, expected)]
    AssignmentSize { expected: usize, actual: usize },
}

impl std::error::Error for ExtractError {}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum PlanEditError {
    #[display(fmt = "no shipment {} in the plan", _0)]
    ShipmentNotFound(LaneKey),
}

impl std::error::Error for PlanEditError {}

/// The shipment plan of an optimal solve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentPlan {
    pub objective: f64,
    pub shipments: Vec<Shipment>,
    #[serde(default)]
    pub unmet: Vec<UnmetDemand>,
}

impl ShipmentPlan {
    /// Reads back the solved assignment of `model` into shipment records.
    ///
    /// Only lanes with strictly positive flow become shipments. A non-optimal outcome yields no
    /// plan at all, only its status.
    pub fn extract(
        model: &ClinkerModel,
        outcome: &Outcome,
        policy: &dyn StatusPolicy,
    ) -> Result<ShipmentPlan, ExtractError> {
        if !outcome.is_optimal() {
            warn!("No plan: solver status {}", outcome.status);
            return Err(ExtractError::NotOptimal(outcome.status));
        }
        let expected = model.program.num_vars();
        if outcome.values.len() != expected {
            return Err(ExtractError::AssignmentSize {
                expected,
                actual: outcome.values.len(),
            });
        }

        let values = &outcome.values;
        let flows = model.vars.flow.convert(values);
        let trips = model.vars.trips.convert(values);

        let shipments: Vec<Shipment> = flows
            .into_iter()
            .filter(|&(_, quantity)| quantity > EPSILON)
            .map(|(lane, quantity)| {
                let trips = trips.get(&lane).copied().unwrap_or(0.0).round().max(0.0) as u64;
                // without planning periods every lane is its own first period
                let first = model.first_period().unwrap_or(lane.period);
                Shipment {
                    status: policy.label(lane.period, first),
                    from: lane.origin,
                    to: lane.destination,
                    mode: lane.mode,
                    period: lane.period,
                    quantity,
                    trips,
                }
            })
            .collect();

        let unmet: Vec<UnmetDemand> = model
            .vars
            .unmet
            .convert(values)
            .into_iter()
            .filter(|&(_, quantity)| quantity > EPSILON)
            .map(|(key, quantity)| UnmetDemand {
                node: key.node,
                period: key.period,
                quantity,
            })
            .collect();

        let objective = model.program.evaluate(values);
        info!(
            "Extracted {} shipments, {} unmet demands, objective {}",
            shipments.len(),
            unmet.len(),
            objective
        );
        if !unmet.is_empty() {
            warn!(
                "Plan leaves {} units of demand unmet",
                unmet.iter().map(|u| u.quantity).sum::<f64>()
            );
        }

        Ok(ShipmentPlan {
            objective,
            shipments,
            unmet,
        })
    }

    pub fn shipment(&self, key: &LaneKey) -> Option<&Shipment> {
        self.shipments.iter().find(|s| &s.key() == key)
    }

    /// Overwrites the status label of every record for `key`
    pub fn update_status(&mut self, key: &LaneKey, status: &str) -> Result<(), PlanEditError> {
        let mut found = false;
        for shipment in self.shipments.iter_mut().filter(|s| &s.key() == key) {
            shipment.status = status.to_string();
            found = true;
        }
        if found {
            info!("Status of {} updated to {}", key, status);
            Ok(())
        } else {
            Err(PlanEditError::ShipmentNotFound(key.clone()))
        }
    }

    /// Appends a manually decided allocation to the plan
    pub fn record_allocation(
        &mut self,
        key: &LaneKey,
        quantity: Quantity,
        trips: u64,
        status: &str,
    ) {
        self.shipments.push(Shipment {
            from: key.origin.clone(),
            to: key.destination.clone(),
            mode: key.mode.clone(),
            period: key.period,
            quantity,
            trips,
            status: status.to_string(),
        });
    }

    pub fn total_unmet(&self) -> Quantity {
        self.unmet.iter().map(|u| u.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::models::program::Assignment;
    use crate::problem::{CapacityRecord, DemandRecord, LogisticsRecord, NodePeriod, Tables};

    fn model() -> ClinkerModel {
        let lane = |period| LogisticsRecord {
            origin: "P".into(),
            destination: "D".into(),
            mode: "rail".into(),
            period,
            multiplier: 50.0,
            freight_cost: 1.0,
            handling_cost: 0.0,
        };
        let tables = Tables {
            capacity_production: vec![CapacityRecord {
                node: "P".into(),
                period: 1,
                capacity: 100.0,
            }],
            demand: vec![
                DemandRecord {
                    node: "D".into(),
                    period: 1,
                    demand: 80.0,
                },
                DemandRecord {
                    node: "D".into(),
                    period: 2,
                    demand: 10.0,
                },
            ],
            logistics: vec![lane(1), lane(2)],
            ..Default::default()
        };
        ClinkerModel::from_tables(&tables, &ModelConfig::default()).unwrap()
    }

    fn outcome(model: &ClinkerModel, flows: [f64; 2], trips: [f64; 2], unmet: f64) -> Outcome {
        let mut values: Assignment = vec![0.0; model.program.num_vars()].into();
        for (i, period) in [1, 2].into_iter().enumerate() {
            let lane = LaneKey::new("P", "D", "rail", period);
            values[model.vars.flow[&lane]] = flows[i];
            values[model.vars.trips[&lane]] = trips[i];
        }
        values[model.vars.unmet[&NodePeriod::new("D", 2)]] = unmet;
        Outcome::optimal(values)
    }

    #[test]
    fn zero_flow_lanes_are_omitted() {
        let model = model();
        let plan = ShipmentPlan::extract(
            &model,
            &outcome(&model, [80.0, 0.0], [2.0, 0.0], 10.0),
            &FirstPeriodActive,
        )
        .unwrap();
        assert_eq!(
            plan.shipments,
            vec![Shipment {
                from: "P".into(),
                to: "D".into(),
                mode: "rail".into(),
                period: 1,
                quantity: 80.0,
                trips: 2,
                status: ACTIVE.to_string(),
            }]
        );
        assert_eq!(plan.unmet.len(), 1);
        assert_eq!(plan.total_unmet(), 10.0);
        assert!(plan.objective >= 10.0 * 1_000_000.0);
    }

    #[test]
    fn trips_are_rounded_and_later_periods_pending() {
        let model = model();
        let plan = ShipmentPlan::extract(
            &model,
            &outcome(&model, [80.0, 10.0], [1.9999997, 1.0000002], 0.0),
            &FirstPeriodActive,
        )
        .unwrap();
        let trips: Vec<u64> = plan.shipments.iter().map(|s| s.trips).collect();
        assert_eq!(trips, vec![2, 1]);
        assert_eq!(plan.shipments[1].status, PENDING);
        assert!(plan.unmet.is_empty());
    }

    #[test]
    fn custom_status_policy() {
        let model = model();
        let policy = |period: Period, _first: Period| format!("Wave {}", period);
        let plan = ShipmentPlan::extract(
            &model,
            &outcome(&model, [80.0, 10.0], [2.0, 1.0], 0.0),
            &policy,
        )
        .unwrap();
        assert_eq!(plan.shipments[0].status, "Wave 1");
        assert_eq!(plan.shipments[1].status, "Wave 2");
    }

    #[test]
    fn non_optimal_status_yields_no_plan() {
        let model = model();
        for status in [
            SolveStatus::Infeasible,
            SolveStatus::Unbounded,
            SolveStatus::NotSolved,
        ] {
            let result = ShipmentPlan::extract(
                &model,
                &Outcome::without_solution(status),
                &FirstPeriodActive,
            );
            assert_eq!(result, Err(ExtractError::NotOptimal(status)));
        }
    }

    #[test]
    fn short_assignment_is_rejected() {
        let model = model();
        let outcome = Outcome::optimal(vec![0.0; 3].into());
        assert!(matches!(
            ShipmentPlan::extract(&model, &outcome, &FirstPeriodActive),
            Err(ExtractError::AssignmentSize { actual: 3, .. })
        ));
    }

    #[test]
    fn update_status_by_composite_key() {
        let model = model();
        let mut plan = ShipmentPlan::extract(
            &model,
            &outcome(&model, [80.0, 10.0], [2.0, 1.0], 0.0),
            &FirstPeriodActive,
        )
        .unwrap();
        let key = LaneKey::new("P", "D", "rail", 2);
        plan.update_status(&key, "Dispatched").unwrap();
        assert_eq!(plan.shipment(&key).unwrap().status, "Dispatched");
        assert_eq!(plan.shipments[0].status, ACTIVE);

        let missing = LaneKey::new("P", "D", "sea", 2);
        assert_eq!(
            plan.update_status(&missing, "Dispatched"),
            Err(PlanEditError::ShipmentNotFound(missing.clone()))
        );
    }

    #[test]
    fn recorded_allocation_is_visible() {
        let mut plan = ShipmentPlan::default();
        let key = LaneKey::new("P", "D", "rail", 3);
        plan.record_allocation(&key, 25.0, 1, PENDING);
        let shipment = plan.shipment(&key).unwrap();
        assert_eq!(shipment.quantity, 25.0);
        assert_eq!(shipment.status, PENDING);
    }

    #[test]
    fn shipment_columns() {
        let shipment = Shipment {
            from: "P".into(),
            to: "D".into(),
            mode: "rail".into(),
            period: 1,
            quantity: 80.0,
            trips: 2,
            status: ACTIVE.to_string(),
        };
        let json = serde_json::to_value(&shipment).unwrap();
        assert_eq!(json["From"], "P");
        assert_eq!(json["To"], "D");
        assert_eq!(json["Mode"], "rail");
        assert_eq!(json["Period"], 1);
        assert_eq!(json["Quantity"], 80.0);
        assert_eq!(json["Trips"], 2);
        assert_eq!(json["Status"], "Active");
    }
}
