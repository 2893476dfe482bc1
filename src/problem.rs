use std::{collections::HashSet, fmt::Display, hash::Hash, io::Read};

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// The type used for clinker quantities
pub type Quantity = f64;
/// The type used for cost.
pub type Cost = f64;
/// A planning period. Periods are totally ordered, the earliest one starts from opening stock.
pub type Period = i64;

/// A code cell as exported from a sheet: text, or a number when the code is all digits.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl From<RawCode> for String {
    fn from(raw: RawCode) -> String {
        match raw {
            RawCode::Text(text) => text,
            RawCode::Integer(n) => n.to_string(),
            RawCode::Number(x) if x.fract() == 0.0 && x.abs() < 1e15 => (x as i64).to_string(),
            RawCode::Number(x) => x.to_string(),
        }
    }
}

/// Code of a production unit (IU) or a demand unit (IUGU). Both roles share a single namespace.
#[derive(
    Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Serialize, Deserialize,
)]
#[serde(from = "RawCode", into = "String")]
pub struct NodeCode(String);

impl From<RawCode> for NodeCode {
    fn from(raw: RawCode) -> Self {
        NodeCode(raw.into())
    }
}

impl NodeCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeCode {
    fn from(code: &str) -> Self {
        NodeCode(code.to_string())
    }
}

/// Transport mode of a lane (rail, road, sea, ...)
#[derive(
    Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Serialize, Deserialize,
)]
#[serde(from = "RawCode", into = "String")]
pub struct ModeCode(String);

impl From<RawCode> for ModeCode {
    fn from(raw: RawCode) -> Self {
        ModeCode(raw.into())
    }
}

impl ModeCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModeCode {
    fn from(code: &str) -> Self {
        ModeCode(code.to_string())
    }
}

/// A (node, period) pair. Indexes inventory, production and unmet demand.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "{}_{}", node, period)]
pub struct NodePeriod {
    pub node: NodeCode,
    pub period: Period,
}

impl NodePeriod {
    pub fn new(node: impl Into<NodeCode>, period: Period) -> Self {
        NodePeriod {
            node: node.into(),
            period,
        }
    }
}

/// A directed, mode-specific lane in a given period. Every lane/period is addressed by exactly one key.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "{}_{}_{}_{}", origin, destination, mode, period)]
pub struct LaneKey {
    pub origin: NodeCode,
    pub destination: NodeCode,
    pub mode: ModeCode,
    pub period: Period,
}

impl LaneKey {
    pub fn new(
        origin: impl Into<NodeCode>,
        destination: impl Into<NodeCode>,
        mode: impl Into<ModeCode>,
        period: Period,
    ) -> Self {
        LaneKey {
            origin: origin.into(),
            destination: destination.into(),
            mode: mode.into(),
            period,
        }
    }
}

/// Maximum producible quantity of a production unit in a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRecord {
    #[serde(rename = "IU CODE")]
    pub node: NodeCode,
    #[serde(rename = "TIME PERIOD")]
    pub period: Period,
    #[serde(rename = "CAPACITY")]
    pub capacity: Quantity,
}

impl CapacityRecord {
    pub fn key(&self) -> NodePeriod {
        NodePeriod::new(self.node.clone(), self.period)
    }
}

/// Required quantity at a demand unit in a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    #[serde(rename = "IUGU CODE")]
    pub node: NodeCode,
    #[serde(rename = "TIME PERIOD")]
    pub period: Period,
    #[serde(rename = "DEMAND")]
    pub demand: Quantity,
}

impl DemandRecord {
    pub fn key(&self) -> NodePeriod {
        NodePeriod::new(self.node.clone(), self.period)
    }
}

/// A lane in a period, with the quantity moved per trip and the per-unit freight and handling cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticsRecord {
    #[serde(rename = "FROM IU CODE")]
    pub origin: NodeCode,
    #[serde(rename = "TO IUGU CODE")]
    pub destination: NodeCode,
    #[serde(rename = "TRANSPORT CODE")]
    pub mode: ModeCode,
    #[serde(rename = "TIME PERIOD")]
    pub period: Period,
    #[serde(rename = "QUANTITY MULTIPLIER")]
    pub multiplier: Quantity,
    #[serde(rename = "FREIGHT COST")]
    pub freight_cost: Cost,
    #[serde(rename = "HANDLING COST")]
    pub handling_cost: Cost,
}

impl LogisticsRecord {
    pub fn key(&self) -> LaneKey {
        LaneKey::new(
            self.origin.clone(),
            self.destination.clone(),
            self.mode.clone(),
            self.period,
        )
    }

    /// Cost per unit shipped on the lane
    pub fn unit_cost(&self) -> Cost {
        self.freight_cost + self.handling_cost
    }
}

/// Inventory held at a node before the earliest period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningStockRecord {
    #[serde(rename = "IUGU CODE")]
    pub node: NodeCode,
    #[serde(rename = "OPENING STOCK")]
    pub stock: Quantity,
}

/// Optional bounds on the ending inventory of a node in a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosingStockRecord {
    #[serde(rename = "IUGU CODE")]
    pub node: NodeCode,
    #[serde(rename = "TIME PERIOD")]
    pub period: Period,
    #[serde(rename = "MIN CLOSE STOCK", default)]
    pub min: Option<Quantity>,
    #[serde(rename = "MAX CLOSE STOCK", default)]
    pub max: Option<Quantity>,
}

impl ClosingStockRecord {
    pub fn key(&self) -> NodePeriod {
        NodePeriod::new(self.node.clone(), self.period)
    }
}

/// The relational operator a user constraint applies to a lane flow.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Bound {
    #[serde(rename = "L")]
    #[display(fmt = "at-most")]
    AtMost,
    #[serde(rename = "G")]
    #[display(fmt = "at-least")]
    AtLeast,
    #[serde(rename = "E")]
    #[display(fmt = "exactly")]
    Exactly,
}

/// A user-imposed bound on the flow of a lane in a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConstraintRecord {
    #[serde(rename = "IU CODE")]
    pub origin: NodeCode,
    #[serde(rename = "TRANSPORT CODE")]
    pub mode: ModeCode,
    #[serde(rename = "IUGU CODE")]
    pub destination: NodeCode,
    #[serde(rename = "TIME PERIOD")]
    pub period: Period,
    #[serde(rename = "BOUND TYPEID")]
    pub bound: Bound,
    #[serde(rename = "Value")]
    pub value: Quantity,
}

impl UserConstraintRecord {
    pub fn key(&self) -> LaneKey {
        LaneKey::new(
            self.origin.clone(),
            self.destination.clone(),
            self.mode.clone(),
            self.period,
        )
    }
}

/// Unit production cost of a production unit in a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionCostRecord {
    #[serde(rename = "IU CODE")]
    pub node: NodeCode,
    #[serde(rename = "TIME PERIOD")]
    pub period: Period,
    #[serde(rename = "PRODUCTION COST")]
    pub cost: Cost,
}

impl ProductionCostRecord {
    pub fn key(&self) -> NodePeriod {
        NodePeriod::new(self.node.clone(), self.period)
    }
}

/// The normalized input tables of a planning run, keyed by role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    pub capacity_production: Vec<CapacityRecord>,
    pub demand: Vec<DemandRecord>,
    pub logistics: Vec<LogisticsRecord>,
    pub stock_opening: Vec<OpeningStockRecord>,
    pub stock_closing: Vec<ClosingStockRecord>,
    /// Optional. An absent or empty table adds no constraints.
    #[serde(default)]
    pub constraints: Vec<UserConstraintRecord>,
    pub cost_production: Vec<ProductionCostRecord>,
}

#[derive(Debug, Display)]
pub enum TableError {
    #[display(fmt = "malformed input tables: {}", _0)]
    Malformed(serde_json::Error),
    #[display(fmt = "{}: {} is not a finite number for {}", table, field, key)]
    NonFinite {
        table: &'static str,
        field: &'static str,
        key: String,
    },
    #[display(fmt = "{}: negative {} {} for {}", table, field, value, key)]
    Negative {
        table: &'static str,
        field: &'static str,
        key: String,
        value: f64,
    },
    #[display(fmt = "{}: duplicate record for {}", table, key)]
    DuplicateKey { table: &'static str, key: String },
    #[display(fmt = "{}: minimum {} exceeds maximum {} for {}", table, min, max, key)]
    InvertedBounds {
        table: &'static str,
        key: String,
        min: f64,
        max: f64,
    },
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TableError {
    fn from(err: serde_json::Error) -> Self {
        TableError::Malformed(err)
    }
}

/// Checks that `value` is finite, and non-negative unless `signed`.
fn number(
    table: &'static str,
    field: &'static str,
    key: &dyn Display,
    value: f64,
    signed: bool,
) -> Result<(), TableError> {
    if !value.is_finite() {
        return Err(TableError::NonFinite {
            table,
            field,
            key: key.to_string(),
        });
    }
    if !signed && value < 0.0 {
        return Err(TableError::Negative {
            table,
            field,
            key: key.to_string(),
            value,
        });
    }
    Ok(())
}

fn unique<K: Hash + Eq + Display>(
    table: &'static str,
    keys: impl IntoIterator<Item = K>,
) -> Result<(), TableError> {
    let mut seen = HashSet::new();
    for key in keys {
        if seen.contains(&key) {
            return Err(TableError::DuplicateKey {
                table,
                key: key.to_string(),
            });
        }
        seen.insert(key);
    }
    Ok(())
}

impl Tables {
    /// Decodes and validates tables from a JSON document keyed by table role.
    pub fn from_json(json: &str) -> Result<Tables, TableError> {
        let tables: Tables = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Tables, TableError> {
        let tables: Tables = serde_json::from_reader(reader)?;
        tables.validate()?;
        Ok(tables)
    }

    /// Rejects unusable numbers, inverted closing stock bounds and repeated keys in keyed tables.
    pub fn validate(&self) -> Result<(), TableError> {
        for r in &self.capacity_production {
            let key = r.key();
            number("capacity_production", "CAPACITY", &key, r.capacity, false)?;
        }
        unique(
            "capacity_production",
            self.capacity_production.iter().map(|r| r.key()),
        )?;

        for r in &self.demand {
            number("demand", "DEMAND", &r.key(), r.demand, false)?;
        }
        unique("demand", self.demand.iter().map(|r| r.key()))?;

        for r in &self.logistics {
            let (table, key) = ("logistics", r.key());
            number(table, "QUANTITY MULTIPLIER", &key, r.multiplier, false)?;
            number(table, "FREIGHT COST", &key, r.freight_cost, true)?;
            number(table, "HANDLING COST", &key, r.handling_cost, true)?;
        }
        unique("logistics", self.logistics.iter().map(|r| r.key()))?;

        for r in &self.stock_opening {
            number("stock_opening", "OPENING STOCK", &r.node, r.stock, false)?;
        }
        unique("stock_opening", self.stock_opening.iter().map(|r| &r.node))?;

        for r in &self.stock_closing {
            let key = r.key();
            if let Some(min) = r.min {
                number("stock_closing", "MIN CLOSE STOCK", &key, min, false)?;
            }
            if let Some(max) = r.max {
                number("stock_closing", "MAX CLOSE STOCK", &key, max, false)?;
            }
            if let (Some(min), Some(max)) = (r.min, r.max) {
                if min > max {
                    return Err(TableError::InvertedBounds {
                        table: "stock_closing",
                        key: key.to_string(),
                        min,
                        max,
                    });
                }
            }
        }
        unique("stock_closing", self.stock_closing.iter().map(|r| r.key()))?;

        for r in &self.constraints {
            number("constraints", "Value", &r.key(), r.value, true)?;
        }

        for r in &self.cost_production {
            number("cost_production", "PRODUCTION COST", &r.key(), r.cost, true)?;
        }
        unique(
            "cost_production",
            self.cost_production.iter().map(|r| r.key()),
        )?;

        Ok(())
    }

    /// Fixes the flow of a lane in a period to `quantity` on the next build, by appending an
    /// `exactly` user constraint.
    pub fn pin_allocation(&mut self, lane: &LaneKey, quantity: Quantity) {
        self.constraints.push(UserConstraintRecord {
            origin: lane.origin.clone(),
            mode: lane.mode.clone(),
            destination: lane.destination.clone(),
            period: lane.period,
            bound: Bound::Exactly,
            value: quantity,
        });
    }
}
