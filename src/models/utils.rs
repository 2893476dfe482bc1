use std::{collections::BTreeMap, fmt::Display, ops::Range};

use super::program::{Program, VarId, VarType};
use typed_index_collections::TiSlice;

pub trait AddVars {
    type Key;

    /// Create one variable per key, named `{base_name}_{key}`
    fn vars(
        self,
        program: &mut Program,
        base_name: &str,
        vtype: VarType,
        bounds: &Range<f64>,
    ) -> BTreeMap<Self::Key, VarId>;

    /// Continuous non-negative variables
    fn cont(self, program: &mut Program, base_name: &str) -> BTreeMap<Self::Key, VarId>
    where
        Self: Sized,
    {
        let bounds = 0.0..f64::INFINITY;
        self.vars(program, base_name, VarType::Continuous, &bounds)
    }

    /// Integer non-negative variables
    fn int(self, program: &mut Program, base_name: &str) -> BTreeMap<Self::Key, VarId>
    where
        Self: Sized,
    {
        self.vars(program, base_name, VarType::Integer, &(0.0..f64::INFINITY))
    }
}

impl<I, K> AddVars for I
where
    I: IntoIterator<Item = K>,
    K: Ord + Display,
{
    type Key = K;

    fn vars(
        self,
        program: &mut Program,
        base_name: &str,
        vtype: VarType,
        bounds: &Range<f64>,
    ) -> BTreeMap<K, VarId> {
        let mut out = BTreeMap::new();
        for key in self {
            out.entry(key).or_insert_with_key(|key| {
                program.add_var(&format!("{}_{}", base_name, key), vtype, bounds)
            });
        }
        out
    }
}

/// Trait that converts variable handles to their solved values
pub trait ConvertVars {
    type Out;
    fn convert(&self, values: &TiSlice<VarId, f64>) -> Self::Out;
}

impl ConvertVars for VarId {
    type Out = f64;

    fn convert(&self, values: &TiSlice<VarId, f64>) -> f64 {
        values[*self]
    }
}

impl<K: Ord + Clone, T: ConvertVars> ConvertVars for BTreeMap<K, T> {
    type Out = BTreeMap<K, T::Out>;

    fn convert(&self, values: &TiSlice<VarId, f64>) -> Self::Out {
        self.iter()
            .map(|(k, v)| (k.clone(), v.convert(values)))
            .collect()
    }
}

/// Values below this are treated as solver noise
pub const EPSILON: f64 = 1e-5;
