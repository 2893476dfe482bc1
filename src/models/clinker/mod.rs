pub mod model;
pub mod sets_and_parameters;

pub use model::{ClinkerModel, Diagnostics, Variables};
