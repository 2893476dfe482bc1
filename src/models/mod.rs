pub mod clinker;
pub mod program;
pub mod utils;

pub use clinker::ClinkerModel;
