pub mod deadline;
pub mod distillation;
pub mod scoring;

pub use deadline::Deadline;
pub use distillation::Distiller;
pub use scoring::ScoringWeights;
