//! Pure geographic helpers used by the distillation engine.
//!
//! Nothing in here touches storage: coordinates are validated on construction,
//! quantized into fixed 0.01° cells, and compared with the haversine distance.

pub mod cell;
pub mod coordinate;
pub mod distance;

pub use cell::CellId;
pub use coordinate::Coordinate;
pub use distance::distance_km;
