//! Freightcam domain core
//!
//! Emission formulas, the greedy route optimizer and the count snapshot shared
//! by the detector and the HTTP service. Nothing in here performs I/O.

pub mod counts;
pub mod emissions;
pub mod route;

pub use counts::{Counts, Label};
pub use emissions::{
    calculate_emissions, EmissionError, ManualCalculation, ManualEstimate, ManualRequest,
    TransportMode,
};
pub use route::{optimize_route, Location, RouteError, RoutePlan, RouteStats};
