pub mod breaks;
pub mod controller;
pub mod places;
pub mod session;

pub use crate::domain::model::{BreakSequence, Budget, GeoPoint, Origin};
pub use crate::domain::ports::{BusyIndicator, MapSurface, Solver, Storage};
pub use crate::utils::error::Result;
