pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
#[cfg(feature = "server")]
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::AppConfig;

pub use crate::adapters::{arcgis::ArcGisSolver, geojson::GeoJsonCanvas, storage::LocalStorage};
pub use crate::core::{
    controller::{CycleController, CycleReport, CycleRequest, CycleState},
    session::{FormState, ServiceAreaSession},
};
pub use crate::utils::error::{AppError, Result};
