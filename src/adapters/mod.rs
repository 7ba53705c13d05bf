// Adapters layer: concrete implementations of the domain ports (ArcGIS REST, files, GeoJSON output).

pub mod arcgis;
pub mod credentials;
pub mod geojson;
pub mod geolocation;
pub mod places;
pub mod storage;
