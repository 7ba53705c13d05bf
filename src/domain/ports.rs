use crate::core::controller::CycleState;
use crate::domain::model::{
    FillSymbol, GeoPoint, MarkerSymbol, Origin, Place, PlaceMarker, ServiceAreaPolygon,
    TravelDirection, TravelMode,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 單一 break 的求解請求
#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub origin: Origin,
    pub break_value: f64,
    pub travel_mode: TravelMode,
    pub direction: TravelDirection,
    pub out_spatial_reference: u32,
}

#[async_trait]
pub trait Solver: Send + Sync {
    async fn fetch_travel_modes(&self, service_url: &str) -> Result<Vec<TravelMode>>;
    async fn solve(
        &self,
        service_url: &str,
        request: &SolveRequest,
    ) -> Result<Vec<ServiceAreaPolygon>>;
}

pub trait MapSurface: Send + Sync {
    fn draw_point(&self, point: GeoPoint, symbol: &MarkerSymbol);
    fn draw_polygons(&self, polygons: &[ServiceAreaPolygon], symbol: &FillSymbol);
    fn draw_places(&self, markers: &[PlaceMarker]);
    fn clear_all(&self);
    fn current_center(&self) -> GeoPoint;
}

pub trait BusyIndicator: Send + Sync {
    fn transition(&self, state: &CycleState);
}

#[async_trait]
pub trait PlacesSearch: Send + Sync {
    async fn search(
        &self,
        point: GeoPoint,
        radius_m: f64,
        category: Option<&str>,
    ) -> Result<Vec<Place>>;
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credential(&self) -> Result<String>;
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<GeoPoint>;
}
