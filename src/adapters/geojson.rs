use crate::core::controller::CycleState;
use crate::domain::model::{FillSymbol, GeoPoint, MarkerSymbol, PlaceMarker, ServiceAreaPolygon};
use crate::domain::ports::{BusyIndicator, MapSurface};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// 底圖與縮放，輸出時寫進 FeatureCollection 的 foreign members
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub basemap: String,
    pub zoom: u8,
}

/// 無頭的地圖畫布：每次繪製都轉成 GeoJSON feature，依繪製順序保存
pub struct GeoJsonCanvas {
    center: GeoPoint,
    view: Option<MapView>,
    features: Mutex<Vec<Feature>>,
}

impl GeoJsonCanvas {
    pub fn new(center: GeoPoint) -> Self {
        Self {
            center,
            view: None,
            features: Mutex::new(Vec::new()),
        }
    }

    pub fn with_view(mut self, basemap: impl Into<String>, zoom: u8) -> Self {
        self.view = Some(MapView {
            basemap: basemap.into(),
            zoom,
        });
        self
    }

    fn push(&self, feature: Feature) {
        match self.features.lock() {
            Ok(mut features) => features.push(feature),
            Err(poisoned) => poisoned.into_inner().push(feature),
        }
    }

    pub fn features(&self) -> Vec<Feature> {
        match self.features.lock() {
            Ok(features) => features.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.features().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut members = JsonObject::new();
        members.insert(
            "center".to_string(),
            json!([self.center.longitude, self.center.latitude]),
        );
        if let Some(view) = &self.view {
            members.insert("basemap".to_string(), json!(view.basemap));
            members.insert("zoom".to_string(), json!(view.zoom));
        }

        FeatureCollection {
            bbox: None,
            features: self.features(),
            foreign_members: Some(members),
        }
    }
}

fn point_geometry(point: GeoPoint) -> Geometry {
    Geometry::new(Value::Point(vec![point.longitude, point.latitude]))
}

fn polygon_geometry(polygon: &ServiceAreaPolygon) -> Geometry {
    let rings = polygon
        .rings
        .iter()
        .map(|ring| ring.iter().map(|[x, y]| vec![*x, *y]).collect())
        .collect();
    Geometry::new(Value::Polygon(rings))
}

impl MapSurface for GeoJsonCanvas {
    fn draw_point(&self, point: GeoPoint, symbol: &MarkerSymbol) {
        let mut feature = Feature::from(point_geometry(point));
        feature.set_property("kind", "origin");
        feature.set_property("marker-color", symbol.color.clone());
        feature.set_property("marker-size", symbol.size);
        self.push(feature);
    }

    fn draw_polygons(&self, polygons: &[ServiceAreaPolygon], symbol: &FillSymbol) {
        for polygon in polygons {
            let mut feature = Feature::from(polygon_geometry(polygon));
            // 服務回傳的屬性 (FromBreak、ToBreak…) 原樣保留
            feature.properties = Some(polygon.attributes.clone());
            feature.set_property("kind", "service_area");
            feature.set_property("break_value", json!(polygon.break_value));
            feature.set_property("fill", symbol.color.clone());
            feature.set_property("fill-pattern", symbol.pattern.as_str());
            feature.set_property("stroke", symbol.outline.color.clone());
            feature.set_property("stroke-width", symbol.outline.width);
            self.push(feature);
        }
    }

    fn draw_places(&self, markers: &[PlaceMarker]) {
        for marker in markers {
            let mut feature = Feature::from(point_geometry(marker.point));
            feature.set_property("kind", "place");
            feature.set_property("title", marker.title.clone());
            feature.set_property("popup", marker.popup.clone());
            self.push(feature);
        }
    }

    fn clear_all(&self) {
        match self.features.lock() {
            Ok(mut features) => features.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn current_center(&self) -> GeoPoint {
        self.center
    }
}

/// 把週期狀態寫到日誌，並保存目前是否忙碌
#[derive(Default)]
pub struct LoggingBusyIndicator {
    busy: AtomicBool,
}

impl LoggingBusyIndicator {
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

impl BusyIndicator for LoggingBusyIndicator {
    fn transition(&self, state: &CycleState) {
        self.busy.store(state.is_busy(), Ordering::SeqCst);
        match state {
            CycleState::Idle => tracing::debug!("Overlay idle"),
            CycleState::Resolving => tracing::info!("⏳ Calculating overlay..."),
            CycleState::Solving { index, break_value } => {
                tracing::info!("⏳ Solving break #{} ({})", index + 1, break_value)
            }
        }
    }
}
