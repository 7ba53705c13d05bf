use crate::domain::model::{GeoPoint, Place, PlaceMarker};
use crate::domain::ports::{MapSurface, PlacesSearch};
use crate::utils::error::{AppError, Result};

/// 彈出視窗內容：名稱、分類與距離
pub fn place_marker(place: &Place) -> PlaceMarker {
    let mut lines = Vec::new();

    if !place.categories.is_empty() {
        let labels: Vec<&str> = place.categories.iter().map(|c| c.label.as_str()).collect();
        lines.push(format!("Category: {}", labels.join(", ")));
    }

    if let Some(distance) = place.distance_m {
        lines.push(format!("Distance: {:.0} m", distance));
    }

    PlaceMarker {
        point: place.location,
        title: place.name.clone(),
        popup: lines.join("\n"),
    }
}

/// 查詢附近地點並繪製成標記，回傳標記數量
pub async fn show_nearby_places(
    search: &dyn PlacesSearch,
    surface: &dyn MapSurface,
    point: GeoPoint,
    radius_m: f64,
    category: Option<&str>,
) -> Result<usize> {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(AppError::invalid_input(
            "radius",
            format!("{} must be a positive number of meters", radius_m),
        ));
    }

    tracing::debug!("Searching places within {} m of {}", radius_m, point);
    let places = search.search(point, radius_m, category).await?;
    let markers: Vec<PlaceMarker> = places.iter().map(place_marker).collect();

    surface.draw_places(&markers);
    tracing::info!("📌 Rendered {} place marker(s) around {}", markers.len(), point);

    Ok(markers.len())
}
