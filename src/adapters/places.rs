use crate::domain::model::{GeoPoint, Place, PlaceCategory};
use crate::domain::ports::PlacesSearch;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const PLACES_URL: &str =
    "https://places-api.arcgis.com/arcgis/rest/services/places-service/v1";

#[derive(Debug, Deserialize)]
struct NearPointResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceResult {
    place_id: String,
    name: String,
    location: Location,
    distance: Option<f64>,
    #[serde(default)]
    categories: Vec<CategoryResult>,
}

#[derive(Debug, Deserialize)]
struct Location {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryResult {
    category_id: String,
    label: String,
}

pub struct ArcGisPlaces {
    client: Client,
    base_url: String,
    token: String,
    page_size: u32,
}

impl ArcGisPlaces {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: token.into().trim().to_string(),
            page_size: 20,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl PlacesSearch for ArcGisPlaces {
    async fn search(
        &self,
        point: GeoPoint,
        radius_m: f64,
        category: Option<&str>,
    ) -> Result<Vec<Place>> {
        let url = format!("{}/places/near-point", self.base_url.trim_end_matches('/'));

        let mut query = vec![
            ("x", point.longitude.to_string()),
            ("y", point.latitude.to_string()),
            ("radius", radius_m.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("f", "json".to_string()),
            ("token", self.token.clone()),
        ];
        if let Some(category) = category {
            query.push(("categoryIds", category.to_string()));
        }

        let response = self.client.get(&url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::NetworkUnavailable {
                message: format!("places search returned HTTP {}: {}", status.as_u16(), body),
            });
        }

        let parsed: NearPointResponse = response.json().await?;
        let places = parsed
            .results
            .into_iter()
            .map(|r| Place {
                id: r.place_id,
                name: r.name,
                location: GeoPoint {
                    longitude: r.location.x,
                    latitude: r.location.y,
                },
                distance_m: r.distance,
                categories: r
                    .categories
                    .into_iter()
                    .map(|c| PlaceCategory {
                        id: c.category_id,
                        label: c.label,
                    })
                    .collect(),
            })
            .collect();

        Ok(places)
    }
}
