use crate::domain::model::{ServiceAreaPolygon, TravelMode};
use crate::domain::ports::{SolveRequest, Solver};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const SERVICE_AREA_URL: &str =
    "https://route-api.arcgis.com/arcgis/rest/services/World/ServiceAreas/NAServer/ServiceArea_World";

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Option<i64>,
    message: String,
    #[serde(default)]
    details: Vec<String>,
}

impl ServiceError {
    fn describe(&self) -> String {
        let mut text = match self.code {
            Some(code) => format!("{} (code {})", self.message, code),
            None => self.message.clone(),
        };
        if !self.details.is_empty() {
            text.push_str(": ");
            text.push_str(&self.details.join("; "));
        }
        text
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceDescription {
    #[serde(default)]
    supported_travel_modes: Vec<serde_json::Value>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    sa_polygons: Option<FeatureSet>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct FeatureSet {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
    geometry: Option<PolygonGeometry>,
}

#[derive(Debug, Deserialize)]
struct PolygonGeometry {
    #[serde(default)]
    rings: Vec<Vec<[f64; 2]>>,
}

/// ArcGIS 網路分析服務的 REST 用戶端
pub struct ArcGisSolver {
    client: Client,
    token: String,
}

impl ArcGisSolver {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), token)
    }

    pub fn with_timeout(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, token))
    }

    pub fn with_client(client: Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into().trim().to_string(),
        }
    }

    fn facilities_json(request: &SolveRequest) -> serde_json::Value {
        serde_json::json!({
            "spatialReference": { "wkid": 4326 },
            "features": [{
                "geometry": {
                    "x": request.origin.point.longitude,
                    "y": request.origin.point.latitude,
                },
                "attributes": { "Name": request.origin.reference },
            }],
        })
    }

    /// 組合 solveServiceArea 的表單參數
    fn solve_form(&self, request: &SolveRequest) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("f", "json".to_string()),
            ("token", self.token.clone()),
            (
                "facilities",
                serde_json::to_string(&Self::facilities_json(request))?,
            ),
            ("defaultBreaks", request.break_value.to_string()),
            ("travelMode", serde_json::to_string(&request.travel_mode.raw)?),
            (
                "travelDirection",
                request.direction.as_rest_enum().to_string(),
            ),
            ("outSR", request.out_spatial_reference.to_string()),
            ("trimOuterPolygon", "true".to_string()),
            ("returnFacilities", "false".to_string()),
        ])
    }
}

fn travel_mode_from_json(raw: serde_json::Value) -> Option<TravelMode> {
    let name = raw.get("name")?.as_str()?.to_string();
    let id = raw
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    Some(TravelMode { name, id, raw })
}

#[async_trait]
impl Solver for ArcGisSolver {
    async fn fetch_travel_modes(&self, service_url: &str) -> Result<Vec<TravelMode>> {
        tracing::debug!("Fetching service description from: {}", service_url);
        let response = self
            .client
            .get(service_url)
            .query(&[("f", "json"), ("token", self.token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::CatalogUnavailable {
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let description: ServiceDescription = response.json().await?;
        if let Some(error) = description.error {
            return Err(AppError::CatalogUnavailable {
                message: error.describe(),
            });
        }

        let modes: Vec<TravelMode> = description
            .supported_travel_modes
            .into_iter()
            .filter_map(travel_mode_from_json)
            .collect();

        tracing::debug!("Service offers {} travel mode(s)", modes.len());
        Ok(modes)
    }

    async fn solve(
        &self,
        service_url: &str,
        request: &SolveRequest,
    ) -> Result<Vec<ServiceAreaPolygon>> {
        let url = format!("{}/solveServiceArea", service_url.trim_end_matches('/'));
        let form = self.solve_form(request)?;

        tracing::debug!(
            "Solving service area at {} for break {} ({})",
            request.origin.point,
            request.break_value,
            request.direction.as_wire()
        );

        let response = self.client.post(&url).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Solve {
                break_value: request.break_value,
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let solved: SolveResponse = response.json().await?;
        if let Some(error) = solved.error {
            return Err(AppError::Solve {
                break_value: request.break_value,
                message: error.describe(),
            });
        }

        let polygons = solved
            .sa_polygons
            .map(|set| set.features)
            .unwrap_or_default()
            .into_iter()
            .map(|feature| ServiceAreaPolygon {
                rings: feature.geometry.map(|g| g.rings).unwrap_or_default(),
                attributes: feature.attributes,
                break_value: None,
            })
            .collect();

        Ok(polygons)
    }
}
