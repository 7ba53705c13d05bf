use crate::domain::model::GeoPoint;
use crate::domain::ports::Geolocator;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct LocationResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// 透過 IP 定位服務取得大概位置 (回傳 JSON 需含 latitude / longitude)
pub struct HttpGeolocator {
    client: Client,
    endpoint: String,
}

impl HttpGeolocator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn lookup(&self) -> Result<GeoPoint> {
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::NetworkUnavailable {
                message: format!("geolocation answered HTTP {}", status.as_u16()),
            });
        }

        let body: LocationResponse = response.json().await?;
        match (body.longitude, body.latitude) {
            (Some(lon), Some(lat)) => GeoPoint::new(lon, lat),
            _ => Err(AppError::NetworkUnavailable {
                message: "geolocation response has no coordinates".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Geolocator for HttpGeolocator {
    async fn locate(&self) -> Result<GeoPoint> {
        // 任何失敗都視為無法定位
        self.lookup()
            .await
            .map_err(|e| match e {
                AppError::NetworkUnavailable { .. } => e,
                other => AppError::NetworkUnavailable {
                    message: other.to_string(),
                },
            })
    }
}
