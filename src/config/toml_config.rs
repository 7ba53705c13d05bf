use crate::adapters::arcgis::SERVICE_AREA_URL;
use crate::adapters::places::PLACES_URL;
use crate::core::breaks::DEFAULT_MAX_BREAKS;
use crate::core::controller::{ControllerSettings, RetryPolicy};
use crate::core::session::{FormState, DEFAULT_CENTER};
use crate::domain::model::{AreaType, FillPattern, GeoPoint, TravelDirection};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{
    validate_budget, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub solve: SolveConfig,
    pub map: MapConfig,
    pub places: PlacesConfig,
    pub server: ServerConfig,
    pub defaults: FormDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service_area_url: String,
    pub api_key: Option<String>,
    /// 後端 `/api-key` 位址，設定時優先於 api_key
    pub key_endpoint: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_area_url: SERVICE_AREA_URL.to_string(),
            api_key: None,
            key_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveConfig {
    pub timeout_seconds: u64,
    pub catalog_timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub out_spatial_reference: u32,
    /// 遞增模式下一個週期最多的 break 數
    pub max_breaks: usize,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            catalog_timeout_seconds: 30,
            retry_attempts: 1,
            retry_delay_ms: 500,
            out_spatial_reference: 4326,
            max_breaks: DEFAULT_MAX_BREAKS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub basemap: String,
    /// [經度, 緯度]
    pub default_center: [f64; 2],
    pub default_zoom: u8,
    pub geolocation_url: Option<String>,
    pub geolocation_timeout_seconds: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            basemap: "arcgis-navigation".to_string(),
            default_center: [DEFAULT_CENTER.longitude, DEFAULT_CENTER.latitude],
            default_zoom: 10,
            geolocation_url: None,
            geolocation_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub url: String,
    pub radius_m: f64,
    pub page_size: u32,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            url: PLACES_URL.to_string(),
            radius_m: 500.0,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_dir: "public".to_string(),
        }
    }
}

/// 表單預設值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefaults {
    pub budget: f64,
    pub area_type: AreaType,
    pub travel_mode: String,
    pub direction: String,
    pub increment: bool,
    pub style: FillPattern,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            budget: 15.0,
            area_type: AreaType::Time,
            travel_mode: "Driving".to_string(),
            direction: "From Location".to_string(),
            increment: false,
            style: FillPattern::Solid,
        }
    }
}

impl FormDefaults {
    pub fn to_form(&self) -> Result<FormState> {
        Ok(FormState {
            budget: self.budget,
            area_type: self.area_type,
            travel_mode: self.travel_mode.clone(),
            direction: self.direction.parse::<TravelDirection>()?,
            increment_enabled: self.increment,
            fill_pattern: self.style,
        })
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AppError::Io)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| AppError::config("toml_parsing", format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${ARCGIS_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| AppError::config("toml_parsing", e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn default_center(&self) -> Result<GeoPoint> {
        GeoPoint::new(self.map.default_center[0], self.map.default_center[1])
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            service_url: self.service.service_area_url.clone(),
            solve_timeout: Duration::from_secs(self.solve.timeout_seconds),
            catalog_timeout: Duration::from_secs(self.solve.catalog_timeout_seconds),
            retry: RetryPolicy {
                max_attempts: self.solve.retry_attempts.max(1),
                base_delay: Duration::from_millis(self.solve.retry_delay_ms),
            },
            out_spatial_reference: self.solve.out_spatial_reference,
            max_breaks: self.solve.max_breaks,
        }
    }

    /// 未替換的 ${VAR} 代表環境變數不存在
    pub fn api_key(&self) -> Option<&str> {
        self.service
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty() && !key.starts_with("${"))
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_url("service.service_area_url", &self.service.service_area_url)?;
        if let Some(endpoint) = &self.service.key_endpoint {
            validate_url("service.key_endpoint", endpoint)?;
        }

        validate_positive_number("solve.timeout_seconds", self.solve.timeout_seconds, 1)?;
        validate_positive_number(
            "solve.catalog_timeout_seconds",
            self.solve.catalog_timeout_seconds,
            1,
        )?;
        validate_range("solve.retry_attempts", self.solve.retry_attempts, 1, 10)?;
        validate_range("solve.max_breaks", self.solve.max_breaks, 1, 1000)?;

        self.default_center()
            .map_err(|e| AppError::config("map.default_center", e.to_string()))?;
        validate_range("map.default_zoom", self.map.default_zoom, 0, 23)?;
        validate_non_empty_string("map.basemap", &self.map.basemap)?;
        if let Some(url) = &self.map.geolocation_url {
            validate_url("map.geolocation_url", url)?;
        }

        validate_url("places.url", &self.places.url)?;
        if !self.places.radius_m.is_finite() || self.places.radius_m <= 0.0 {
            return Err(AppError::config(
                "places.radius_m",
                "radius must be a positive number of meters",
            ));
        }

        validate_non_empty_string("server.host", &self.server.host)?;
        validate_path("server.public_dir", &self.server.public_dir)?;

        validate_budget(self.defaults.budget)
            .map_err(|e| AppError::config("defaults.budget", e.to_string()))?;
        self.defaults
            .to_form()
            .map_err(|e| AppError::config("defaults.direction", e.to_string()))?;

        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
