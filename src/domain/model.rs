use crate::utils::error::{AppError, Result};
use crate::utils::validation::{validate_budget, validate_coordinates};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// WGS84 座標點 (經度, 緯度)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Result<Self> {
        validate_coordinates(longitude, latitude)?;
        Ok(Self {
            longitude,
            latitude,
        })
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.longitude, self.latitude)
    }
}

impl FromStr for GeoPoint {
    type Err = AppError;

    /// 解析 "LON,LAT" 格式
    fn from_str(s: &str) -> Result<Self> {
        let (lon, lat) = s
            .split_once(',')
            .ok_or_else(|| AppError::invalid_input("point", format!("expected LON,LAT, got '{}'", s)))?;
        let longitude = lon
            .trim()
            .parse::<f64>()
            .map_err(|e| AppError::invalid_input("longitude", e.to_string()))?;
        let latitude = lat
            .trim()
            .parse::<f64>()
            .map_err(|e| AppError::invalid_input("latitude", e.to_string()))?;
        Self::new(longitude, latitude)
    }
}

/// 提交給求解服務的 facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub point: GeoPoint,
    pub reference: String,
}

impl Origin {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            point,
            reference: "origin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Distance,
    Time,
}

impl AreaType {
    /// 旅行模式名稱的後綴，例如 "Driving Time"
    pub fn label(&self) -> &'static str {
        match self {
            AreaType::Distance => "Distance",
            AreaType::Time => "Time",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            AreaType::Distance => "kilometers",
            AreaType::Time => "minutes",
        }
    }
}

impl FromStr for AreaType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "distance" => Ok(AreaType::Distance),
            "time" => Ok(AreaType::Time),
            other => Err(AppError::invalid_input(
                "area_type",
                format!("'{}' is neither distance nor time", other),
            )),
        }
    }
}

/// 組合目錄查詢用的旅行模式名稱
pub fn travel_mode_name(kind: &str, area_type: AreaType) -> String {
    format!("{} {}", kind.trim(), area_type.label())
}

/// 服務目錄中的旅行模式；`raw` 保留原始 JSON 以便原樣送回求解服務
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelMode {
    pub name: String,
    pub id: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelDirection {
    AwayFromOrigin,
    TowardOrigin,
}

impl TravelDirection {
    pub fn as_wire(&self) -> &'static str {
        match self {
            TravelDirection::AwayFromOrigin => "from-facility",
            TravelDirection::TowardOrigin => "to-facility",
        }
    }

    /// REST API 使用的列舉值
    pub fn as_rest_enum(&self) -> &'static str {
        match self {
            TravelDirection::AwayFromOrigin => "esriNATravelDirectionFromFacility",
            TravelDirection::TowardOrigin => "esriNATravelDirectionToFacility",
        }
    }
}

impl FromStr for TravelDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "from location" | "from-facility" | "from" => Ok(TravelDirection::AwayFromOrigin),
            "to location" | "to-facility" | "to" => Ok(TravelDirection::TowardOrigin),
            other => Err(AppError::invalid_input(
                "direction",
                format!("'{}' is not a travel direction", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    value: f64,
    pub area_type: AreaType,
}

impl Budget {
    pub fn new(value: f64, area_type: AreaType) -> Result<Self> {
        let value = validate_budget(value)?;
        Ok(Self { value, area_type })
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// 嚴格遞增、最後一個元素等於預算的 break 序列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakSequence(Vec<f64>);

impl BreakSequence {
    pub(crate) fn from_values(values: Vec<f64>) -> Self {
        debug_assert!(values.windows(2).all(|w| w[0] < w[1]));
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.0.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

/// 求解結果中的一個多邊形，外環與內環皆為 [經度, 緯度] 座標
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAreaPolygon {
    pub rings: Vec<Vec<[f64; 2]>>,
    pub attributes: serde_json::Map<String, serde_json::Value>,
    pub break_value: Option<f64>,
}

impl ServiceAreaPolygon {
    pub fn tagged(mut self, break_value: f64) -> Self {
        self.break_value = Some(break_value);
        self.attributes
            .insert("break_value".to_string(), serde_json::json!(break_value));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillPattern {
    #[default]
    Solid,
    BackwardDiagonal,
    ForwardDiagonal,
    Cross,
    DiagonalCross,
    Horizontal,
    Vertical,
    None,
}

impl FillPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillPattern::Solid => "solid",
            FillPattern::BackwardDiagonal => "backward-diagonal",
            FillPattern::ForwardDiagonal => "forward-diagonal",
            FillPattern::Cross => "cross",
            FillPattern::DiagonalCross => "diagonal-cross",
            FillPattern::Horizontal => "horizontal",
            FillPattern::Vertical => "vertical",
            FillPattern::None => "none",
        }
    }
}

impl FromStr for FillPattern {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let pattern = match s.trim().to_ascii_lowercase().as_str() {
            "solid" => FillPattern::Solid,
            "backward-diagonal" => FillPattern::BackwardDiagonal,
            "forward-diagonal" => FillPattern::ForwardDiagonal,
            "cross" => FillPattern::Cross,
            "diagonal-cross" => FillPattern::DiagonalCross,
            "horizontal" => FillPattern::Horizontal,
            "vertical" => FillPattern::Vertical,
            "none" => FillPattern::None,
            other => {
                return Err(AppError::invalid_input(
                    "style",
                    format!("unknown fill pattern '{}'", other),
                ))
            }
        };
        Ok(pattern)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outline {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillSymbol {
    pub pattern: FillPattern,
    pub color: String,
    pub outline: Outline,
}

impl FillSymbol {
    pub fn overlay(pattern: FillPattern) -> Self {
        Self {
            pattern,
            color: "rgba(255, 0, 0, 0.1)".to_string(),
            outline: Outline {
                color: "black".to_string(),
                width: 1.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSymbol {
    pub color: String,
    pub size: f64,
}

impl Default for MarkerSymbol {
    fn default() -> Self {
        Self {
            color: "white".to_string(),
            size: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCategory {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub distance_m: Option<f64>,
    pub categories: Vec<PlaceCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceMarker {
    pub point: GeoPoint,
    pub title: String,
    pub popup: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geo_point() {
        let p: GeoPoint = "-117.133163, 34.022445".parse().unwrap();
        assert_eq!(p.longitude, -117.133163);
        assert_eq!(p.latitude, 34.022445);
        assert!("15".parse::<GeoPoint>().is_err());
        assert!("200,10".parse::<GeoPoint>().is_err());
    }

    #[test]
    fn test_travel_mode_name_from_form() {
        assert_eq!(travel_mode_name("Driving", AreaType::Time), "Driving Time");
        assert_eq!(
            travel_mode_name("Walking ", AreaType::Distance),
            "Walking Distance"
        );
    }

    #[test]
    fn test_direction_from_form_labels() {
        assert_eq!(
            "From Location".parse::<TravelDirection>().unwrap(),
            TravelDirection::AwayFromOrigin
        );
        assert_eq!(
            "To Location".parse::<TravelDirection>().unwrap(),
            TravelDirection::TowardOrigin
        );
        assert_eq!(TravelDirection::TowardOrigin.as_wire(), "to-facility");
        assert!("sideways".parse::<TravelDirection>().is_err());
    }

    #[test]
    fn test_budget_rejects_negative_and_nan() {
        assert!(Budget::new(-5.0, AreaType::Time).is_err());
        assert!(Budget::new(f64::NAN, AreaType::Distance).is_err());
        assert_eq!(Budget::new(0.0, AreaType::Time).unwrap().value(), 0.0);
    }

    #[test]
    fn test_tagged_polygon_carries_break_value() {
        let polygon = ServiceAreaPolygon {
            rings: vec![],
            attributes: serde_json::Map::new(),
            break_value: None,
        }
        .tagged(30.0);
        assert_eq!(polygon.break_value, Some(30.0));
        assert_eq!(polygon.attributes["break_value"], serde_json::json!(30.0));
    }

    #[test]
    fn test_fill_pattern_round_trips_dropdown_values() {
        assert_eq!(
            "diagonal-cross".parse::<FillPattern>().unwrap(),
            FillPattern::DiagonalCross
        );
        assert_eq!(FillPattern::default().as_str(), "solid");
        assert!("dotted".parse::<FillPattern>().is_err());
    }
}
