use crate::utils::error::{AppError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(AppError::config(field_name, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AppError::config(
                field_name,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(AppError::config(
            field_name,
            format!("Invalid URL format ({}): {}", url_str, e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AppError::config(field_name, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(AppError::config(field_name, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(AppError::config(
            field_name,
            format!("Value {} must be at least {}", value, min_value),
        ));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::config(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AppError::config(
            field_name,
            format!("Value {} must be between {} and {}", value, min, max),
        ));
    }
    Ok(())
}

/// 驗證使用者輸入的距離/時間預算：必須是有限且非負的數字
pub fn validate_budget(value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(AppError::invalid_input("budget", "must be a finite number"));
    }
    if value < 0.0 {
        return Err(AppError::invalid_input(
            "budget",
            format!("{} is negative", value),
        ));
    }
    Ok(value)
}

/// 驗證經緯度範圍 (WGS84)
pub fn validate_coordinates(longitude: f64, latitude: f64) -> Result<()> {
    if !(-180.0..=180.0).contains(&longitude) || !longitude.is_finite() {
        return Err(AppError::invalid_input(
            "longitude",
            format!("{} is outside -180..180", longitude),
        ));
    }
    if !(-90.0..=90.0).contains(&latitude) || !latitude.is_finite() {
        return Err(AppError::invalid_input(
            "latitude",
            format!("{} is outside -90..90", latitude),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("service.service_area_url", "https://example.com").is_ok());
        assert!(validate_url("service.service_area_url", "http://example.com").is_ok());
        assert!(validate_url("service.service_area_url", "").is_err());
        assert!(validate_url("service.service_area_url", "invalid-url").is_err());
        assert!(validate_url("service.service_area_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_budget() {
        assert_eq!(validate_budget(47.0).unwrap(), 47.0);
        assert_eq!(validate_budget(0.0).unwrap(), 0.0);
        assert!(validate_budget(-1.0).is_err());
        assert!(validate_budget(f64::NAN).is_err());
        assert!(validate_budget(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(-117.133163, 34.022445).is_ok());
        assert!(validate_coordinates(181.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, -91.0).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("map.default_zoom", 10u8, 0, 23).is_ok());
        assert!(validate_range("map.default_zoom", 30u8, 0, 23).is_err());
    }
}
