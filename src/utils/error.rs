use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Travel mode '{name}' is not in the service catalog")]
    UnknownTravelMode { name: String, available: Vec<String> },

    #[error("Travel mode catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    #[error("Service area solve failed for break {break_value}: {message}")]
    Solve { break_value: f64, message: String },

    #[error("Network unavailable: {message}")]
    NetworkUnavailable { message: String },

    #[error("Operation '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    Config { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Catalog,
    Solver,
    Network,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config(field: &str, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::InvalidInput { .. } => ErrorCategory::Input,
            AppError::UnknownTravelMode { .. } | AppError::CatalogUnavailable { .. } => {
                ErrorCategory::Catalog
            }
            AppError::Solve { .. } | AppError::Timeout { .. } => ErrorCategory::Solver,
            AppError::NetworkUnavailable { .. } | AppError::Http(_) => ErrorCategory::Network,
            AppError::Config { .. } => ErrorCategory::Configuration,
            AppError::Io(_) | AppError::Serialization(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 定位失敗時會退回預設座標，不影響地圖
            AppError::NetworkUnavailable { .. } => ErrorSeverity::Low,
            AppError::Solve { .. } | AppError::Timeout { .. } | AppError::Http(_) => {
                ErrorSeverity::Medium
            }
            AppError::InvalidInput { .. }
            | AppError::UnknownTravelMode { .. }
            | AppError::CatalogUnavailable { .. }
            | AppError::Config { .. } => ErrorSeverity::High,
            AppError::Io(_) | AppError::Serialization(_) => ErrorSeverity::Critical,
        }
    }

    /// 只影響單一 break 的錯誤，不會中止整個計算週期
    pub fn is_break_local(&self) -> bool {
        matches!(self, AppError::Solve { .. } | AppError::Timeout { .. })
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::InvalidInput { field, reason } => {
                format!("The value entered for {} is not usable: {}", field, reason)
            }
            AppError::UnknownTravelMode { name, .. } => {
                format!("The service does not offer a travel mode called '{}'", name)
            }
            AppError::CatalogUnavailable { .. } => {
                "Could not load the list of travel modes from the routing service".to_string()
            }
            AppError::Solve { break_value, .. } => {
                format!("The service area for {} could not be calculated", break_value)
            }
            AppError::NetworkUnavailable { .. } => {
                "Location lookup failed, using the default map center".to_string()
            }
            AppError::Timeout { operation, .. } => {
                format!("The routing service took too long to answer ({})", operation)
            }
            AppError::Http(_) => "The routing service could not be reached".to_string(),
            AppError::Io(e) => format!("File access failed: {}", e),
            AppError::Serialization(_) => "Unexpected response format".to_string(),
            AppError::Config { field, message } => {
                format!("Configuration problem with {}: {}", field, message)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            AppError::InvalidInput { .. } => {
                "Enter a non-negative number for the distance/time budget".to_string()
            }
            AppError::UnknownTravelMode { available, .. } => {
                if available.is_empty() {
                    "Check the service URL; the catalog returned no travel modes".to_string()
                } else {
                    format!("Pick one of: {}", available.join(", "))
                }
            }
            AppError::CatalogUnavailable { .. } | AppError::Http(_) => {
                "Check the network connection and that the API key is valid".to_string()
            }
            AppError::Solve { .. } => {
                "Try a smaller break value or a different travel mode".to_string()
            }
            AppError::Timeout { .. } => {
                "Increase solve.timeout_seconds or retry later".to_string()
            }
            AppError::NetworkUnavailable { .. } => {
                "Pass an explicit --at LON,LAT to skip geolocation".to_string()
            }
            AppError::Config { .. } => "Review the TOML configuration file".to_string(),
            AppError::Io(_) => "Check that the output directory is writable".to_string(),
            AppError::Serialization(_) => {
                "Verify the service URL points at a network analysis service".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_local_errors() {
        let solve = AppError::Solve {
            break_value: 15.0,
            message: "no network".to_string(),
        };
        assert!(solve.is_break_local());
        assert_eq!(solve.category(), ErrorCategory::Solver);

        let unknown = AppError::UnknownTravelMode {
            name: "Flying Time".to_string(),
            available: vec![],
        };
        assert!(!unknown.is_break_local());
        assert_eq!(unknown.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_recovery_lists_available_modes() {
        let err = AppError::UnknownTravelMode {
            name: "Flying Time".to_string(),
            available: vec!["Driving Time".to_string(), "Walking Time".to_string()],
        };
        assert_eq!(
            err.recovery_suggestion(),
            "Pick one of: Driving Time, Walking Time"
        );
    }

    #[test]
    fn test_geolocation_failure_is_low_severity() {
        let err = AppError::NetworkUnavailable {
            message: "denied".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.category(), ErrorCategory::Network);
    }
}
