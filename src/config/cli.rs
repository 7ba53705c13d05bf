use crate::config::toml_config::AppConfig;
use crate::core::session::FormState;
use crate::domain::model::{AreaType, FillPattern, GeoPoint, TravelDirection};
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "service-area")]
#[command(about = "Compute and render service areas (isochrones) around map points")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Fetch the API key from a running backend's /api-key endpoint
    #[arg(long, global = true)]
    pub key_endpoint: Option<String>,

    /// Output directory for rendered GeoJSON
    #[arg(short, long, global = true, default_value = "./output")]
    pub output: String,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Solve service areas around one or more clicked points
    Solve {
        /// Clicked location as LON,LAT (repeatable; each starts a new cycle)
        #[arg(long = "at", value_parser = parse_point)]
        at: Vec<GeoPoint>,

        #[command(flatten)]
        form: FormArgs,
    },
    /// Print the break sequence for a budget without calling the service
    Breaks {
        #[arg(long, allow_negative_numbers = true)]
        budget: f64,

        #[arg(long)]
        increment: bool,
    },
    /// Search nearby places and render them as markers
    Places {
        #[arg(long = "at", value_parser = parse_point)]
        at: Option<GeoPoint>,

        /// Search radius in meters
        #[arg(long)]
        radius: Option<f64>,

        /// Places category id, e.g. 13032 for cafes
        #[arg(long)]
        category: Option<String>,
    },
}

/// 覆寫設定檔中的表單預設值
#[derive(Debug, Clone, Default, Args)]
pub struct FormArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub budget: Option<f64>,

    #[arg(long, value_parser = parse_area_type)]
    pub area_type: Option<AreaType>,

    /// Travel mode prefix, e.g. Driving, Walking, Trucking
    #[arg(long)]
    pub mode: Option<String>,

    /// "From Location" or "To Location"
    #[arg(long, value_parser = parse_direction)]
    pub direction: Option<TravelDirection>,

    /// Split the budget into 15-unit increments
    #[arg(long)]
    pub increment: bool,

    #[arg(long, value_parser = parse_style)]
    pub style: Option<FillPattern>,
}

impl FormArgs {
    pub fn apply(&self, mut form: FormState) -> FormState {
        if let Some(budget) = self.budget {
            form.budget = budget;
        }
        if let Some(area_type) = self.area_type {
            form.area_type = area_type;
        }
        if let Some(mode) = &self.mode {
            form.travel_mode = mode.clone();
        }
        if let Some(direction) = self.direction {
            form.direction = direction;
        }
        if self.increment {
            form.increment_enabled = true;
        }
        if let Some(style) = self.style {
            form.fill_pattern = style;
        }
        form
    }
}

impl CliConfig {
    /// 載入設定檔 (若有指定) 並套用命令列覆寫
    pub fn load_app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(endpoint) = &self.key_endpoint {
            config.service.key_endpoint = Some(endpoint.clone());
        }

        Ok(config)
    }
}

fn parse_point(s: &str) -> std::result::Result<GeoPoint, String> {
    s.parse().map_err(|e: crate::utils::error::AppError| e.to_string())
}

fn parse_area_type(s: &str) -> std::result::Result<AreaType, String> {
    s.parse().map_err(|e: crate::utils::error::AppError| e.to_string())
}

fn parse_direction(s: &str) -> std::result::Result<TravelDirection, String> {
    s.parse().map_err(|e: crate::utils::error::AppError| e.to_string())
}

fn parse_style(s: &str) -> std::result::Result<FillPattern, String> {
    s.parse().map_err(|e: crate::utils::error::AppError| e.to_string())
}
