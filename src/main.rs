use clap::Parser;
use geojson::FeatureCollection;
use service_area_map::adapters::arcgis::ArcGisSolver;
use service_area_map::adapters::credentials::{EnvCredential, HttpCredential, StaticCredential};
use service_area_map::adapters::geojson::{GeoJsonCanvas, LoggingBusyIndicator};
use service_area_map::adapters::geolocation::HttpGeolocator;
use service_area_map::adapters::places::ArcGisPlaces;
use service_area_map::config::cli::{Command, FormArgs};
use service_area_map::core::breaks::decompose;
use service_area_map::core::places::show_nearby_places;
use service_area_map::core::session::initial_center;
use service_area_map::domain::model::{AreaType, Budget, GeoPoint};
use service_area_map::domain::ports::{CredentialProvider, Geolocator, Storage};
use service_area_map::utils::error::ErrorSeverity;
use service_area_map::utils::{logger, validation::Validate};
use service_area_map::{
    AppConfig, AppError, CliConfig, CycleController, CycleReport, LocalStorage,
    ServiceAreaSession,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting service-area CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.load_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let outcome = match &cli.command {
        Command::Breaks { budget, increment } => {
            print_breaks(*budget, *increment, config.solve.max_breaks)
        }
        Command::Solve { at, form } => run_solve(&cli, &config, at, form).await,
        Command::Places {
            at,
            radius,
            category,
        } => run_places(&cli, &config, *at, *radius, category.as_deref()).await,
    };

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn print_breaks(budget: f64, increment: bool, max_breaks: usize) -> service_area_map::Result<()> {
    // 單位只影響顯示，這裡不區分
    let budget = Budget::new(budget, AreaType::Time)?;
    let breaks = decompose(&budget, increment, max_breaks)?;
    let values: Vec<String> = breaks.iter().map(|b| b.to_string()).collect();
    println!("[{}]", values.join(", "));
    Ok(())
}

/// 依設定決定金鑰來源：後端 /api-key > 設定檔 > 環境變數
async fn resolve_api_key(config: &AppConfig) -> service_area_map::Result<String> {
    let provider: Box<dyn CredentialProvider> = match (&config.service.key_endpoint, config.api_key()) {
        (Some(endpoint), _) => Box::new(HttpCredential::new(endpoint.clone())),
        (None, Some(key)) => Box::new(StaticCredential::new(key)),
        (None, None) => Box::new(EnvCredential::default()),
    };
    provider.credential().await
}

async fn starting_center(config: &AppConfig) -> service_area_map::Result<GeoPoint> {
    let fallback = config.default_center()?;
    let geolocator = match &config.map.geolocation_url {
        Some(url) => Some(HttpGeolocator::new(
            url.clone(),
            Duration::from_secs(config.map.geolocation_timeout_seconds),
        )?),
        None => None,
    };
    Ok(initial_center(geolocator.as_ref().map(|g| g as &dyn Geolocator), fallback).await)
}

async fn save_collection(
    storage: &LocalStorage,
    name: &str,
    collection: &FeatureCollection,
) -> service_area_map::Result<()> {
    let data = serde_json::to_vec_pretty(collection)?;
    storage.write_file(name, &data).await?;
    tracing::info!("📁 Output saved to: {}", storage.full_path(name).display());
    Ok(())
}

fn print_report(report: &CycleReport, unit: &str) {
    println!(
        "Cycle {} ({}) finished in {:?}",
        report.cycle_id, report.travel_mode, report.elapsed
    );
    for outcome in &report.breaks {
        match &outcome.result {
            Ok(count) => println!("  ✅ {} {}: {} polygon(s)", outcome.break_value, unit, count),
            Err(e) => println!("  ❌ {} {}: {}", outcome.break_value, unit, e),
        }
    }
}

async fn run_solve(
    cli: &CliConfig,
    config: &AppConfig,
    clicks: &[GeoPoint],
    form_args: &FormArgs,
) -> service_area_map::Result<()> {
    let form = form_args.apply(config.defaults.to_form()?);
    let key = resolve_api_key(config).await?;

    let center = match clicks.first() {
        Some(point) => *point,
        None => starting_center(config).await?,
    };

    let canvas = Arc::new(
        GeoJsonCanvas::new(center).with_view(config.map.basemap.clone(), config.map.default_zoom),
    );
    let controller = CycleController::new(
        Arc::new(ArcGisSolver::new(key)),
        canvas.clone(),
        Arc::new(LoggingBusyIndicator::default()),
        config.controller_settings(),
    );
    let session = ServiceAreaSession::new(Arc::new(controller));
    let storage = LocalStorage::new(cli.output.clone());
    let unit = form.area_type.unit();

    if clicks.is_empty() {
        let report = session.on_submit(&form).await?;
        print_report(&report, unit);
        save_collection(&storage, "service_area.geojson", &canvas.to_feature_collection()).await?;
        return Ok(());
    }

    let mut snapshots = Vec::new();
    let outcomes = session
        .click_each(clicks, &form, |index, outcome| match outcome {
            Ok(report) => {
                print_report(report, unit);
                snapshots.push((index, canvas.to_feature_collection()));
            }
            Err(e) => println!("Cycle at {} failed: {}", clicks[index], e),
        })
        .await;

    for (index, collection) in &snapshots {
        let name = if clicks.len() == 1 {
            "service_area.geojson".to_string()
        } else {
            format!("service_area_{}.geojson", index + 1)
        };
        save_collection(&storage, &name, collection).await?;
    }

    let failures: Vec<AppError> = outcomes.into_iter().filter_map(|o| o.err()).collect();
    if failures.is_empty() {
        return Ok(());
    }

    tracing::warn!("⚠️ {} of {} click(s) failed", failures.len(), clicks.len());
    // 以最嚴重的錯誤決定結束代碼
    let worst = failures.into_iter().max_by_key(|e| e.severity());
    worst.map_or(Ok(()), Err)
}

async fn run_places(
    cli: &CliConfig,
    config: &AppConfig,
    at: Option<GeoPoint>,
    radius: Option<f64>,
    category: Option<&str>,
) -> service_area_map::Result<()> {
    let key = resolve_api_key(config).await?;
    let point = match at {
        Some(point) => point,
        None => starting_center(config).await?,
    };

    let search = ArcGisPlaces::new(config.places.url.clone(), key)
        .with_page_size(config.places.page_size);
    let canvas =
        GeoJsonCanvas::new(point).with_view(config.map.basemap.clone(), config.map.default_zoom);
    let radius = radius.unwrap_or(config.places.radius_m);

    let count = show_nearby_places(&search, &canvas, point, radius, category).await?;
    if count == 0 {
        tracing::warn!("⚠️ No places found within {} m of {}", radius, point);
    }

    println!("Found {} place(s) near {}", count, point);
    let storage = LocalStorage::new(cli.output.clone());
    save_collection(&storage, "places.geojson", &canvas.to_feature_collection()).await
}
