use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RUST_LOG 優先，否則使用給定的預設過濾規則
fn env_or(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives))
}

pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        env_or("service_area_map=debug,info")
    } else {
        env_or("service_area_map=info,warn")
    };

    // CLI 輸出給人看：精簡格式、不印 target
    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .compact();

    tracing_subscriber::registry().with(filter).with(layer).init();
}

pub fn init_server_logger() {
    let filter = env_or("service_area_map=info,server=info,tower_http=info");

    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .json()
        .with_current_span(true);

    tracing_subscriber::registry().with(filter).with(layer).init();
}
