use httpmock::prelude::*;
use serde_json::json;
use service_area_map::adapters::geojson::LoggingBusyIndicator;
use service_area_map::core::controller::ControllerSettings;
use service_area_map::domain::model::{AreaType, FillPattern, GeoPoint, TravelDirection};
use service_area_map::domain::ports::Storage;
use service_area_map::{
    AppError, ArcGisSolver, CycleController, FormState, GeoJsonCanvas, LocalStorage,
    ServiceAreaSession,
};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

const TOKEN: &str = "test-key";

fn catalog_body() -> serde_json::Value {
    json!({
        "currentVersion": 11.1,
        "supportedTravelModes": [
            { "name": "Driving Time", "id": "FEgifRtFndKNcJMJ", "type": "AUTOMOBILE" },
            { "name": "Driving Distance", "id": "iKjmHuBSIqdEfOVr", "type": "AUTOMOBILE" },
            { "name": "Walking Time", "id": "caFAgoThrvUpkFBW", "type": "WALK" }
        ]
    })
}

fn polygon_body(to_break: f64) -> serde_json::Value {
    json!({
        "saPolygons": {
            "geometryType": "esriGeometryPolygon",
            "features": [{
                "attributes": { "FromBreak": 0, "ToBreak": to_break },
                "geometry": {
                    "rings": [[[15.0, 65.0], [15.1, 65.0], [15.1, 65.1], [15.0, 65.0]]]
                }
            }]
        }
    })
}

fn mock_catalog(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/ServiceArea")
            .query_param("f", "json")
            .query_param("token", TOKEN);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(catalog_body());
    })
}

fn mock_break<'a>(server: &'a MockServer, value: &str, body: serde_json::Value) -> httpmock::Mock<'a> {
    let value = value.to_string();
    server.mock(move |when, then| {
        when.method(POST)
            .path("/ServiceArea/solveServiceArea")
            .x_www_form_urlencoded_tuple("defaultBreaks", &value)
            .x_www_form_urlencoded_tuple("token", TOKEN);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(body);
    })
}

fn session_for(server: &MockServer, origin: GeoPoint) -> (ServiceAreaSession, Arc<GeoJsonCanvas>) {
    let canvas = Arc::new(GeoJsonCanvas::new(origin));
    let controller = CycleController::new(
        Arc::new(ArcGisSolver::new(TOKEN)),
        canvas.clone(),
        Arc::new(LoggingBusyIndicator::default()),
        ControllerSettings::new(server.url("/ServiceArea")),
    );
    (ServiceAreaSession::new(Arc::new(controller)), canvas)
}

fn form(budget: f64, increment: bool) -> FormState {
    FormState {
        budget,
        area_type: AreaType::Time,
        travel_mode: "Driving".to_string(),
        direction: TravelDirection::AwayFromOrigin,
        increment_enabled: increment,
        fill_pattern: FillPattern::DiagonalCross,
    }
}

fn origin() -> GeoPoint {
    GeoPoint {
        longitude: 15.0,
        latitude: 65.0,
    }
}

#[tokio::test]
async fn test_incremental_cycle_renders_every_break_in_order() {
    let server = MockServer::start();
    let catalog = mock_catalog(&server);
    let mocks = [
        mock_break(&server, "15", polygon_body(15.0)),
        mock_break(&server, "30", polygon_body(30.0)),
        mock_break(&server, "45", polygon_body(45.0)),
        mock_break(&server, "47", polygon_body(47.0)),
    ];

    let (session, canvas) = session_for(&server, origin());
    let report = assert_ok!(session.on_click(origin(), &form(47.0, true)).await);

    catalog.assert();
    for mock in &mocks {
        mock.assert();
    }

    assert_eq!(report.travel_mode, "Driving Time");
    let values: Vec<f64> = report.breaks.iter().map(|b| b.break_value).collect();
    assert_eq!(values, vec![15.0, 30.0, 45.0, 47.0]);
    assert_eq!(report.polygon_count(), 4);

    let features = canvas.features();
    assert_eq!(features.len(), 5);
    assert_eq!(features[0].property("kind"), Some(&json!("origin")));
    let drawn: Vec<f64> = features[1..]
        .iter()
        .map(|f| f.property("break_value").and_then(|v| v.as_f64()).unwrap())
        .collect();
    assert_eq!(drawn, vec![15.0, 30.0, 45.0, 47.0]);
    assert_eq!(features[1].property("ToBreak"), Some(&json!(15.0)));
    assert_eq!(
        features[1].property("fill-pattern"),
        Some(&json!("diagonal-cross"))
    );
}

#[tokio::test]
async fn test_failed_break_does_not_stop_later_breaks() {
    let server = MockServer::start();
    mock_catalog(&server);
    mock_break(&server, "15", polygon_body(15.0));
    mock_break(
        &server,
        "30",
        json!({ "error": { "code": 400, "message": "Unable to complete operation.", "details": [] } }),
    );
    let last = mock_break(&server, "32", polygon_body(32.0));

    let (session, canvas) = session_for(&server, origin());
    let report = assert_ok!(session.on_click(origin(), &form(32.0, true)).await);

    last.assert();
    assert_eq!(report.breaks.len(), 3);
    assert_eq!(report.rendered().count(), 2);

    let failed: Vec<&_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].break_value, 30.0);
    match &failed[0].result {
        Err(AppError::Solve { break_value, message }) => {
            assert_eq!(*break_value, 30.0);
            assert!(message.contains("Unable to complete operation."));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    // 起點 + 兩個成功的 break
    assert_eq!(canvas.len(), 3);
}

#[tokio::test]
async fn test_unknown_travel_mode_aborts_before_solving() {
    let server = MockServer::start();
    mock_catalog(&server);
    let solve = server.mock(|when, then| {
        when.method(POST).path("/ServiceArea/solveServiceArea");
        then.status(200).json_body(polygon_body(15.0));
    });

    let (session, canvas) = session_for(&server, origin());
    let mut walking = form(15.0, false);
    walking.travel_mode = "Walking".to_string();
    walking.area_type = AreaType::Distance;

    let err = assert_err!(session.on_click(origin(), &walking).await);

    solve.assert_hits(0);
    match err {
        AppError::UnknownTravelMode { name, available } => {
            assert_eq!(name, "Walking Distance");
            assert!(available.contains(&"Walking Time".to_string()));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // 點擊仍然會留下起點標記
    assert_eq!(canvas.len(), 1);
}

#[tokio::test]
async fn test_negative_budget_makes_no_requests() {
    let server = MockServer::start();
    let catalog = mock_catalog(&server);

    let (session, canvas) = session_for(&server, origin());
    let err = assert_err!(session.on_click(origin(), &form(-5.0, false)).await);

    assert!(matches!(err, AppError::InvalidInput { .. }));
    catalog.assert_hits(0);
    // 無效的預算不會清除或重畫地圖
    assert!(canvas.is_empty());
}

#[tokio::test]
async fn test_submit_uses_last_click_and_output_is_saved() {
    let server = MockServer::start();
    mock_catalog(&server);
    mock_break(&server, "10", polygon_body(10.0));

    let clicked = GeoPoint {
        longitude: 18.06,
        latitude: 59.33,
    };
    let (session, canvas) = session_for(&server, origin());
    assert_ok!(session.on_click(clicked, &form(10.0, false)).await);
    let report = assert_ok!(session.on_submit(&form(10.0, false)).await);

    assert_eq!(report.polygon_count(), 1);
    // 送出會重畫：起點 + 一個多邊形
    assert_eq!(canvas.len(), 2);
    assert_eq!(session.last_clicked().await, Some(clicked));

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path());
    let data = serde_json::to_vec_pretty(&canvas.to_feature_collection()).unwrap();
    assert_ok!(storage.write_file("service_area.geojson", &data).await);

    let saved = storage.read_file("service_area.geojson").await.unwrap();
    let collection: serde_json::Value = serde_json::from_slice(&saved).unwrap();
    assert_eq!(collection["type"], "FeatureCollection");
    assert_eq!(collection["features"][0]["geometry"]["coordinates"][0], 18.06);
}
