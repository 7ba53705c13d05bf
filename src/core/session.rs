use crate::core::controller::{CycleController, CycleReport, CycleRequest};
use crate::domain::model::{
    travel_mode_name, AreaType, FillPattern, GeoPoint, MarkerSymbol, Origin, TravelDirection,
};
use crate::domain::ports::Geolocator;
use crate::utils::error::{AppError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// 找不到使用者位置時的預設中心 (經度 15, 緯度 65)
pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    longitude: 15.0,
    latitude: 65.0,
};

/// 表單目前的內容
#[derive(Debug, Clone)]
pub struct FormState {
    pub budget: f64,
    pub area_type: AreaType,
    /// 例如 "Driving"、"Walking"，會與 area_type 組成目錄名稱
    pub travel_mode: String,
    pub direction: TravelDirection,
    pub increment_enabled: bool,
    pub fill_pattern: FillPattern,
}

impl FormState {
    pub fn to_request(&self, origin: Origin) -> CycleRequest {
        CycleRequest {
            origin,
            budget: self.budget,
            area_type: self.area_type,
            travel_mode_name: travel_mode_name(&self.travel_mode, self.area_type),
            direction: self.direction,
            increment_enabled: self.increment_enabled,
            fill_pattern: self.fill_pattern,
        }
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            budget: 15.0,
            area_type: AreaType::Time,
            travel_mode: "Driving".to_string(),
            direction: TravelDirection::AwayFromOrigin,
            increment_enabled: false,
            fill_pattern: FillPattern::Solid,
        }
    }
}

/// 地圖互動的會話：記住最後點擊的位置，並把點擊轉換成計算週期
pub struct ServiceAreaSession {
    controller: Arc<CycleController>,
    last_clicked: Mutex<Option<GeoPoint>>,
}

impl ServiceAreaSession {
    pub fn new(controller: Arc<CycleController>) -> Self {
        Self {
            controller,
            last_clicked: Mutex::new(None),
        }
    }

    pub async fn last_clicked(&self) -> Option<GeoPoint> {
        *self.last_clicked.lock().await
    }

    /// 點擊地圖：清除舊圖形、標記起點、計算服務範圍
    pub async fn on_click(&self, point: GeoPoint, form: &FormState) -> Result<CycleReport> {
        *self.last_clicked.lock().await = Some(point);
        self.create_service_areas(point, form).await
    }

    /// 按下送出：使用最後點擊的位置，沒有的話使用地圖中心
    pub async fn on_submit(&self, form: &FormState) -> Result<CycleReport> {
        let point = match self.last_clicked().await {
            Some(point) => point,
            None => self.controller.surface().current_center(),
        };
        self.create_service_areas(point, form).await
    }

    /// 依序處理點擊事件；單一週期失敗只記錄，不會停止後續點擊
    pub async fn drive(
        &self,
        mut clicks: mpsc::Receiver<GeoPoint>,
        form: &FormState,
    ) -> Vec<Result<CycleReport>> {
        let mut reports = Vec::new();
        while let Some(point) = clicks.recv().await {
            reports.push(self.click_and_log(point, form).await);
        }
        reports
    }

    /// 依序點擊多個位置，失敗的週期同樣不會中斷後面的點擊。
    /// 每個週期結束後 (地圖仍是該次結果時) 呼叫 `after_each`。
    pub async fn click_each<F>(
        &self,
        points: &[GeoPoint],
        form: &FormState,
        mut after_each: F,
    ) -> Vec<Result<CycleReport>>
    where
        F: FnMut(usize, &Result<CycleReport>),
    {
        let mut reports = Vec::with_capacity(points.len());
        for (index, point) in points.iter().enumerate() {
            let outcome = self.click_and_log(*point, form).await;
            after_each(index, &outcome);
            reports.push(outcome);
        }
        reports
    }

    async fn click_and_log(&self, point: GeoPoint, form: &FormState) -> Result<CycleReport> {
        let outcome = self.on_click(point, form).await;
        if let Err(e) = &outcome {
            tracing::error!("❌ Cycle at {} failed: {}", point, e);
        }
        outcome
    }

    async fn create_service_areas(&self, point: GeoPoint, form: &FormState) -> Result<CycleReport> {
        self.controller
            .run_fresh_cycle(&form.to_request(Origin::new(point)), &MarkerSymbol::default())
            .await
    }
}

/// 取得初始地圖中心；定位失敗一律退回預設座標
pub async fn initial_center(geolocator: Option<&dyn Geolocator>, fallback: GeoPoint) -> GeoPoint {
    let Some(geolocator) = geolocator else {
        tracing::info!("Geolocation is not configured, using default center {}", fallback);
        return fallback;
    };

    match geolocator.locate().await {
        Ok(point) => {
            tracing::info!("📍 Located client at {}", point);
            point
        }
        Err(e) => {
            let e = match e {
                AppError::NetworkUnavailable { .. } => e,
                other => AppError::NetworkUnavailable {
                    message: other.to_string(),
                },
            };
            tracing::warn!("⚠️ Error getting user location: {}", e);
            tracing::info!("💡 {}", e.recovery_suggestion());
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::{ControllerSettings, CycleState};
    use crate::domain::model::{FillSymbol, PlaceMarker, ServiceAreaPolygon, TravelMode};
    use crate::domain::ports::{BusyIndicator, MapSurface, SolveRequest, Solver};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Draw {
        Clear,
        Point(GeoPoint),
        Polygons(f64),
    }

    #[derive(Default)]
    struct MockSurface {
        draws: StdMutex<Vec<Draw>>,
    }

    impl MapSurface for MockSurface {
        fn draw_point(&self, point: GeoPoint, symbol: &MarkerSymbol) {
            assert_eq!(symbol.color, "white");
            self.draws.lock().unwrap().push(Draw::Point(point));
        }

        fn draw_polygons(&self, polygons: &[ServiceAreaPolygon], _symbol: &FillSymbol) {
            for p in polygons {
                self.draws
                    .lock()
                    .unwrap()
                    .push(Draw::Polygons(p.break_value.unwrap_or(-1.0)));
            }
        }

        fn draw_places(&self, _markers: &[PlaceMarker]) {}

        fn clear_all(&self) {
            self.draws.lock().unwrap().push(Draw::Clear);
        }

        fn current_center(&self) -> GeoPoint {
            GeoPoint {
                longitude: -117.133163,
                latitude: 34.022445,
            }
        }
    }

    struct EchoSolver {
        origins: StdMutex<Vec<GeoPoint>>,
        modes_requested: StdMutex<Vec<String>>,
        delay: Option<std::time::Duration>,
    }

    impl EchoSolver {
        fn new() -> Self {
            Self {
                origins: StdMutex::new(Vec::new()),
                modes_requested: StdMutex::new(Vec::new()),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl Solver for EchoSolver {
        async fn fetch_travel_modes(&self, _service_url: &str) -> Result<Vec<TravelMode>> {
            Ok(vec![TravelMode {
                name: "Walking Distance".to_string(),
                id: Some("walk".to_string()),
                raw: serde_json::json!({}),
            }])
        }

        async fn solve(
            &self,
            _service_url: &str,
            request: &SolveRequest,
        ) -> Result<Vec<ServiceAreaPolygon>> {
            self.origins.lock().unwrap().push(request.origin.point);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.modes_requested
                .lock()
                .unwrap()
                .push(request.travel_mode.name.clone());
            Ok(vec![ServiceAreaPolygon {
                rings: vec![],
                attributes: serde_json::Map::new(),
                break_value: None,
            }])
        }
    }

    struct NoopBusy;

    impl BusyIndicator for NoopBusy {
        fn transition(&self, _state: &CycleState) {}
    }

    fn session() -> (ServiceAreaSession, Arc<MockSurface>, Arc<EchoSolver>) {
        session_with(EchoSolver::new())
    }

    fn session_with(solver: EchoSolver) -> (ServiceAreaSession, Arc<MockSurface>, Arc<EchoSolver>) {
        let surface = Arc::new(MockSurface::default());
        let solver = Arc::new(solver);
        let controller = CycleController::new(
            solver.clone(),
            surface.clone(),
            Arc::new(NoopBusy),
            ControllerSettings::new("https://solver.test/ServiceArea"),
        );
        (ServiceAreaSession::new(Arc::new(controller)), surface, solver)
    }

    fn walking_form() -> FormState {
        FormState {
            budget: 2.0,
            area_type: AreaType::Distance,
            travel_mode: "Walking".to_string(),
            ..FormState::default()
        }
    }

    fn point(lon: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lon, lat).unwrap()
    }

    #[tokio::test]
    async fn test_click_clears_marks_origin_then_renders() {
        let (session, surface, solver) = session();
        let clicked = point(10.75, 59.91);

        let report = session.on_click(clicked, &walking_form()).await.unwrap();

        assert_eq!(report.travel_mode, "Walking Distance");
        assert_eq!(
            *surface.draws.lock().unwrap(),
            vec![Draw::Clear, Draw::Point(clicked), Draw::Polygons(2.0)]
        );
        assert_eq!(*solver.origins.lock().unwrap(), vec![clicked]);
        assert_eq!(session.last_clicked().await, Some(clicked));
    }

    #[tokio::test]
    async fn test_overlapping_clicks_leave_only_latest_overlays() {
        let solver = EchoSolver {
            delay: Some(std::time::Duration::from_millis(30)),
            ..EchoSolver::new()
        };
        let (session, surface, _solver) = session_with(solver);
        let session = Arc::new(session);
        let first_click = point(1.0, 1.0);
        let second_click = point(2.0, 2.0);

        let first = {
            let session = session.clone();
            let form = FormState {
                budget: 45.0,
                increment_enabled: true,
                ..walking_form()
            };
            tokio::spawn(async move { session.on_click(first_click, &form).await })
        };
        // 第一個週期正在求解時點第二下
        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        let second = {
            let session = session.clone();
            tokio::spawn(async move { session.on_click(second_click, &walking_form()).await })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let draws = surface.draws.lock().unwrap().clone();
        assert_eq!(
            draws,
            vec![
                Draw::Clear,
                Draw::Point(first_click),
                Draw::Polygons(15.0),
                Draw::Polygons(30.0),
                Draw::Polygons(45.0),
                Draw::Clear,
                Draw::Point(second_click),
                Draw::Polygons(2.0),
            ]
        );
        assert_eq!(session.last_clicked().await, Some(second_click));
    }

    #[tokio::test]
    async fn test_submit_without_click_uses_map_center() {
        let (session, _surface, solver) = session();

        session.on_submit(&walking_form()).await.unwrap();

        assert_eq!(
            *solver.origins.lock().unwrap(),
            vec![point(-117.133163, 34.022445)]
        );
    }

    #[tokio::test]
    async fn test_submit_reuses_last_clicked_location() {
        let (session, _surface, solver) = session();
        let clicked = point(18.07, 59.33);

        session.on_click(clicked, &walking_form()).await.unwrap();
        session.on_submit(&walking_form()).await.unwrap();

        assert_eq!(*solver.origins.lock().unwrap(), vec![clicked, clicked]);
    }

    #[tokio::test]
    async fn test_drive_processes_clicks_in_order() {
        let (session, _surface, solver) = session();
        let (tx, rx) = mpsc::channel(4);
        let clicks = [point(1.0, 1.0), point(2.0, 2.0), point(3.0, 3.0)];
        for click in clicks {
            tx.send(click).await.unwrap();
        }
        drop(tx);

        let reports = session.drive(rx, &walking_form()).await;

        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.is_ok()));
        assert_eq!(*solver.origins.lock().unwrap(), clicks.to_vec());
    }

    #[tokio::test]
    async fn test_drive_continues_after_failed_cycle() {
        let (session, _surface, solver) = session();
        let (tx, rx) = mpsc::channel(4);
        tx.send(point(1.0, 1.0)).await.unwrap();
        tx.send(point(2.0, 2.0)).await.unwrap();
        drop(tx);

        let form = FormState {
            travel_mode: "Driving".to_string(),
            ..walking_form()
        };
        let reports = session.drive(rx, &form).await;

        // "Driving Distance" 不在目錄中，兩次都失敗但都有嘗試
        assert_eq!(reports.len(), 2);
        assert!(reports
            .iter()
            .all(|r| matches!(r, Err(AppError::UnknownTravelMode { .. }))));
        assert!(solver.modes_requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_click_each_continues_past_failed_cycle() {
        let (session, _surface, solver) = session();
        let points = [point(1.0, 1.0), point(2.0, 2.0)];
        let form = FormState {
            travel_mode: "Driving".to_string(),
            ..walking_form()
        };
        let mut calls = 0;

        let reports = session
            .click_each(&points, &form, |_, outcome| {
                assert!(outcome.is_err());
                calls += 1;
            })
            .await;

        assert_eq!(calls, 2);
        assert_eq!(reports.len(), 2);
        assert!(solver.origins.lock().unwrap().is_empty());
    }

    struct FailingGeolocator;

    #[async_trait]
    impl Geolocator for FailingGeolocator {
        async fn locate(&self) -> Result<GeoPoint> {
            Err(AppError::NetworkUnavailable {
                message: "User denied Geolocation".to_string(),
            })
        }
    }

    struct FixedGeolocator(GeoPoint);

    #[async_trait]
    impl Geolocator for FixedGeolocator {
        async fn locate(&self) -> Result<GeoPoint> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_initial_center_falls_back_to_default() {
        let center = initial_center(Some(&FailingGeolocator), DEFAULT_CENTER).await;
        assert_eq!(center, DEFAULT_CENTER);

        let center = initial_center(None, DEFAULT_CENTER).await;
        assert_eq!(center, DEFAULT_CENTER);
    }

    #[tokio::test]
    async fn test_initial_center_uses_located_point() {
        let located = point(-0.1276, 51.5072);
        let center = initial_center(Some(&FixedGeolocator(located)), DEFAULT_CENTER).await;
        assert_eq!(center, located);
    }
}
