use crate::core::breaks::{decompose, DEFAULT_MAX_BREAKS};
use crate::domain::model::{
    AreaType, Budget, FillPattern, FillSymbol, MarkerSymbol, Origin, ServiceAreaPolygon,
    TravelDirection, TravelMode,
};
use crate::domain::ports::{BusyIndicator, MapSurface, SolveRequest, Solver};
use crate::utils::error::{AppError, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 計算週期的狀態機：Idle → Resolving → Solving(0..n) → Idle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleState {
    Idle,
    Resolving,
    Solving { index: usize, break_value: f64 },
}

impl CycleState {
    pub fn is_busy(&self) -> bool {
        !matches!(self, CycleState::Idle)
    }
}

/// 求解失敗時的重試策略；`max_attempts = 1` 表示不重試
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// 指數退避：base, 2*base, 4*base ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub service_url: String,
    pub solve_timeout: Duration,
    pub catalog_timeout: Duration,
    pub retry: RetryPolicy,
    pub out_spatial_reference: u32,
    pub max_breaks: usize,
}

impl ControllerSettings {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            solve_timeout: Duration::from_secs(60),
            catalog_timeout: Duration::from_secs(30),
            retry: RetryPolicy::none(),
            out_spatial_reference: 4326,
            max_breaks: DEFAULT_MAX_BREAKS,
        }
    }
}

/// 一次計算週期所需的全部輸入，由呼叫端擁有
#[derive(Debug, Clone)]
pub struct CycleRequest {
    pub origin: Origin,
    pub budget: f64,
    pub area_type: AreaType,
    pub travel_mode_name: String,
    pub direction: TravelDirection,
    pub increment_enabled: bool,
    pub fill_pattern: FillPattern,
}

#[derive(Debug)]
pub struct BreakOutcome {
    pub break_value: f64,
    /// 成功時為繪製的多邊形數量
    pub result: std::result::Result<usize, AppError>,
}

impl BreakOutcome {
    pub fn is_rendered(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: u64,
    pub travel_mode: String,
    pub breaks: Vec<BreakOutcome>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn rendered(&self) -> impl Iterator<Item = &BreakOutcome> {
        self.breaks.iter().filter(|b| b.is_rendered())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BreakOutcome> {
        self.breaks.iter().filter(|b| !b.is_rendered())
    }

    pub fn polygon_count(&self) -> usize {
        self.breaks
            .iter()
            .filter_map(|b| b.result.as_ref().ok())
            .sum()
    }
}

/// 週期期間持有忙碌狀態，離開作用域 (包含錯誤或被取消) 時一定回到 Idle
struct BusyGuard<'a> {
    indicator: &'a dyn BusyIndicator,
}

impl<'a> BusyGuard<'a> {
    fn enter(indicator: &'a dyn BusyIndicator) -> Self {
        indicator.transition(&CycleState::Resolving);
        Self { indicator }
    }

    fn advance(&self, state: CycleState) {
        self.indicator.transition(&state);
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.indicator.transition(&CycleState::Idle);
    }
}

pub struct CycleController {
    solver: Arc<dyn Solver>,
    surface: Arc<dyn MapSurface>,
    busy: Arc<dyn BusyIndicator>,
    settings: ControllerSettings,
    // 重疊的週期在此排隊，繪製不會交錯
    turn: Mutex<()>,
    next_cycle: AtomicU64,
}

impl CycleController {
    pub fn new(
        solver: Arc<dyn Solver>,
        surface: Arc<dyn MapSurface>,
        busy: Arc<dyn BusyIndicator>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            solver,
            surface,
            busy,
            settings,
            turn: Mutex::new(()),
            next_cycle: AtomicU64::new(1),
        }
    }

    pub fn surface(&self) -> &Arc<dyn MapSurface> {
        &self.surface
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// 執行一個完整的計算週期。
    ///
    /// 預算驗證失敗時不會觸發忙碌狀態也不會發出任何網路請求。旅行模式解析失敗
    /// 會中止整個週期；單一 break 的求解失敗只記錄在報告中，後續 break 照常求解。
    pub async fn run_cycle(&self, request: &CycleRequest) -> Result<CycleReport> {
        self.run(request, None).await
    }

    /// 清除地圖並標記起點後執行週期。清除、標記與求解在同一個輪次內完成，
    /// 排在後面的點擊不會清掉仍在繪製中的週期。
    pub async fn run_fresh_cycle(
        &self,
        request: &CycleRequest,
        marker: &MarkerSymbol,
    ) -> Result<CycleReport> {
        self.run(request, Some(marker)).await
    }

    async fn run(
        &self,
        request: &CycleRequest,
        marker: Option<&MarkerSymbol>,
    ) -> Result<CycleReport> {
        let budget = Budget::new(request.budget, request.area_type)?;
        let breaks = decompose(&budget, request.increment_enabled, self.settings.max_breaks)?;

        let _turn = self.turn.lock().await;
        if let Some(marker) = marker {
            self.surface.clear_all();
            self.surface.draw_point(request.origin.point, marker);
        }
        let cycle_id = self.next_cycle.fetch_add(1, Ordering::Relaxed);
        let started_at = Utc::now();
        let clock = Instant::now();

        tracing::info!(
            "🧭 Cycle {} started at {} ({} {}, {} breaks)",
            cycle_id,
            request.origin.point,
            budget.value(),
            budget.area_type.unit(),
            breaks.len()
        );

        let busy = BusyGuard::enter(self.busy.as_ref());

        let travel_mode = self.resolve_travel_mode(&request.travel_mode_name).await?;
        let symbol = FillSymbol::overlay(request.fill_pattern);

        let mut outcomes = Vec::with_capacity(breaks.len());
        for (index, break_value) in breaks.iter().enumerate() {
            busy.advance(CycleState::Solving { index, break_value });

            let solve_request = SolveRequest {
                origin: request.origin.clone(),
                break_value,
                travel_mode: travel_mode.clone(),
                direction: request.direction,
                out_spatial_reference: self.settings.out_spatial_reference,
            };

            let result = match self.solve_break(&solve_request).await {
                Ok(polygons) => {
                    let tagged: Vec<ServiceAreaPolygon> = polygons
                        .into_iter()
                        .map(|p| p.tagged(break_value))
                        .collect();
                    self.surface.draw_polygons(&tagged, &symbol);
                    tracing::debug!(
                        "Rendered {} polygon(s) for break {}",
                        tagged.len(),
                        break_value
                    );
                    Ok(tagged.len())
                }
                Err(e) => {
                    tracing::error!("❌ Error solving service area for {}: {}", break_value, e);
                    Err(e)
                }
            };

            outcomes.push(BreakOutcome {
                break_value,
                result,
            });
        }

        drop(busy);

        let report = CycleReport {
            cycle_id,
            travel_mode: travel_mode.name,
            breaks: outcomes,
            started_at,
            elapsed: clock.elapsed(),
        };

        tracing::info!(
            "✅ Cycle {} finished: {} rendered, {} failed in {:?}",
            cycle_id,
            report.rendered().count(),
            report.failed().count(),
            report.elapsed
        );

        Ok(report)
    }

    async fn resolve_travel_mode(&self, name: &str) -> Result<TravelMode> {
        let fetch = self.solver.fetch_travel_modes(&self.settings.service_url);
        let catalog = match tokio::time::timeout(self.settings.catalog_timeout, fetch).await {
            Ok(Ok(catalog)) => catalog,
            Ok(Err(e)) => {
                return Err(AppError::CatalogUnavailable {
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(AppError::CatalogUnavailable {
                    message: format!(
                        "no answer within {}s",
                        self.settings.catalog_timeout.as_secs()
                    ),
                })
            }
        };

        tracing::debug!("Travel mode catalog has {} entries", catalog.len());

        let available: Vec<String> = catalog.iter().map(|m| m.name.clone()).collect();
        catalog
            .into_iter()
            .find(|mode| mode.name == name)
            .ok_or_else(|| AppError::UnknownTravelMode {
                name: name.to_string(),
                available,
            })
    }

    async fn solve_break(&self, request: &SolveRequest) -> Result<Vec<ServiceAreaPolygon>> {
        let retry = self.settings.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let solve = self.solver.solve(&self.settings.service_url, request);
            let outcome = match tokio::time::timeout(self.settings.solve_timeout, solve).await {
                Ok(Ok(polygons)) => return Ok(polygons),
                Ok(Err(e)) => as_break_error(e, request.break_value),
                Err(_) => AppError::Timeout {
                    operation: format!("solve break {}", request.break_value),
                    seconds: self.settings.solve_timeout.as_secs(),
                },
            };

            if attempt >= max_attempts {
                return Err(outcome);
            }

            let delay = retry.delay_for(attempt);
            tracing::warn!(
                "⚠️ Attempt {}/{} for break {} failed ({}), retrying in {:?}",
                attempt,
                max_attempts,
                request.break_value,
                outcome,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn as_break_error(error: AppError, break_value: f64) -> AppError {
    if error.is_break_local() {
        error
    } else {
        AppError::Solve {
            break_value,
            message: error.to_string(),
        }
    }
}
