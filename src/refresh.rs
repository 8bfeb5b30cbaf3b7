//! 배치 갱신 조정기
//!
//! 심볼 목록을 고정 크기 배치로 나누어 순차적으로 재계산합니다.
//! 심볼 하나의 실패는 기록만 하고 나머지 처리를 계속합니다.

use crate::config::EngineConfig;
use crate::events::AnalysisEvent;
use crate::model::WaveAnalysisResult;
use crate::service::WaveAnalysisService;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, sleep};

/// 정기 갱신의 최소 주기
pub const MIN_REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// 배치 갱신 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOptions {
    /// 배치당 심볼 수 (0은 1로 취급)
    pub batch_size: usize,
    /// 배치 내 심볼 간 지연
    pub per_symbol_delay: Duration,
    /// 배치 간 지연
    pub inter_batch_delay: Duration,
}

impl RefreshOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        RefreshOptions {
            batch_size: config.batch_size,
            per_symbol_delay: config.per_symbol_delay(),
            inter_batch_delay: config.inter_batch_delay(),
        }
    }

    /// 지연 없는 옵션
    pub fn immediate(batch_size: usize) -> Self {
        RefreshOptions {
            batch_size,
            per_symbol_delay: Duration::ZERO,
            inter_batch_delay: Duration::ZERO,
        }
    }
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// 실패한 심볼과 사유
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshFailure {
    pub symbol: String,
    pub reason: String,
}

/// 배치 갱신 결과 요약
///
/// 부분 성공도 최종 결과이며 되돌리지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub timeframe: String,
    pub results: Vec<WaveAnalysisResult>,
    pub failures: Vec<RefreshFailure>,
}

impl RefreshReport {
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// 심볼이 실패 목록에 있는지 확인
    pub fn is_failed(&self, symbol: &str) -> bool {
        self.failures.iter().any(|f| f.symbol == symbol)
    }

    /// 심볼의 갱신 결과
    pub fn result_for(&self, symbol: &str) -> Option<&WaveAnalysisResult> {
        self.results.iter().find(|r| r.symbol == symbol)
    }
}

impl Display for RefreshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RefreshReport({}, 성공={}, 실패={})",
            self.timeframe,
            self.succeeded(),
            self.failed()
        )
    }
}

/// 배치 갱신 조정기
#[derive(Clone)]
pub struct BatchRefreshCoordinator {
    service: Arc<WaveAnalysisService>,
}

impl BatchRefreshCoordinator {
    pub fn new(service: Arc<WaveAnalysisService>) -> Self {
        BatchRefreshCoordinator { service }
    }

    pub fn service(&self) -> &Arc<WaveAnalysisService> {
        &self.service
    }

    /// 심볼 목록 갱신
    ///
    /// 심볼마다 캐시 무효화 -> 새 시계열 조회 -> 분석 -> 캐시 기록 순으로 처리합니다.
    ///
    /// # Arguments
    /// * `symbols` - 갱신할 심볼 목록
    /// * `timeframe` - 타임프레임
    /// * `options` - 배치 크기와 지연
    ///
    /// # Returns
    /// * `RefreshReport` - 성공/실패 요약
    pub async fn refresh_symbols(
        &self,
        symbols: &[String],
        timeframe: &str,
        options: RefreshOptions,
    ) -> RefreshReport {
        let batch_size = options.batch_size.max(1);
        let batch_count = symbols.len().div_ceil(batch_size);
        info!(
            "{} 갱신 시작: 심볼 {}개, 배치 {}개",
            timeframe,
            symbols.len(),
            batch_count
        );
        self.service.emit(AnalysisEvent::RefreshStarted {
            timeframe: timeframe.to_string(),
            symbols: symbols.len(),
        });

        let mut report = RefreshReport {
            timeframe: timeframe.to_string(),
            ..RefreshReport::default()
        };

        for (batch_index, batch) in symbols.chunks(batch_size).enumerate() {
            if batch_index > 0 && !options.inter_batch_delay.is_zero() {
                sleep(options.inter_batch_delay).await;
            }
            debug!("배치 {}/{} 처리: {:?}", batch_index + 1, batch_count, batch);

            for (position, symbol) in batch.iter().enumerate() {
                if position > 0 && !options.per_symbol_delay.is_zero() {
                    sleep(options.per_symbol_delay).await;
                }
                self.refresh_one(symbol, timeframe, &mut report).await;
            }
        }

        info!(
            "{} 갱신 종료: 성공 {}, 실패 {}",
            timeframe,
            report.succeeded(),
            report.failed()
        );
        self.service.emit(AnalysisEvent::RefreshCompleted {
            timeframe: timeframe.to_string(),
            succeeded: report.succeeded(),
            failed: report.failed(),
        });
        report
    }

    async fn refresh_one(&self, symbol: &str, timeframe: &str, report: &mut RefreshReport) {
        self.service.invalidate(symbol, timeframe).await;

        match self.service.try_analyze(symbol, timeframe, true).await {
            Ok(result) => report.results.push(result),
            Err(e) => {
                warn!("{} {} 갱신 실패, 건너뜀: {}", symbol, timeframe, e);
                self.service.emit(AnalysisEvent::SymbolFailed {
                    symbol: symbol.to_string(),
                    timeframe: timeframe.to_string(),
                    reason: e.to_string(),
                });
                report.failures.push(RefreshFailure {
                    symbol: symbol.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    /// 고정 주기로 갱신을 반복하는 작업 실행
    ///
    /// 첫 갱신은 즉시 실행됩니다. 반환된 핸들을 abort하면 중지됩니다.
    /// `MIN_REFRESH_PERIOD`보다 짧은 주기는 최소 주기로 올려 사용합니다.
    ///
    /// # Arguments
    /// * `symbols` - 갱신할 심볼 목록
    /// * `timeframe` - 타임프레임
    /// * `period` - 갱신 주기
    /// * `options` - 배치 옵션
    pub fn spawn_periodic(
        &self,
        symbols: Vec<String>,
        timeframe: String,
        period: Duration,
        options: RefreshOptions,
    ) -> JoinHandle<()> {
        let period = if period < MIN_REFRESH_PERIOD {
            warn!("정기 갱신 주기가 너무 짧음 ({:?}), {:?}로 조정", period, MIN_REFRESH_PERIOD);
            MIN_REFRESH_PERIOD
        } else {
            period
        };
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = coordinator
                    .refresh_symbols(&symbols, &timeframe, options)
                    .await;
                debug!("정기 갱신 완료: {}", report);
            }
        })
    }
}
