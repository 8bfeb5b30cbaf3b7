//! 파동 분석 서비스
//!
//! 캐시 조회 -> 시계열 조회 -> 분석 파이프라인 -> 캐시 기록 흐름을 조정합니다.
//! 같은 키에 대한 동시 계산은 키별 비동기 잠금으로 직렬화되어,
//! 먼저 계산한 호출의 결과를 뒤따르는 호출이 캐시에서 읽습니다.

use crate::analyzer::WaveAnalyzer;
use crate::cache::{
    ANALYSIS_NAMESPACE, AnalysisCache, CacheKey, CacheStore, MemoryCacheStore, SERIES_NAMESPACE,
    SeriesCache,
};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::AnalysisResult;
use crate::events::AnalysisEvent;
use crate::model::WaveAnalysisResult;
use crate::provider::SeriesProvider;
use crate::series::PriceSeries;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// 파동 분석 서비스
pub struct WaveAnalysisService {
    provider: Arc<dyn SeriesProvider>,
    analysis_cache: AnalysisCache,
    series_cache: SeriesCache,
    analyzer: WaveAnalyzer,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    events: broadcast::Sender<AnalysisEvent>,
    in_flight: parking_lot::Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl WaveAnalysisService {
    /// 새 서비스 생성
    ///
    /// # Arguments
    /// * `provider` - 과거 시계열 공급자
    /// * `store` - 분석 결과와 시계열을 함께 보관하는 캐시 저장소
    /// * `clock` - 시각 공급자
    /// * `config` - 엔진 설정
    pub fn new(
        provider: Arc<dyn SeriesProvider>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let analysis_cache = AnalysisCache::new(
            store.clone(),
            clock.clone(),
            ANALYSIS_NAMESPACE,
            config.analysis_ttl_ms(),
        );
        let series_cache =
            SeriesCache::new(store, clock.clone(), SERIES_NAMESPACE, config.series_ttl_ms());
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        WaveAnalysisService {
            provider,
            analysis_cache,
            series_cache,
            analyzer: WaveAnalyzer::new(config.min_swing_percent),
            clock,
            config,
            events,
            in_flight: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// 메모리 저장소와 시스템 시계를 사용하는 서비스
    pub fn in_memory(provider: Arc<dyn SeriesProvider>, config: EngineConfig) -> Self {
        Self::new(
            provider,
            Arc::new(MemoryCacheStore::new()),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 수명주기 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.events.subscribe()
    }

    /// 파동 분석 결과 조회
    ///
    /// 캐시에 유효한 결과가 있으면 그대로 반환하고, 없으면 계산 후 기록합니다.
    /// 분석할 수 없는 경우 None을 반환하며 사유는 로그와 이벤트로 남습니다.
    ///
    /// # Arguments
    /// * `symbol` - 심볼
    /// * `timeframe` - 타임프레임
    /// * `force_refresh` - true면 캐시를 무시하고 새로 계산
    pub async fn analyze(
        &self,
        symbol: &str,
        timeframe: &str,
        force_refresh: bool,
    ) -> Option<WaveAnalysisResult> {
        self.try_analyze(symbol, timeframe, force_refresh).await.ok()
    }

    /// `analyze`와 같지만 실패 사유를 반환합니다.
    pub async fn try_analyze(
        &self,
        symbol: &str,
        timeframe: &str,
        force_refresh: bool,
    ) -> AnalysisResult<WaveAnalysisResult> {
        if !force_refresh {
            if let Some(result) = self.cached(symbol, timeframe).await {
                return Ok(result);
            }
        }

        let key = CacheKey::new(symbol, timeframe);
        let lock = self.key_lock(&key);
        let outcome = {
            let _guard = lock.lock().await;
            if force_refresh {
                self.compute(symbol, timeframe, true).await
            } else {
                // 대기하는 동안 다른 호출이 계산을 끝냈을 수 있다
                match self.cached(symbol, timeframe).await {
                    Some(result) => Ok(result),
                    None => self.compute(symbol, timeframe, false).await,
                }
            }
        };
        self.release_key(&key, lock);

        if let Err(e) = &outcome {
            info!("{} {} 분석 없음: {}", symbol, timeframe, e);
            self.emit(AnalysisEvent::NoAnalysis {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                reason: e.to_string(),
            });
        }
        outcome
    }

    /// 유효한 캐시 결과만 조회 (계산하지 않음)
    pub async fn cached(&self, symbol: &str, timeframe: &str) -> Option<WaveAnalysisResult> {
        match self.analysis_cache.get(symbol, timeframe, false).await {
            Ok(Some(result)) => {
                debug!("{} {} 캐시 적중", symbol, timeframe);
                self.emit(AnalysisEvent::CacheHit {
                    symbol: symbol.to_string(),
                    timeframe: timeframe.to_string(),
                });
                Some(result)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("{} {} 캐시 조회 실패, 미적중으로 처리: {}", symbol, timeframe, e);
                None
            }
        }
    }

    /// 단일 키의 분석 결과 무효화
    pub async fn invalidate(&self, symbol: &str, timeframe: &str) {
        if let Err(e) = self.analysis_cache.invalidate(symbol, timeframe).await {
            warn!("{} {} 캐시 무효화 실패: {}", symbol, timeframe, e);
        }
    }

    /// 모든 분석 결과 무효화
    ///
    /// # Returns
    /// * `usize` - 삭제된 항목 수
    pub async fn invalidate_all(&self) -> usize {
        match self.analysis_cache.invalidate_all().await {
            Ok(removed) => {
                info!("분석 캐시 전체 무효화: {}개", removed);
                removed
            }
            Err(e) => {
                warn!("분석 캐시 전체 무효화 실패: {}", e);
                0
            }
        }
    }

    pub(crate) fn emit(&self, event: AnalysisEvent) {
        // 구독자가 없으면 전송 실패는 무시한다
        let _ = self.events.send(event);
    }

    async fn compute(
        &self,
        symbol: &str,
        timeframe: &str,
        fresh_series: bool,
    ) -> AnalysisResult<WaveAnalysisResult> {
        let series = self.load_series(symbol, timeframe, fresh_series).await?;
        let result = self
            .analyzer
            .analyze(symbol, timeframe, &series, self.clock.now_ms())?;

        if let Err(e) = self.analysis_cache.put(symbol, timeframe, &result).await {
            warn!("{} {} 분석 결과 캐시 기록 실패: {}", symbol, timeframe, e);
            self.emit(AnalysisEvent::CacheWriteFailed {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                reason: e.to_string(),
            });
        }

        self.emit(AnalysisEvent::Computed {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            current_wave: result.current_wave.number,
            wave_count: result.waves.len(),
        });
        Ok(result)
    }

    async fn load_series(
        &self,
        symbol: &str,
        timeframe: &str,
        fresh: bool,
    ) -> AnalysisResult<PriceSeries> {
        match self.series_cache.get(symbol, timeframe, fresh).await {
            Ok(Some(points)) => {
                debug!("{} {} 시계열 캐시 사용: {}개", symbol, timeframe, points.len());
                return Ok(PriceSeries::new(points)?);
            }
            Ok(None) => {}
            Err(e) => warn!("{} {} 시계열 캐시 조회 실패: {}", symbol, timeframe, e),
        }

        let points = self.provider.fetch_series(symbol, timeframe).await?;
        // 검증을 통과한 시계열만 캐시에 남긴다
        let series = PriceSeries::new(points)?;
        if let Err(e) = self
            .series_cache
            .put(symbol, timeframe, &series.items().to_vec())
            .await
        {
            warn!("{} {} 시계열 캐시 기록 실패: {}", symbol, timeframe, e);
        }
        Ok(series)
    }

    fn key_lock(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn release_key(&self, key: &CacheKey, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock();
        // 맵과 호출자 외에 대기자가 없을 때만 제거
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(key);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }
}
