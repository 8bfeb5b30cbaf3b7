use crate::config_loader::{ConfigError, ConfigResult, ConfigValidation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HOUR_MS: i64 = 60 * 60 * 1000;

/// 파동 분석 엔진 설정
///
/// 모든 값은 단순 숫자 설정이며 누락된 항목은 기본값을 사용합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 지그재그 최소 반전 비율 (퍼센트)
    pub min_swing_percent: f64,
    /// 과거 시계열 캐시 TTL (시간)
    pub series_ttl_hours: u64,
    /// 파동 분석 결과 캐시 TTL (시간)
    pub analysis_ttl_hours: u64,
    /// 배치당 심볼 수
    pub batch_size: usize,
    /// 배치 내 심볼 간 지연 (밀리초)
    pub per_symbol_delay_ms: u64,
    /// 배치 간 지연 (밀리초)
    pub inter_batch_delay_ms: u64,
    /// 정기 갱신 주기 (시간)
    pub refresh_interval_hours: u64,
    /// 이벤트 채널 버퍼 크기
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            min_swing_percent: 2.0,
            series_ttl_hours: 6,
            analysis_ttl_hours: 24,
            batch_size: 5,
            per_symbol_delay_ms: 250,
            inter_batch_delay_ms: 2000,
            refresh_interval_hours: 24,
            event_buffer: 64,
        }
    }
}

impl EngineConfig {
    /// 시계열 캐시 TTL (밀리초)
    pub fn series_ttl_ms(&self) -> i64 {
        self.series_ttl_hours as i64 * HOUR_MS
    }

    /// 분석 결과 캐시 TTL (밀리초)
    pub fn analysis_ttl_ms(&self) -> i64 {
        self.analysis_ttl_hours as i64 * HOUR_MS
    }

    pub fn per_symbol_delay(&self) -> Duration {
        Duration::from_millis(self.per_symbol_delay_ms)
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_hours * 3600)
    }
}

impl ConfigValidation for EngineConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(self.min_swing_percent > 0.0) || !self.min_swing_percent.is_finite() {
            return Err(ConfigError::ValidationError(format!(
                "min_swing_percent는 양수여야 합니다: {}",
                self.min_swing_percent
            )));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch_size는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.series_ttl_hours == 0 || self.analysis_ttl_hours == 0 {
            return Err(ConfigError::ValidationError(
                "캐시 TTL은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.refresh_interval_hours == 0 {
            return Err(ConfigError::ValidationError(
                "refresh_interval_hours는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "event_buffer는 0보다 커야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}
