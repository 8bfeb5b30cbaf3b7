use crate::model::WaveNumber;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 분석 서비스 수명주기 이벤트
///
/// `WaveAnalysisService::subscribe()`로 구독합니다. 구독자가 없으면 버려집니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalysisEvent {
    /// 유효한 캐시 결과 반환
    CacheHit { symbol: String, timeframe: String },
    /// 새로 계산된 결과
    Computed {
        symbol: String,
        timeframe: String,
        current_wave: WaveNumber,
        wave_count: usize,
    },
    /// 분석 불가 (입력 오류, 조회 실패, 패턴 없음)
    NoAnalysis {
        symbol: String,
        timeframe: String,
        reason: String,
    },
    /// 캐시 기록 실패 (결과는 호출자에게 그대로 반환됨)
    CacheWriteFailed {
        symbol: String,
        timeframe: String,
        reason: String,
    },
    /// 배치 갱신 시작
    RefreshStarted { timeframe: String, symbols: usize },
    /// 배치 갱신 중 심볼 실패
    SymbolFailed {
        symbol: String,
        timeframe: String,
        reason: String,
    },
    /// 배치 갱신 종료
    RefreshCompleted {
        timeframe: String,
        succeeded: usize,
        failed: usize,
    },
}

impl Display for AnalysisEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisEvent::CacheHit { symbol, timeframe } => {
                write!(f, "캐시 적중 {symbol} {timeframe}")
            }
            AnalysisEvent::Computed {
                symbol,
                timeframe,
                current_wave,
                wave_count,
            } => write!(
                f,
                "계산 완료 {symbol} {timeframe}: 현재 {current_wave}파 (파동 {wave_count}개)"
            ),
            AnalysisEvent::NoAnalysis {
                symbol,
                timeframe,
                reason,
            } => write!(f, "분석 없음 {symbol} {timeframe}: {reason}"),
            AnalysisEvent::CacheWriteFailed {
                symbol,
                timeframe,
                reason,
            } => write!(f, "캐시 기록 실패 {symbol} {timeframe}: {reason}"),
            AnalysisEvent::RefreshStarted { timeframe, symbols } => {
                write!(f, "갱신 시작 {timeframe}: {symbols}개 심볼")
            }
            AnalysisEvent::SymbolFailed {
                symbol,
                timeframe,
                reason,
            } => write!(f, "갱신 실패 {symbol} {timeframe}: {reason}"),
            AnalysisEvent::RefreshCompleted {
                timeframe,
                succeeded,
                failed,
            } => write!(f, "갱신 종료 {timeframe}: 성공 {succeeded}, 실패 {failed}"),
        }
    }
}
