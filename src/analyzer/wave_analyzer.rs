use crate::analyzer::fibonacci_calculator::compute_fib_targets;
use crate::analyzer::pivot_extractor::extract_pivots;
use crate::analyzer::wave_labeler::label_waves;
use crate::error::{AnalysisError, AnalysisResult};
use crate::model::{Trend, WaveAnalysisResult};
use crate::series::PriceSeries;
use log::debug;
use std::fmt::Display;

/// 피벗 추출 -> 파동 라벨링 -> 피보나치 목표가 순으로 실행하는 순수 파이프라인
///
/// I/O 없이 메모리 데이터만 다루며 동일 입력에 대해 동일 결과를 반환합니다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveAnalyzer {
    pub min_swing_percent: f64,
}

impl Display for WaveAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WaveAnalyzer(min_swing={}%)", self.min_swing_percent)
    }
}

impl WaveAnalyzer {
    /// 새 분석기 생성
    pub fn new(min_swing_percent: f64) -> WaveAnalyzer {
        WaveAnalyzer { min_swing_percent }
    }

    /// 시계열 전체를 분석합니다.
    ///
    /// # Arguments
    /// * `symbol` - 심볼
    /// * `timeframe` - 타임프레임
    /// * `series` - 검증된 가격 시계열
    /// * `computed_at` - 계산 시각 (epoch 밀리초)
    ///
    /// # Returns
    /// * `AnalysisResult<WaveAnalysisResult>` - 분석 결과 또는 "분석 없음" 사유
    pub fn analyze(
        &self,
        symbol: &str,
        timeframe: &str,
        series: &PriceSeries,
        computed_at: i64,
    ) -> AnalysisResult<WaveAnalysisResult> {
        if series.len() < 2 {
            return Err(AnalysisError::InsufficientData { len: series.len() });
        }

        let pivots = extract_pivots(series.items(), self.min_swing_percent);
        let labeling = label_waves(&pivots);

        let Some(current_wave) = labeling.current_wave.clone() else {
            return Err(AnalysisError::NoPattern {
                pivots: pivots.len(),
            });
        };

        let fib_targets = compute_fib_targets(&labeling.waves, &current_wave);
        let trend = labeling
            .trend()
            .unwrap_or_else(|| Trend::from_direction(current_wave.is_rising()));

        debug!(
            "{} {} 분석 완료: 피벗 {}개, 파동 {}개, 현재 {}파, 목표가 {}개",
            symbol,
            timeframe,
            pivots.len(),
            labeling.waves.len(),
            current_wave.number,
            fib_targets.len()
        );

        Ok(WaveAnalysisResult {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            waves: labeling.waves,
            current_wave,
            fib_targets,
            trend,
            computed_at,
        })
    }
}
