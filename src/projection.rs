//! 분석 결과의 읽기 전용 투영
//!
//! 차트 오버레이나 목록 화면처럼 결과를 소비하는 쪽에서 쓰는 보조 함수들입니다.
//! 모두 결과를 빌려 읽기만 합니다.

use crate::model::{FibTarget, Wave, WaveAnalysisResult, WaveNumber, WaveType};

/// 분석 결과가 없을 때의 요약 문구
pub const NO_PATTERN_SUMMARY: &str = "no wave pattern detected";

impl WaveAnalysisResult {
    /// 현재 가격 기준으로 아직 도달하지 않은 목표가
    ///
    /// 현재 파동이 상승 중이면 현재가보다 높은 목표가, 하락 중이면 낮은 목표가만
    /// 남기고 현재가에서 가까운 순으로 정렬합니다.
    ///
    /// # Arguments
    /// * `current_price` - 현재 가격
    ///
    /// # Returns
    /// * `Vec<&FibTarget>` - 진행 방향 앞쪽의 목표가
    pub fn pending_targets(&self, current_price: f64) -> Vec<&FibTarget> {
        let rising = self.current_wave.is_rising();
        let mut ahead: Vec<&FibTarget> = self
            .fib_targets
            .iter()
            .filter(|target| {
                if rising {
                    target.price > current_price
                } else {
                    target.price < current_price
                }
            })
            .collect();
        ahead.sort_by(|a, b| {
            (a.price - current_price)
                .abs()
                .total_cmp(&(b.price - current_price).abs())
        });
        ahead
    }

    /// 충격형 파동 (1, 3, 5, A, C)
    pub fn impulse_waves(&self) -> impl Iterator<Item = &Wave> {
        self.waves_of(WaveType::Impulse)
    }

    /// 조정형 파동 (2, 4, B)
    pub fn corrective_waves(&self) -> impl Iterator<Item = &Wave> {
        self.waves_of(WaveType::Corrective)
    }

    fn waves_of(&self, wave_type: WaveType) -> impl Iterator<Item = &Wave> {
        self.waves
            .iter()
            .filter(move |wave| wave.wave_type == wave_type)
    }

    /// 라벨이 붙은 파동 수 (현재 파동 포함)
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// 현재 파동 다음에 예상되는 파동 번호
    pub fn expected_next_wave(&self) -> WaveNumber {
        let next = (self.current_wave.number.position() + 1) % WaveNumber::CYCLE.len();
        WaveNumber::CYCLE[next]
    }

    /// 한 줄 요약
    pub fn summary(&self) -> String {
        let direction = if self.current_wave.is_rising() {
            "rising"
        } else {
            "falling"
        };
        let mut text = format!(
            "{} {}: {} trend, wave {} {} from {:.2} to {:.2}, {} waves labeled",
            self.symbol,
            self.timeframe,
            self.trend,
            self.current_wave.number,
            direction,
            self.current_wave.start_price,
            self.current_wave.end_price,
            self.wave_count()
        );
        if let Some(nearest) = self.pending_targets(self.current_wave.end_price).first() {
            text.push_str(&format!(
                ", next target {} at {:.2}",
                nearest.label, nearest.price
            ));
        }
        text
    }
}

/// 결과 유무와 관계없이 요약 문구 생성
pub fn summarize(result: Option<&WaveAnalysisResult>) -> String {
    match result {
        Some(result) => result.summary(),
        None => NO_PATTERN_SUMMARY.to_string(),
    }
}
