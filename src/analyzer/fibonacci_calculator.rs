use crate::model::{FibTarget, Wave, WaveType};

/// 조정 파동의 되돌림 비율
pub const RETRACEMENT_RATIOS: [(&str, f64); 5] = [
    ("0.236", 0.236),
    ("0.382", 0.382),
    ("0.5", 0.5),
    ("0.618", 0.618),
    ("0.786", 0.786),
];

/// 충격 파동의 확장 비율
pub const EXTENSION_RATIOS: [(&str, f64); 5] = [
    ("1.0", 1.0),
    ("1.272", 1.272),
    ("1.618", 1.618),
    ("2.0", 2.0),
    ("2.618", 2.618),
];

/// 현재 파동에 대한 피보나치 목표가를 계산합니다.
///
/// 조정 파동(2, 4, B)이면 직전 구간의 되돌림 가격을, 충격 파동(1, 3, 5, A, C)이면
/// 직전 구간의 확장 가격을 반환합니다. 현재 가격 기준 필터링은 하지 않습니다.
///
/// # Arguments
/// * `waves` - 시간 순서의 파동 목록 (현재 파동 포함 가능)
/// * `current_wave` - 현재 진행 중인 파동
///
/// # Returns
/// * `Vec<FibTarget>` - 직전 구간이 없으면 빈 목록
pub fn compute_fib_targets(waves: &[Wave], current_wave: &Wave) -> Vec<FibTarget> {
    let Some(preceding) = preceding_leg(waves, current_wave) else {
        return Vec::new();
    };

    let leg_start = preceding.start_price;
    let leg_end = preceding.end_price;
    let range = leg_end - leg_start;

    match current_wave.wave_type {
        WaveType::Corrective => RETRACEMENT_RATIOS
            .iter()
            .map(|(label, ratio)| FibTarget {
                label: label.to_string(),
                price: leg_end - ratio * range,
                is_extension: false,
            })
            .collect(),
        WaveType::Impulse => EXTENSION_RATIOS
            .iter()
            .map(|(label, ratio)| FibTarget {
                label: label.to_string(),
                price: leg_start + ratio * range,
                is_extension: true,
            })
            .collect(),
    }
}

/// 현재 파동의 시작 피벗에서 끝나는 파동을 찾습니다.
///
/// 목록 순서가 아니라 피벗 접점으로 판단하므로 현재 파동이 목록에 없어도 됩니다.
fn preceding_leg<'a>(waves: &'a [Wave], current_wave: &Wave) -> Option<&'a Wave> {
    waves.iter().rev().find(|wave| {
        wave.end_timestamp == current_wave.start_timestamp
            && wave.end_price == current_wave.start_price
    })
}
