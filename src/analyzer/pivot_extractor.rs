use crate::model::{Pivot, PivotKind, PricePoint};

/// 지그재그 진행 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// 지그재그 필터로 유의미한 고점/저점을 추출합니다.
///
/// 현재 방향의 극값을 추적하다가 가격이 극값 대비 `min_swing_percent` 이상
/// 반전하면 피벗을 확정하고 방향을 바꿉니다. 마지막 극값은 아직 확정되지 않은
/// 피벗으로 결과 끝에 추가됩니다.
///
/// # Arguments
/// * `series` - 시간 오름차순 가격 데이터
/// * `min_swing_percent` - 노이즈로 무시할 최소 반전 비율 (퍼센트, 예: 2.0)
///
/// # Returns
/// * `Vec<Pivot>` - 고점/저점이 엄격히 교대하는 피벗 목록
pub fn extract_pivots(series: &[PricePoint], min_swing_percent: f64) -> Vec<Pivot> {
    if series.len() < 2 || !(min_swing_percent > 0.0) {
        return Vec::new();
    }

    let threshold = min_swing_percent / 100.0;
    let mut pivots: Vec<Pivot> = Vec::new();
    let mut direction: Option<Direction> = None;
    let mut high_index = 0;
    let mut low_index = 0;

    for (i, point) in series.iter().enumerate().skip(1) {
        match direction {
            None => {
                if point.high > series[high_index].high {
                    high_index = i;
                }
                if point.low < series[low_index].low {
                    low_index = i;
                }

                let high = series[high_index].high;
                let low = series[low_index].low;

                if low_index < high_index && high >= low * (1.0 + threshold) {
                    pivots.push(Pivot::low(series[low_index].timestamp, low));
                    direction = Some(Direction::Up);
                } else if high_index < low_index && low <= high * (1.0 - threshold) {
                    pivots.push(Pivot::high(series[high_index].timestamp, high));
                    direction = Some(Direction::Down);
                }
            }
            Some(Direction::Up) => {
                if point.high > series[high_index].high {
                    high_index = i;
                } else if point.low <= series[high_index].high * (1.0 - threshold) {
                    pivots.push(Pivot::high(
                        series[high_index].timestamp,
                        series[high_index].high,
                    ));
                    low_index = i;
                    direction = Some(Direction::Down);
                }
            }
            Some(Direction::Down) => {
                if point.low < series[low_index].low {
                    low_index = i;
                } else if point.high >= series[low_index].low * (1.0 + threshold) {
                    pivots.push(Pivot::low(
                        series[low_index].timestamp,
                        series[low_index].low,
                    ));
                    high_index = i;
                    direction = Some(Direction::Up);
                }
            }
        }
    }

    // 진행 중인 극값을 마지막 피벗으로 노출
    match direction {
        Some(Direction::Up) => pivots.push(Pivot::high(
            series[high_index].timestamp,
            series[high_index].high,
        )),
        Some(Direction::Down) => pivots.push(Pivot::low(
            series[low_index].timestamp,
            series[low_index].low,
        )),
        None => {}
    }

    log::trace!(
        "피벗 추출 완료: 데이터 {}개 -> 피벗 {}개",
        series.len(),
        pivots.len()
    );
    pivots
}

/// 피벗 목록이 고점/저점을 엄격히 교대하는지 확인
pub fn is_alternating(pivots: &[Pivot]) -> bool {
    pivots.windows(2).all(|pair| pair[0].kind != pair[1].kind)
}

/// 같은 종류가 연속되는 피벗을 더 극단적인 하나로 합칩니다.
///
/// 고점이 연속되면 더 높은 고점을, 저점이 연속되면 더 낮은 저점을 남깁니다.
pub fn normalize_pivots(pivots: &[Pivot]) -> Vec<Pivot> {
    let mut normalized: Vec<Pivot> = Vec::with_capacity(pivots.len());

    for pivot in pivots {
        match normalized.last_mut() {
            Some(last) if last.kind == pivot.kind => {
                let more_extreme = match pivot.kind {
                    PivotKind::High => pivot.price > last.price,
                    PivotKind::Low => pivot.price < last.price,
                };
                if more_extreme {
                    *last = *pivot;
                }
            }
            _ => normalized.push(*pivot),
        }
    }

    normalized
}
