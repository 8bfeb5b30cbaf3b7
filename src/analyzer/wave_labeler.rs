use crate::analyzer::pivot_extractor::normalize_pivots;
use crate::model::{Pivot, Trend, Wave, WaveNumber};
use log::{debug, trace};

/// 파동 라벨링 결과
#[derive(Debug, Clone, PartialEq)]
pub struct WaveLabeling {
    /// 시간 순서의 라벨 파동 목록 (현재 파동 포함)
    pub waves: Vec<Wave>,
    /// 가장 최근 피벗에서 끝나는 진행 중 파동
    pub current_wave: Option<Wave>,
}

impl WaveLabeling {
    /// 빈 라벨링 결과
    pub fn empty() -> Self {
        WaveLabeling {
            waves: Vec::new(),
            current_wave: None,
        }
    }

    /// 현재 사이클의 추세 방향
    ///
    /// 1~5 구간에서는 1파 방향, A~C 구간에서는 조정 방향(1파의 반대)을 따릅니다.
    pub fn trend(&self) -> Option<Trend> {
        let current = self.current_wave.as_ref()?;
        let wave_one = self
            .waves
            .iter()
            .rev()
            .find(|wave| wave.number == WaveNumber::One)?;

        let rising = if current.number.is_motive_phase() {
            wave_one.is_rising()
        } else {
            !wave_one.is_rising()
        };
        Some(Trend::from_direction(rising))
    }
}

/// 아레나에 기록된 라벨 구간
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LabeledLeg {
    number: WaveNumber,
    /// 구간 인덱스 (피벗 `leg` -> `leg + 1`)
    leg: usize,
    /// 이 라벨을 결정하기까지 참조한 가장 먼 구간 인덱스
    decided_by: usize,
}

/// 구조 규칙 검사 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleCheck {
    Accept,
    /// 지정 구간부터의 라벨을 버리고 그 구간에서 새 1파를 시작
    RestartAt(usize),
}

/// 엘리엇 파동 라벨러
///
/// 라벨 파동을 추가 전용 아레나에 보관하고, 마지막으로 확정된 1파의 위치를
/// 인덱스로 캐시합니다. 캐시는 재라벨링이 아레나의 뒷부분을 버릴 때만 무효화됩니다.
#[derive(Debug, Clone, Default)]
pub struct WaveLabeler {
    pivots: Vec<Pivot>,
    arena: Vec<LabeledLeg>,
    last_wave_one: Option<usize>,
}

impl WaveLabeler {
    /// 새 라벨러 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 피벗 전체를 처음부터 라벨링합니다.
    ///
    /// # Arguments
    /// * `pivots` - 시간 순서의 피벗 목록 (교대하지 않으면 정규화됨)
    ///
    /// # Returns
    /// * `WaveLabeling` - 라벨 파동 목록과 현재 파동
    pub fn label(&mut self, pivots: &[Pivot]) -> WaveLabeling {
        self.pivots = normalize_pivots(pivots);
        self.arena.clear();
        self.last_wave_one = None;
        self.walk(0, 0);
        self.labeling()
    }

    /// 새 피벗 목록으로 라벨링을 갱신합니다.
    ///
    /// 변경되지 않은 구간만으로 결정된 마지막 1파에서 라벨링을 재개하므로
    /// 결과는 `label`을 다시 호출한 것과 같습니다.
    ///
    /// # Arguments
    /// * `pivots` - 갱신된 피벗 목록
    ///
    /// # Returns
    /// * `WaveLabeling` - 갱신된 라벨링 결과
    pub fn update(&mut self, pivots: &[Pivot]) -> WaveLabeling {
        let normalized = normalize_pivots(pivots);
        let common = self
            .pivots
            .iter()
            .zip(normalized.iter())
            .take_while(|(old, new)| old == new)
            .count();
        // 양 끝 피벗이 모두 같은 구간만 변경되지 않은 것으로 본다
        let first_changed_leg = common.saturating_sub(1);
        self.pivots = normalized;

        let resume = self
            .arena
            .iter()
            .rposition(|entry| {
                entry.number == WaveNumber::One && entry.decided_by < first_changed_leg
            });

        match resume {
            Some(index) => {
                let entry = self.arena[index];
                trace!(
                    "라벨링 재개: 1파 구간 {} (변경 시작 구간 {})",
                    entry.leg, first_changed_leg
                );
                self.discard_from(index);
                self.walk(entry.leg, entry.decided_by);
            }
            None => {
                self.arena.clear();
                self.last_wave_one = None;
                self.walk(0, 0);
            }
        }

        self.labeling()
    }

    /// 현재 아레나 상태를 파동 목록으로 변환
    pub fn labeling(&self) -> WaveLabeling {
        let waves: Vec<Wave> = self
            .arena
            .iter()
            .map(|entry| self.wave_at(entry))
            .collect();

        if waves.is_empty() {
            return WaveLabeling::empty();
        }

        let current_wave = waves.last().cloned();
        WaveLabeling {
            waves,
            current_wave,
        }
    }

    /// 마지막으로 확정된 1파 (앵커)
    pub fn anchor(&self) -> Option<Wave> {
        self.last_wave_one
            .and_then(|index| self.arena.get(index))
            .map(|entry| self.wave_at(entry))
    }

    fn wave_at(&self, entry: &LabeledLeg) -> Wave {
        Wave::new(
            entry.number,
            &self.pivots[entry.leg],
            &self.pivots[entry.leg + 1],
        )
    }

    fn leg_count(&self) -> usize {
        self.pivots.len().saturating_sub(1)
    }

    fn leg_start(&self, leg: usize) -> f64 {
        self.pivots[leg].price
    }

    fn leg_end(&self, leg: usize) -> f64 {
        self.pivots[leg + 1].price
    }

    fn leg_magnitude(&self, leg: usize) -> f64 {
        (self.leg_end(leg) - self.leg_start(leg)).abs()
    }

    /// 아레나의 `index` 이후를 버리고 1파 캐시를 다시 찾습니다.
    fn discard_from(&mut self, index: usize) {
        self.arena.truncate(index);
        self.last_wave_one = self
            .arena
            .iter()
            .rposition(|entry| entry.number == WaveNumber::One);
    }

    /// `start_leg`에서 새 1파로 시작해 마지막 구간까지 라벨링합니다.
    fn walk(&mut self, start_leg: usize, horizon: usize) {
        let leg_count = self.leg_count();
        let mut leg = start_leg;
        let mut horizon = horizon;
        let mut position = 0;
        let mut anchor = self.arena.len();

        while leg < leg_count {
            horizon = horizon.max(leg);
            let number = WaveNumber::CYCLE[position];

            match self.check_rule(number, anchor, leg) {
                RuleCheck::Accept => {
                    if number == WaveNumber::One {
                        anchor = self.arena.len();
                        self.last_wave_one = Some(anchor);
                    }
                    self.arena.push(LabeledLeg {
                        number,
                        leg,
                        decided_by: horizon,
                    });
                    leg += 1;
                    position = (position + 1) % WaveNumber::CYCLE.len();
                }
                RuleCheck::RestartAt(restart_leg) => {
                    debug!(
                        "{}파 규칙 위반 (구간 {}): 구간 {}에서 새 충격파 시작",
                        number, leg, restart_leg
                    );
                    // 다시 라벨링할 구간만 버리고 앞선 구간의 라벨은 유지한다
                    let keep = self.arena.partition_point(|entry| entry.leg < restart_leg);
                    self.discard_from(keep);
                    anchor = self.arena.len();
                    leg = restart_leg;
                    position = 0;
                }
            }
        }
    }

    /// 구조 규칙 검사
    ///
    /// # Arguments
    /// * `number` - 부여하려는 라벨
    /// * `anchor` - 현재 시도의 1파 아레나 인덱스
    /// * `leg` - 검사할 구간
    fn check_rule(&self, number: WaveNumber, anchor: usize, leg: usize) -> RuleCheck {
        let wave_one_leg = match self.arena.get(anchor) {
            Some(entry) => entry.leg,
            None => return RuleCheck::Accept,
        };

        match number {
            WaveNumber::Two => {
                // 2파는 1파 시작점을 넘어 되돌릴 수 없다
                let start = self.leg_start(wave_one_leg);
                let rising = self.leg_end(wave_one_leg) > start;
                let end = self.leg_end(leg);
                let beyond = if rising { end < start } else { end > start };
                if beyond {
                    RuleCheck::RestartAt(leg)
                } else {
                    RuleCheck::Accept
                }
            }
            WaveNumber::Four => {
                let wave_one = self.wave_at(&self.arena[anchor]);
                let wave_four = Wave::new(number, &self.pivots[leg], &self.pivots[leg + 1]);
                if wave_four.overlaps(&wave_one) {
                    RuleCheck::RestartAt(leg)
                } else {
                    RuleCheck::Accept
                }
            }
            WaveNumber::Five => {
                let m1 = self.leg_magnitude(wave_one_leg);
                let m3 = self.leg_magnitude(wave_one_leg + 2);
                let m5 = self.leg_magnitude(leg);
                if m3 < m1 && m3 < m5 {
                    RuleCheck::RestartAt(wave_one_leg + 1)
                } else {
                    RuleCheck::Accept
                }
            }
            _ => RuleCheck::Accept,
        }
    }
}

/// 피벗 목록에 엘리엇 파동 라벨을 부여합니다.
///
/// # Arguments
/// * `pivots` - 시간 순서의 피벗 목록
///
/// # Returns
/// * `WaveLabeling` - 피벗이 2개 미만이면 빈 결과
pub fn label_waves(pivots: &[Pivot]) -> WaveLabeling {
    WaveLabeler::new().label(pivots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag(prices: &[f64]) -> Vec<Pivot> {
        let rising = prices.len() > 1 && prices[1] > prices[0];
        prices
            .iter()
            .enumerate()
            .map(|(i, price)| {
                let is_low = (i % 2 == 0) == rising;
                if is_low {
                    Pivot::low(i as i64, *price)
                } else {
                    Pivot::high(i as i64, *price)
                }
            })
            .collect()
    }

    fn numbers(labeling: &WaveLabeling) -> Vec<WaveNumber> {
        labeling.waves.iter().map(|w| w.number).collect()
    }

    #[test]
    fn test_fewer_than_two_pivots() {
        assert_eq!(label_waves(&[]), WaveLabeling::empty());
        assert_eq!(label_waves(&[Pivot::low(0, 1.0)]), WaveLabeling::empty());
    }

    #[test]
    fn test_wave_two_beyond_start_restarts() {
        // 2파가 1파 시작(100) 아래로 내려가면 그 구간이 하락 1파가 된다
        let labeling = label_waves(&zigzag(&[100.0, 120.0, 95.0, 105.0]));
        assert_eq!(
            numbers(&labeling),
            vec![WaveNumber::One, WaveNumber::One, WaveNumber::Two]
        );
        assert_eq!(labeling.waves[1].start_price, 120.0);
        assert_eq!(labeling.trend(), Some(Trend::Bearish));
    }

    #[test]
    fn test_wave_four_overlap_restarts() {
        let labeling = label_waves(&zigzag(&[100.0, 120.0, 110.0, 135.0, 118.0]));
        // 118은 1파 고점(120) 아래: 4파 불가, 마지막 구간이 새 1파
        assert_eq!(
            numbers(&labeling),
            vec![
                WaveNumber::One,
                WaveNumber::Two,
                WaveNumber::Three,
                WaveNumber::One
            ]
        );
        assert_eq!(labeling.waves[3].start_price, 135.0);
    }

    #[test]
    fn test_shortest_wave_three_restarts_after_wave_one() {
        // 3파(8)가 1파(10)와 5파(14)보다 짧다
        let labeling = label_waves(&zigzag(&[100.0, 110.0, 105.0, 113.0, 111.0, 125.0]));
        assert_eq!(
            numbers(&labeling),
            vec![
                WaveNumber::One,
                WaveNumber::One,
                WaveNumber::One,
                WaveNumber::Two,
                WaveNumber::Three
            ]
        );
        let starts: Vec<f64> = labeling.waves.iter().map(|w| w.start_price).collect();
        assert_eq!(starts, vec![100.0, 110.0, 105.0, 113.0, 111.0]);
    }

    #[test]
    fn test_anchor_tracks_latest_wave_one() {
        let mut labeler = WaveLabeler::new();
        labeler.label(&zigzag(&[
            100.0, 120.0, 110.0, 135.0, 125.0, 145.0, 130.0, 140.0, 120.0, 150.0,
        ]));
        let anchor = labeler.anchor().unwrap();
        assert_eq!(anchor.number, WaveNumber::One);
        assert_eq!(anchor.start_price, 120.0);
        assert_eq!(anchor.end_price, 150.0);
    }
}
