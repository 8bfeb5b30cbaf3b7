use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

/// 정규화된 OHLCV 가격 데이터
///
/// `timestamp`는 항상 epoch 밀리초입니다. 다른 단위는 `series` 모듈의
/// 정규화 경계에서만 허용됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    /// 새 가격 데이터 생성
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        PricePoint {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// 피벗 종류 (고점/저점)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    /// 반대 종류 반환
    pub fn opposite(self) -> PivotKind {
        match self {
            PivotKind::High => PivotKind::Low,
            PivotKind::Low => PivotKind::High,
        }
    }
}

/// 확정된 국소 고점 또는 저점
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub timestamp: i64,
    pub price: f64,
    pub kind: PivotKind,
}

impl Pivot {
    pub fn new(timestamp: i64, price: f64, kind: PivotKind) -> Self {
        Pivot {
            timestamp,
            price,
            kind,
        }
    }

    pub fn high(timestamp: i64, price: f64) -> Self {
        Pivot::new(timestamp, price, PivotKind::High)
    }

    pub fn low(timestamp: i64, price: f64) -> Self {
        Pivot::new(timestamp, price, PivotKind::Low)
    }
}

/// 파동 번호
///
/// 충격 파동 1~5 이후 조정 파동 A~C가 이어지는 한 사이클을 표현합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveNumber {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    A,
    B,
    C,
}

impl WaveNumber {
    /// 한 사이클의 라벨 순서
    pub const CYCLE: [WaveNumber; 8] = [
        WaveNumber::One,
        WaveNumber::Two,
        WaveNumber::Three,
        WaveNumber::Four,
        WaveNumber::Five,
        WaveNumber::A,
        WaveNumber::B,
        WaveNumber::C,
    ];

    /// 번호로부터 유도되는 파동 타입
    ///
    /// 홀수 번호와 A/C는 충격형, 짝수 번호와 B는 조정형입니다.
    pub fn wave_type(self) -> WaveType {
        match self {
            WaveNumber::One
            | WaveNumber::Three
            | WaveNumber::Five
            | WaveNumber::A
            | WaveNumber::C => WaveType::Impulse,
            WaveNumber::Two | WaveNumber::Four | WaveNumber::B => WaveType::Corrective,
        }
    }

    /// 사이클 내 위치 (0부터 시작)
    pub fn position(self) -> usize {
        match self {
            WaveNumber::One => 0,
            WaveNumber::Two => 1,
            WaveNumber::Three => 2,
            WaveNumber::Four => 3,
            WaveNumber::Five => 4,
            WaveNumber::A => 5,
            WaveNumber::B => 6,
            WaveNumber::C => 7,
        }
    }

    /// 1~5 충격 구간에 속하는지 확인
    pub fn is_motive_phase(self) -> bool {
        self.position() < 5
    }
}

impl Display for WaveNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaveNumber::One => write!(f, "1"),
            WaveNumber::Two => write!(f, "2"),
            WaveNumber::Three => write!(f, "3"),
            WaveNumber::Four => write!(f, "4"),
            WaveNumber::Five => write!(f, "5"),
            WaveNumber::A => write!(f, "A"),
            WaveNumber::B => write!(f, "B"),
            WaveNumber::C => write!(f, "C"),
        }
    }
}

/// 파동 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveType {
    /// 추세 방향 파동 (1, 3, 5, A, C)
    Impulse,
    /// 역추세 파동 (2, 4, B)
    Corrective,
}

/// 라벨이 붙은 파동 구간
///
/// `wave_type`은 `number`에서 유도된 값을 캐시한 것이며 항상 일치해야 합니다.
/// 현재 진행 중인 파동의 끝 값은 확정된 반전이 아닌 최신 극값입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub number: WaveNumber,
    pub wave_type: WaveType,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub start_price: f64,
    pub end_price: f64,
}

impl Wave {
    /// 두 피벗 사이의 파동 생성
    pub fn new(number: WaveNumber, start: &Pivot, end: &Pivot) -> Self {
        Wave {
            number,
            wave_type: number.wave_type(),
            start_timestamp: start.timestamp,
            end_timestamp: end.timestamp,
            start_price: start.price,
            end_price: end.price,
        }
    }

    /// 파동 크기 (|끝 - 시작|)
    pub fn magnitude(&self) -> f64 {
        (self.end_price - self.start_price).abs()
    }

    /// 상승 파동인지 확인
    pub fn is_rising(&self) -> bool {
        self.end_price > self.start_price
    }

    /// 파동이 차지하는 가격 범위 (저가, 고가)
    pub fn price_range(&self) -> (f64, f64) {
        (
            self.start_price.min(self.end_price),
            self.start_price.max(self.end_price),
        )
    }

    /// 두 파동의 가격 범위가 겹치는지 확인 (경계 접촉 포함)
    pub fn overlaps(&self, other: &Wave) -> bool {
        let (lo, hi) = self.price_range();
        let (other_lo, other_hi) = other.price_range();
        lo <= other_hi && other_lo <= hi
    }

    /// 번호와 타입이 일치하는지 확인
    pub fn is_consistent(&self) -> bool {
        self.wave_type == self.number.wave_type()
    }
}

impl Display for Wave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Wave({}, {:.4} -> {:.4})",
            self.number, self.start_price, self.end_price
        )
    }
}

/// 피보나치 목표가
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibTarget {
    pub label: String,
    pub price: f64,
    pub is_extension: bool,
}

/// 추세 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl Trend {
    /// 구간 방향으로부터 추세 결정
    pub fn from_direction(rising: bool) -> Trend {
        if rising { Trend::Bullish } else { Trend::Bearish }
    }
}

impl Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Bullish => write!(f, "bullish"),
            Trend::Bearish => write!(f, "bearish"),
        }
    }
}

/// 한 번의 전체 파이프라인 실행 결과
///
/// 캐시에 기록된 이후에는 수정되지 않고, 다음 실행 결과로 대체됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveAnalysisResult {
    pub symbol: String,
    pub timeframe: String,
    pub waves: Vec<Wave>,
    pub current_wave: Wave,
    pub fib_targets: Vec<FibTarget>,
    pub trend: Trend,
    /// 계산 시각 (epoch 밀리초)
    pub computed_at: i64,
}

impl Display for WaveAnalysisResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WaveAnalysis({} {}, waves={}, current={}, trend={})",
            self.symbol,
            self.timeframe,
            self.waves.len(),
            self.current_wave.number,
            self.trend
        )
    }
}
