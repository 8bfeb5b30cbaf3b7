use crate::error::{SeriesError, SeriesResult};
use crate::model::PricePoint;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// 이 값보다 작은 정수 타임스탬프는 초 단위로 해석합니다 (서기 5138년 이전).
const SECONDS_CUTOFF: i64 = 100_000_000_000;

/// 수집 단계의 원시 타임스탬프
///
/// 외부에서 들어오는 초/밀리초/문자열 표현을 받아 밀리초로 정규화합니다.
/// 이 타입은 정규화 경계 밖으로 나가지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawTimestamp {
    /// epoch 밀리초로 변환
    ///
    /// # Returns
    /// * `SeriesResult<i64>` - 밀리초 타임스탬프 또는 해석 오류
    pub fn to_millis(&self) -> SeriesResult<i64> {
        match self {
            RawTimestamp::Integer(value) => Ok(integer_to_millis(*value)),
            RawTimestamp::Float(value) => {
                if !value.is_finite() {
                    return Err(SeriesError::Timestamp(format!("유한하지 않은 값: {value}")));
                }
                if value.abs() < SECONDS_CUTOFF as f64 {
                    Ok((value * 1000.0).round() as i64)
                } else {
                    Ok(value.round() as i64)
                }
            }
            RawTimestamp::Text(text) => parse_text_timestamp(text),
        }
    }
}

fn integer_to_millis(value: i64) -> i64 {
    if value.abs() < SECONDS_CUTOFF {
        value * 1000
    } else {
        value
    }
}

fn parse_text_timestamp(text: &str) -> SeriesResult<i64> {
    let trimmed = text.trim();

    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(integer_to_millis(value));
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.timestamp_millis());
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(datetime.and_utc().timestamp_millis());
        }
    }

    Err(SeriesError::Timestamp(format!("지원되지 않는 형식: {trimmed}")))
}

/// 정규화 전의 OHLCV 데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPricePoint {
    pub timestamp: RawTimestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl RawPricePoint {
    /// 정규화된 가격 데이터로 변환
    pub fn normalize(&self) -> SeriesResult<PricePoint> {
        Ok(PricePoint {
            timestamp: self.timestamp.to_millis()?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume.max(0.0).round() as u64,
        })
    }
}

/// 원시 데이터를 정규화하고 검증된 시계열을 생성합니다.
///
/// # Arguments
/// * `raw` - 수집된 원시 데이터 (시간 오름차순)
///
/// # Returns
/// * `SeriesResult<PriceSeries>` - 검증된 시계열 또는 입력 오류
pub fn normalize_series(raw: &[RawPricePoint]) -> SeriesResult<PriceSeries> {
    let points = raw
        .iter()
        .map(RawPricePoint::normalize)
        .collect::<SeriesResult<Vec<_>>>()?;
    PriceSeries::new(points)
}

/// 검증된 가격 시계열
///
/// 비어 있지 않고, 타임스탬프가 엄격한 오름차순이며, 모든 가격이 유한하고
/// `high >= low`인 데이터만 보관합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    items: Vec<PricePoint>,
}

impl PriceSeries {
    /// 새 시계열 생성
    ///
    /// # Arguments
    /// * `items` - 시간 오름차순 가격 데이터
    ///
    /// # Returns
    /// * `SeriesResult<PriceSeries>` - 검증된 시계열 또는 입력 오류
    pub fn new(items: Vec<PricePoint>) -> SeriesResult<PriceSeries> {
        if items.is_empty() {
            return Err(SeriesError::Empty);
        }

        for (index, point) in items.iter().enumerate() {
            validate_bar(index, point)?;
        }

        for (index, pair) in items.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NonMonotonic {
                    index: index + 1,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }

        Ok(PriceSeries { items })
    }

    /// 데이터 수
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 항상 false (빈 시계열은 생성되지 않음)
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 가장 오래된 데이터
    pub fn first(&self) -> Option<&PricePoint> {
        self.items.first()
    }

    /// 가장 최근 데이터
    pub fn last(&self) -> Option<&PricePoint> {
        self.items.last()
    }

    /// 시간 순서대로 정렬된 데이터 슬라이스
    pub fn items(&self) -> &[PricePoint] {
        &self.items
    }

    pub fn into_inner(self) -> Vec<PricePoint> {
        self.items
    }
}

fn validate_bar(index: usize, point: &PricePoint) -> SeriesResult<()> {
    let prices = [point.open, point.high, point.low, point.close];
    if prices.iter().any(|p| !p.is_finite()) {
        return Err(SeriesError::InvalidBar {
            index,
            reason: "유한하지 않은 가격".to_string(),
        });
    }
    if point.high < point.low {
        return Err(SeriesError::InvalidBar {
            index,
            reason: format!("고가({})가 저가({})보다 낮습니다", point.high, point.low),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(timestamp: RawTimestamp, price: f64) -> RawPricePoint {
        RawPricePoint {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 10.0,
        }
    }

    #[test]
    fn test_seconds_and_millis_normalize_to_same_instant() {
        let seconds = RawTimestamp::Integer(1_700_000_000);
        let millis = RawTimestamp::Integer(1_700_000_000_000);
        assert_eq!(seconds.to_millis().unwrap(), millis.to_millis().unwrap());
    }

    #[test]
    fn test_text_timestamps() {
        let iso = RawTimestamp::Text("2023-11-14T22:13:20Z".to_string());
        assert_eq!(iso.to_millis().unwrap(), 1_700_000_000_000);

        let date = RawTimestamp::Text("1970-01-02".to_string());
        assert_eq!(date.to_millis().unwrap(), 86_400_000);

        let numeric = RawTimestamp::Text("1700000000".to_string());
        assert_eq!(numeric.to_millis().unwrap(), 1_700_000_000_000);

        let garbage = RawTimestamp::Text("어제".to_string());
        assert!(matches!(garbage.to_millis(), Err(SeriesError::Timestamp(_))));
    }

    #[test]
    fn test_untagged_deserialization() {
        let json = r#"[
            {"timestamp": 1700000000, "open": 1, "high": 2, "low": 0.5, "close": 1.5},
            {"timestamp": "2023-11-14T22:14:20Z", "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 3.6}
        ]"#;
        let raw: Vec<RawPricePoint> = serde_json::from_str(json).unwrap();
        let series = normalize_series(&raw).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.items()[1].timestamp - series.items()[0].timestamp, 60_000);
        assert_eq!(series.items()[1].volume, 4);
    }

    #[test]
    fn test_rejects_empty_and_unordered() {
        assert_eq!(PriceSeries::new(vec![]), Err(SeriesError::Empty));

        let unordered = vec![
            raw(RawTimestamp::Integer(2), 1.0),
            raw(RawTimestamp::Integer(1), 1.0),
        ];
        assert!(matches!(
            normalize_series(&unordered),
            Err(SeriesError::NonMonotonic { index: 1, .. })
        ));

        let duplicated = vec![
            raw(RawTimestamp::Integer(1), 1.0),
            raw(RawTimestamp::Integer(1), 1.0),
        ];
        assert!(normalize_series(&duplicated).is_err());
    }

    #[test]
    fn test_rejects_inverted_bar() {
        let bar = PricePoint::new(0, 1.0, 1.0, 2.0, 1.0, 0);
        assert!(matches!(
            PriceSeries::new(vec![bar]),
            Err(SeriesError::InvalidBar { index: 0, .. })
        ));
    }
}
