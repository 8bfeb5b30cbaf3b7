//! 과거 시계열 공급자

use crate::error::{ProviderError, ProviderResult};
use crate::model::PricePoint;
use crate::series::{RawPricePoint, normalize_series};
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};

/// 과거 가격 시계열 공급자
///
/// 오류와 빈 시계열은 모두 "분석 불가"로 처리됩니다.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// 심볼/타임프레임의 과거 시계열 조회
    ///
    /// # Arguments
    /// * `symbol` - 심볼
    /// * `timeframe` - 타임프레임 (예: "1d", "4h")
    ///
    /// # Returns
    /// * `ProviderResult<Vec<PricePoint>>` - 타임스탬프 오름차순 시계열
    async fn fetch_series(&self, symbol: &str, timeframe: &str)
    -> ProviderResult<Vec<PricePoint>>;
}

/// JSON 파일 기반 공급자
///
/// `<dir>/<SYMBOL>_<timeframe>.json` 파일에서 `RawPricePoint` 배열을 읽습니다.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    dir: PathBuf,
}

impl JsonFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileProvider { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 심볼/타임프레임에 해당하는 파일 경로
    pub fn path_for(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.dir.join(format!("{symbol}_{timeframe}.json"))
    }
}

#[async_trait]
impl SeriesProvider for JsonFileProvider {
    async fn fetch_series(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> ProviderResult<Vec<PricePoint>> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let raw: Vec<RawPricePoint> = serde_json::from_str(&content)?;
        let series = normalize_series(&raw)?;
        debug!("{} 로드: {}개 캔들", path.display(), series.len());
        Ok(series.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_and_normalizes_seconds() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("BTC_1d.json"),
            r#"[
                {"timestamp": 1700000000, "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 10},
                {"timestamp": "2023-11-15T22:13:20Z", "open": 1.5, "high": 3, "low": 1, "close": 2.5}
            ]"#,
        )
        .unwrap();

        let provider = JsonFileProvider::new(dir.path());
        let series = provider.fetch_series("BTC", "1d").await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].timestamp, 1_700_000_000_000);
        assert_eq!(series[1].timestamp, 1_700_086_400_000);
        assert_eq!(series[1].volume, 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let provider = JsonFileProvider::new(dir.path());
        assert!(matches!(
            provider.fetch_series("ETH", "4h").await,
            Err(ProviderError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsorted_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("SOL_1h.json"),
            r#"[
                {"timestamp": 2000, "open": 1, "high": 1, "low": 1, "close": 1},
                {"timestamp": 1000, "open": 1, "high": 1, "low": 1, "close": 1}
            ]"#,
        )
        .unwrap();
        let provider = JsonFileProvider::new(dir.path());
        assert!(matches!(
            provider.fetch_series("SOL", "1h").await,
            Err(ProviderError::Series(_))
        ));
    }
}
