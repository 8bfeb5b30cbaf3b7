//! 분석 캐시
//!
//! 키-값 저장소(`CacheStore`) 위에 TTL 정책을 얹은 타입별 캐시를 제공합니다.
//! 저장소 구현은 메모리와 SQLite 두 가지이며 같은 인터페이스로 교체할 수 있습니다.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;

use crate::clock::Clock;
use crate::error::CacheResult;
use crate::model::{PricePoint, WaveAnalysisResult};
use async_trait::async_trait;
use log::trace;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

/// 파동 분석 결과 네임스페이스
pub const ANALYSIS_NAMESPACE: &str = "wave";
/// 과거 시계열 네임스페이스
pub const SERIES_NAMESPACE: &str = "series";

/// 저장소에 기록된 값과 기록 시각
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub payload: String,
    /// 기록 시각 (epoch 밀리초)
    pub stored_at: i64,
}

/// 키-값 캐시 저장소
///
/// TTL 판단은 하지 않고 기록 시각만 함께 보관합니다.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 키의 값 조회
    async fn get(&self, key: &str) -> CacheResult<Option<StoredValue>>;

    /// 키의 값 기록 (항상 덮어씀)
    async fn put(&self, key: &str, value: StoredValue) -> CacheResult<()>;

    /// 키 삭제
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// 접두어로 시작하는 모든 키 삭제
    ///
    /// # Returns
    /// * `CacheResult<usize>` - 삭제된 키 수
    async fn delete_prefix(&self, prefix: &str) -> CacheResult<usize>;
}

/// (심볼, 타임프레임) 캐시 키
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: String,
}

impl CacheKey {
    pub fn new(symbol: &str, timeframe: &str) -> Self {
        CacheKey {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
        }
    }

    /// 저장소 키 `{namespace}:{symbol}:{timeframe}`
    ///
    /// 심볼과 타임프레임의 `%`, `:`는 퍼센트 인코딩되어 구분자와 섞이지 않습니다.
    fn storage_key(&self, namespace: &str) -> String {
        format!(
            "{namespace}:{}:{}",
            escape_key_part(&self.symbol),
            escape_key_part(&self.timeframe)
        )
    }
}

fn escape_key_part(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.symbol, self.timeframe)
    }
}

/// 캐시 항목
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub key: CacheKey,
    pub payload: T,
    pub stored_at: i64,
}

/// TTL 기반 타입별 캐시
///
/// 만료 여부는 조회 시점에만 판단하며, 만료된 값은 덮어쓰거나 무효화할 때까지
/// 저장소에 남아 있습니다.
pub struct TtlCache<T> {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    namespace: &'static str,
    ttl_ms: i64,
    _payload: PhantomData<fn() -> T>,
}

/// 파동 분석 결과 캐시
pub type AnalysisCache = TtlCache<WaveAnalysisResult>;

/// 과거 시계열 캐시
pub type SeriesCache = TtlCache<Vec<PricePoint>>;

impl<T> TtlCache<T>
where
    T: Serialize + DeserializeOwned,
{
    /// 새 캐시 생성
    ///
    /// # Arguments
    /// * `store` - 키-값 저장소
    /// * `clock` - 시각 공급자
    /// * `namespace` - 저장소 키 접두어
    /// * `ttl_ms` - 유효 기간 (밀리초)
    pub fn new(
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        namespace: &'static str,
        ttl_ms: i64,
    ) -> Self {
        TtlCache {
            store,
            clock,
            namespace,
            ttl_ms,
            _payload: PhantomData,
        }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// 기록 시각 기준 만료 여부 (`now - stored_at > ttl`)
    pub fn is_stale(&self, stored_at: i64) -> bool {
        self.clock.now_ms() - stored_at > self.ttl_ms
    }

    /// 유효한 값 조회
    ///
    /// # Arguments
    /// * `symbol` - 심볼
    /// * `timeframe` - 타임프레임
    /// * `force_refresh` - true면 TTL과 무관하게 항상 없음으로 응답
    ///
    /// # Returns
    /// * `CacheResult<Option<T>>` - 없거나 만료되었으면 None
    pub async fn get(
        &self,
        symbol: &str,
        timeframe: &str,
        force_refresh: bool,
    ) -> CacheResult<Option<T>> {
        if force_refresh {
            return Ok(None);
        }

        let Some(entry) = self.get_entry(symbol, timeframe).await? else {
            return Ok(None);
        };

        if self.is_stale(entry.stored_at) {
            trace!("캐시 만료: {} ({})", entry.key, self.namespace);
            return Ok(None);
        }

        Ok(Some(entry.payload))
    }

    /// TTL을 무시하고 저장된 항목 조회
    pub async fn get_entry(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> CacheResult<Option<CacheEntry<T>>> {
        let key = CacheKey::new(symbol, timeframe);
        let Some(stored) = self.store.get(&key.storage_key(self.namespace)).await? else {
            return Ok(None);
        };

        let payload: T = serde_json::from_str(&stored.payload)?;
        Ok(Some(CacheEntry {
            key,
            payload,
            stored_at: stored.stored_at,
        }))
    }

    /// 값 기록 (기존 값은 덮어씀)
    pub async fn put(&self, symbol: &str, timeframe: &str, value: &T) -> CacheResult<()> {
        let key = CacheKey::new(symbol, timeframe);
        let stored = StoredValue {
            payload: serde_json::to_string(value)?,
            stored_at: self.clock.now_ms(),
        };
        self.store
            .put(&key.storage_key(self.namespace), stored)
            .await
    }

    /// 단일 키 무효화
    pub async fn invalidate(&self, symbol: &str, timeframe: &str) -> CacheResult<()> {
        let key = CacheKey::new(symbol, timeframe);
        self.store.delete(&key.storage_key(self.namespace)).await
    }

    /// 이 캐시의 모든 키 무효화
    ///
    /// # Returns
    /// * `CacheResult<usize>` - 삭제된 항목 수
    pub async fn invalidate_all(&self) -> CacheResult<usize> {
        self.store
            .delete_prefix(&format!("{}:", self.namespace))
            .await
    }
}
