//! SQLite 영속 저장소
//!
//! 큰 값은 `chunk_size` 바이트 단위로 여러 행에 나누어 저장합니다.
//! 조각 하나라도 빠진 항목은 없는 것으로 취급하고 정리합니다.

use crate::cache::{CacheStore, StoredValue};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Arc;

/// 기본 조각 크기 (바이트)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cache_chunks (
        key TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        chunk_count INTEGER NOT NULL,
        data TEXT NOT NULL,
        stored_at INTEGER NOT NULL,
        PRIMARY KEY (key, chunk_index)
    );
";

/// SQLite 기반 캐시 저장소
///
/// 쿼리는 모두 `spawn_blocking` 스레드에서 실행되어 런타임 스레드를 막지 않습니다.
pub struct SqliteCacheStore {
    conn: Arc<Mutex<Connection>>,
    chunk_size: usize,
}

impl SqliteCacheStore {
    /// 파일 데이터베이스 열기
    pub fn open(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn)
    }

    /// 메모리 데이터베이스 열기
    pub fn open_in_memory() -> CacheResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> CacheResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteCacheStore {
            conn: Arc::new(Mutex::new(conn)),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// 조각 크기 지정 (최소 4바이트)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(4);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 키에 저장된 조각 수
    pub async fn chunk_count(&self, key: &str) -> CacheResult<usize> {
        let key = key.to_string();
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM cache_chunks WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }

    /// 연결을 잠그고 블로킹 스레드에서 작업 실행
    async fn run<T, F>(&self, task: F) -> CacheResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> CacheResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            task(&mut *conn)
        })
        .await?
    }
}

fn read_chunks(conn: &Connection, key: &str) -> CacheResult<Option<StoredValue>> {
    let mut stmt = conn.prepare(
        "SELECT chunk_index, chunk_count, data, stored_at
         FROM cache_chunks WHERE key = ?1 ORDER BY chunk_index",
    )?;
    let rows = stmt
        .query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let Some((expected, stored_at)) = rows.first().map(|(_, count, _, at)| (*count, *at)) else {
        return Ok(None);
    };

    let complete = rows.len() as i64 == expected
        && rows.iter().enumerate().all(|(position, (index, count, _, at))| {
            *index == position as i64 && *count == expected && *at == stored_at
        });
    if !complete {
        return Err(CacheError::Corrupted(format!(
            "{key}: 조각 {}/{}개",
            rows.len(),
            expected
        )));
    }

    let payload: String = rows.into_iter().map(|(_, _, data, _)| data).collect();
    Ok(Some(StoredValue { payload, stored_at }))
}

fn write_chunks(
    conn: &mut Connection,
    key: &str,
    value: &StoredValue,
    chunk_size: usize,
) -> CacheResult<()> {
    let chunks = split_chunks(&value.payload, chunk_size);
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM cache_chunks WHERE key = ?1", params![key])?;
    for (index, chunk) in chunks.iter().enumerate() {
        tx.execute(
            "INSERT INTO cache_chunks (key, chunk_index, chunk_count, data, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                index as i64,
                chunks.len() as i64,
                chunk,
                value.stored_at
            ],
        )?;
    }
    tx.commit()?;

    if chunks.len() > 1 {
        debug!("{} 저장: {}개 조각", key, chunks.len());
    }
    Ok(())
}

fn delete_key(conn: &Connection, key: &str) -> CacheResult<()> {
    conn.execute("DELETE FROM cache_chunks WHERE key = ?1", params![key])?;
    Ok(())
}

/// 문자 경계를 지키며 최대 `size` 바이트 조각으로 분할
///
/// 빈 문자열도 조각 하나로 저장합니다.
fn split_chunks(payload: &str, size: usize) -> Vec<&str> {
    if payload.is_empty() {
        return vec![payload];
    }

    let mut chunks = Vec::with_capacity(payload.len() / size + 1);
    let mut start = 0;
    while start < payload.len() {
        let mut end = (start + size).min(payload.len());
        while !payload.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // 조각 크기보다 긴 문자 하나
            end = start
                + payload[start..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
        }
        chunks.push(&payload[start..end]);
        start = end;
    }
    chunks
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<StoredValue>> {
        let key = key.to_string();
        self.run(move |conn| match read_chunks(conn, &key) {
            Err(CacheError::Corrupted(reason)) => {
                warn!("손상된 캐시 항목 제거: {}", reason);
                delete_key(conn, &key)?;
                Ok(None)
            }
            other => other,
        })
        .await
    }

    async fn put(&self, key: &str, value: StoredValue) -> CacheResult<()> {
        let key = key.to_string();
        let chunk_size = self.chunk_size;
        self.run(move |conn| write_chunks(conn, &key, &value, chunk_size))
            .await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = key.to_string();
        self.run(move |conn| delete_key(conn, &key)).await
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<usize> {
        let prefix = prefix.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let keys: i64 = tx.query_row(
                "SELECT COUNT(DISTINCT key) FROM cache_chunks
                 WHERE substr(key, 1, length(?1)) = ?1",
                params![prefix],
                |row| row.get(0),
            )?;
            tx.execute(
                "DELETE FROM cache_chunks WHERE substr(key, 1, length(?1)) = ?1",
                params![prefix],
            )?;
            tx.commit()?;
            Ok(keys as usize)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn value(payload: &str, stored_at: i64) -> StoredValue {
        StoredValue {
            payload: payload.to_string(),
            stored_at,
        }
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let chunks = split_chunks("가나다abc", 4);
        assert!(chunks.iter().all(|c| c.len() <= 4));
        assert_eq!(chunks.concat(), "가나다abc");
        assert_eq!(split_chunks("", 8), vec![""]);
    }

    #[tokio::test]
    async fn test_large_payload_is_chunked_transparently() {
        let store = SqliteCacheStore::open_in_memory().unwrap().with_chunk_size(16);
        let payload = "x".repeat(100);
        store.put("wave:A:1d", value(&payload, 7)).await.unwrap();

        assert_eq!(store.chunk_count("wave:A:1d").await.unwrap(), 7);
        assert_eq!(store.get("wave:A:1d").await.unwrap(), Some(value(&payload, 7)));

        // 더 짧은 값으로 덮어쓰면 남은 조각이 없어야 한다
        store.put("wave:A:1d", value("short", 8)).await.unwrap();
        assert_eq!(store.chunk_count("wave:A:1d").await.unwrap(), 1);
        assert_eq!(store.get("wave:A:1d").await.unwrap(), Some(value("short", 8)));
    }

    #[tokio::test]
    async fn test_missing_chunk_reads_as_absent() {
        let store = SqliteCacheStore::open_in_memory().unwrap().with_chunk_size(8);
        store.put("k", value(&"y".repeat(40), 1)).await.unwrap();
        store
            .conn
            .lock()
            .execute(
                "DELETE FROM cache_chunks WHERE key = 'k' AND chunk_index = 2",
                [],
            )
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.chunk_count("k").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        {
            let store = SqliteCacheStore::open(&path).unwrap();
            store.put("wave:A:1d", value("a", 1)).await.unwrap();
            store.put("wave:B:1d", value("b", 1)).await.unwrap();
            store.put("series:A:1d", value("c", 1)).await.unwrap();
        }

        let store = SqliteCacheStore::open(&path).unwrap();
        assert_eq!(store.get("wave:B:1d").await.unwrap(), Some(value("b", 1)));
        assert_eq!(store.delete_prefix("wave:").await.unwrap(), 2);
        assert_eq!(store.get("wave:A:1d").await.unwrap(), None);
        assert!(store.get("series:A:1d").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_writes_on_one_runtime_thread() {
        let store = Arc::new(SqliteCacheStore::open_in_memory().unwrap().with_chunk_size(8));
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("wave:S{i}:1d");
                store.put(&key, value(&"z".repeat(30 + i), i as i64)).await.unwrap();
                store.get(&key).await.unwrap()
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let stored = handle.await.unwrap().unwrap();
            assert_eq!(stored, value(&"z".repeat(30 + i), i as i64));
        }
        assert_eq!(store.delete_prefix("wave:").await.unwrap(), 8);
    }
}
