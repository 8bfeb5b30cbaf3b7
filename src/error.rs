//! 엔진 전역 오류 타입

use thiserror::Error;

/// 시계열 입력 오류
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("시계열이 비어 있습니다")]
    Empty,

    #[error("타임스탬프가 오름차순이 아닙니다: index {index} ({previous} -> {current})")]
    NonMonotonic {
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("잘못된 가격 데이터: index {index} - {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("타임스탬프 해석 실패: {0}")]
    Timestamp(String),
}

/// 외부 시계열 공급자 오류
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("시계열 조회 실패: {0}")]
    Fetch(String),

    #[error("시계열을 찾을 수 없습니다: {symbol} {timeframe}")]
    NotFound { symbol: String, timeframe: String },

    #[error("IO 오류: {0}")]
    Io(#[from] std::io::Error),

    #[error("시계열 파싱 실패: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("시계열 정규화 실패: {0}")]
    Series(#[from] SeriesError),
}

/// 캐시 저장소 오류
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite 오류: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("직렬화 오류: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("손상된 캐시 항목: {0}")]
    Corrupted(String),

    #[error("저장소 작업 실패: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// 분석 파이프라인 오류
///
/// 모두 "해당 키에 대한 분석 없음"으로 취급되며 프로세스를 중단시키지 않습니다.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("입력 시계열 오류: {0}")]
    Series(#[from] SeriesError),

    #[error("공급자 오류: {0}")]
    Provider(#[from] ProviderError),

    #[error("데이터가 부족합니다: {len}개")]
    InsufficientData { len: usize },

    #[error("파동 패턴이 감지되지 않았습니다 (피벗 {pivots}개)")]
    NoPattern { pivots: usize },
}

pub type SeriesResult<T> = Result<T, SeriesError>;
pub type ProviderResult<T> = Result<T, ProviderError>;
pub type CacheResult<T> = Result<T, CacheError>;
pub type AnalysisResult<T> = Result<T, AnalysisError>;
