pub mod analyzer;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod projection;
pub mod provider;
pub mod refresh;
pub mod series;
pub mod service;

/// 설정 로더
pub mod config_loader;

pub use analyzer::{WaveAnalyzer, WaveLabeler, compute_fib_targets, extract_pivots, label_waves};
pub use cache::{AnalysisCache, CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use config::EngineConfig;
pub use error::{AnalysisError, CacheError, ProviderError, SeriesError};
pub use events::AnalysisEvent;
pub use model::{
    FibTarget, Pivot, PivotKind, PricePoint, Trend, Wave, WaveAnalysisResult, WaveNumber, WaveType,
};
pub use provider::{JsonFileProvider, SeriesProvider};
pub use refresh::{BatchRefreshCoordinator, RefreshOptions, RefreshReport};
pub use service::WaveAnalysisService;
