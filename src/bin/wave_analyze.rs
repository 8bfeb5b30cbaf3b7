use log::{debug, error, info, warn};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use wave_analysis::cache::CacheStore;
use wave_analysis::clock::SystemClock;
use wave_analysis::config_loader::{ConfigFormat, ConfigLoader};
use wave_analysis::projection::summarize;
use wave_analysis::{
    BatchRefreshCoordinator, EngineConfig, JsonFileProvider, MemoryCacheStore, RefreshOptions,
    SqliteCacheStore, WaveAnalysisService,
};

/// 설정 파일 경로 환경 변수
const CONFIG_ENV: &str = "WAVE_CONFIG";
/// SQLite 캐시 경로 환경 변수 (없으면 메모리 캐시)
const CACHE_DB_ENV: &str = "WAVE_CACHE_DB";
/// 설정된 주기로 계속 갱신하는 감시 모드 플래그
const WATCH_FLAG: &str = "--watch";

fn load_config() -> EngineConfig {
    let Ok(path) = env::var(CONFIG_ENV) else {
        debug!("기본 엔진 설정 사용");
        return EngineConfig::default();
    };

    match ConfigLoader::load_from_file::<EngineConfig>(&PathBuf::from(&path), ConfigFormat::Auto)
    {
        Ok(config) => {
            info!("엔진 설정 로드: {}", path);
            config
        }
        Err(e) => {
            warn!("엔진 설정 로드 실패, 기본값 사용: {}", e);
            EngineConfig::default()
        }
    }
}

fn open_store() -> Arc<dyn CacheStore> {
    let Ok(path) = env::var(CACHE_DB_ENV) else {
        return Arc::new(MemoryCacheStore::new());
    };

    match SqliteCacheStore::open(&PathBuf::from(&path)) {
        Ok(store) => {
            info!("SQLite 캐시 사용: {}", path);
            Arc::new(store)
        }
        Err(e) => {
            warn!("SQLite 캐시 열기 실패, 메모리 캐시 사용: {}", e);
            Arc::new(MemoryCacheStore::new())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // 로그 초기화
    env_logger::init();

    let mut args: Vec<String> = env::args().collect();
    debug!("커맨드 라인 인수: {:?}", args);

    let watch = args.iter().any(|arg| arg == WATCH_FLAG);
    args.retain(|arg| arg != WATCH_FLAG);

    if args.len() < 4 {
        error!("인수가 충분하지 않습니다.");
        println!(
            "사용법: {} [{WATCH_FLAG}] <데이터_디렉터리> <타임프레임> <심볼>...",
            args[0]
        );
        println!("데이터 파일: <데이터_디렉터리>/<심볼>_<타임프레임>.json");
        println!("{WATCH_FLAG}: 설정의 refresh_interval_hours 주기로 계속 갱신");
        println!("환경 변수: {CONFIG_ENV}=설정 파일, {CACHE_DB_ENV}=SQLite 캐시 경로");
        return;
    }

    let data_dir = PathBuf::from(&args[1]);
    let timeframe = args[2].clone();
    let symbols: Vec<String> = args[3..].to_vec();

    let config = load_config();
    let service = Arc::new(WaveAnalysisService::new(
        Arc::new(JsonFileProvider::new(&data_dir)),
        open_store(),
        Arc::new(SystemClock),
        config.clone(),
    ));
    let coordinator = BatchRefreshCoordinator::new(service);

    if watch {
        let period = config.refresh_interval();
        info!(
            "감시 모드 시작: {} {} ({}개 심볼, 주기 {:?})",
            data_dir.display(),
            timeframe,
            symbols.len(),
            period
        );
        let handle = coordinator.spawn_periodic(
            symbols,
            timeframe,
            period,
            RefreshOptions::from_config(&config),
        );
        if let Err(e) = handle.await {
            error!("정기 갱신 작업 종료: {}", e);
        }
        return;
    }

    info!(
        "파동 분석 시작: {} {} ({}개 심볼)",
        data_dir.display(),
        timeframe,
        symbols.len()
    );
    let report = coordinator
        .refresh_symbols(&symbols, &timeframe, RefreshOptions::from_config(&config))
        .await;

    for symbol in &symbols {
        let result = report.result_for(symbol);
        println!("{}", summarize(result));
        if let Some(result) = result {
            match serde_json::to_string_pretty(result) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("{} 결과 직렬화 실패: {}", symbol, e),
            }
        }
    }

    for failure in &report.failures {
        println!("실패 {}: {}", failure.symbol, failure.reason);
    }
    println!("{}", report);
    info!("파동 분석 종료");
}
