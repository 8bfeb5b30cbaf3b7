// 파동 분석 파이프라인 모듈
// 피벗 추출, 파동 라벨링, 피보나치 목표가 계산을 제공합니다.

pub mod fibonacci_calculator;
pub mod pivot_extractor;
pub mod wave_analyzer;
pub mod wave_labeler;

pub use fibonacci_calculator::{EXTENSION_RATIOS, RETRACEMENT_RATIOS, compute_fib_targets};
pub use pivot_extractor::{extract_pivots, is_alternating, normalize_pivots};
pub use wave_analyzer::WaveAnalyzer;
pub use wave_labeler::{WaveLabeler, WaveLabeling, label_waves};
