//! # Quant Core
//!
//! 시장 데이터 수집 파이프라인의 핵심 도메인 모델 및 공통 타입을 제공합니다.
//!
//! 이 크레이트는 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 정규화된 레코드 (가격 봉, 뉴스, 내부자 거래)
//! - 심볼별 수집 결과와 실패 분류
//! - 추적 심볼 목록 파싱
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
