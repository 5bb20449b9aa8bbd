//! 수집 파이프라인의 도메인 모델.

mod market_data;
mod outcome;

pub use market_data::*;
pub use outcome::*;
