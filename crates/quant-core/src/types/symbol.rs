//! 추적 심볼 목록 처리.

use crate::error::{CoreError, CoreResult};

/// 심볼 하나를 정규화합니다 (앞뒤 공백 제거, 대문자).
///
/// 비어 있거나 공백을 포함한 심볼은 거부합니다.
pub fn normalize_symbol(raw: &str) -> CoreResult<String> {
    let symbol = raw.trim();
    if symbol.is_empty() {
        return Err(CoreError::InvalidInput("빈 심볼".to_string()));
    }
    if symbol.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidInput(format!(
            "심볼에 공백이 포함됨: {:?}",
            symbol
        )));
    }
    Ok(symbol.to_uppercase())
}

/// 쉼표로 구분된 심볼 목록을 파싱합니다.
///
/// 빈 항목은 건너뛰고, 대소문자를 무시한 중복은 처음 등장한 순서로 하나만 남깁니다.
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    dedup_symbols(raw.split(',').filter(|s| !s.trim().is_empty()))
}

/// 심볼 목록을 정규화하고 중복을 제거합니다 (순서 유지).
///
/// 정규화에 실패한 항목은 경고 후 제외합니다.
pub fn dedup_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in symbols {
        match normalize_symbol(raw.as_ref()) {
            Ok(symbol) => {
                if !out.contains(&symbol) {
                    out.push(symbol);
                }
            }
            Err(e) => tracing::warn!(symbol = raw.as_ref(), error = %e, "심볼 무시"),
        }
    }
    out
}
