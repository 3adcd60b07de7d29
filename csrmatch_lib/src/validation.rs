use crate::error::CsrMatchError;

pub const MAX_SEARCH_LENGTH: usize = 100;
pub const MAX_DISTRICT_LENGTH: usize = 60;
pub const MAX_ENTITY_ID_LENGTH: usize = 64;
pub const MAX_CONCURRENCY: usize = 64;
pub const MAX_LIMIT: i64 = 10_000;

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, CsrMatchError> {
    if input.len() > max_len {
        return Err(CsrMatchError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(CsrMatchError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a directory search string: enforce length, strip control chars, trim.
pub fn validate_search(input: &str) -> Result<String, CsrMatchError> {
    sanitize_text(input, MAX_SEARCH_LENGTH)
}

/// Validate a district filter. Same rules as search, shorter limit.
pub fn validate_district(input: &str) -> Result<String, CsrMatchError> {
    sanitize_text(input, MAX_DISTRICT_LENGTH)
}

/// Validate an NGO registry id or company CIN.
///
/// Accepts ASCII letters, digits, and `/`, `-`, `_`, `.` (registry ids look
/// like `BR/2017/0154321`, CINs like `L17110MH1973PLC019786`).
pub fn validate_entity_id(input: &str) -> Result<String, CsrMatchError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CsrMatchError::InvalidInput("id must not be empty".to_string()));
    }
    if trimmed.len() > MAX_ENTITY_ID_LENGTH {
        return Err(CsrMatchError::InvalidInput(format!(
            "id exceeds maximum length of {} bytes",
            MAX_ENTITY_ID_LENGTH
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
    {
        return Err(CsrMatchError::InvalidInput(format!(
            "invalid id '{}'. Allowed characters: letters, digits, / - _ .",
            input
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate batch concurrency: 1..=64.
pub fn validate_concurrency(n: usize) -> Result<usize, CsrMatchError> {
    if !(1..=MAX_CONCURRENCY).contains(&n) {
        return Err(CsrMatchError::InvalidInput(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, n
        )));
    }
    Ok(n)
}

/// Validate a result limit: 1..=10000.
pub fn validate_limit(limit: i64) -> Result<i64, CsrMatchError> {
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(CsrMatchError::InvalidInput(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, limit
        )));
    }
    Ok(limit)
}

/// Validate a minimum match score: a finite value in 0..=100.
pub fn validate_min_score(score: f64) -> Result<f64, CsrMatchError> {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(CsrMatchError::InvalidInput(format!(
            "min score must be between 0 and 100, got {}",
            score
        )));
    }
    Ok(score)
}
