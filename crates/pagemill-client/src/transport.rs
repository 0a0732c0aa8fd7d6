use pagemill_core::error::AppError;

/// Map a reqwest transport failure onto the error taxonomy.
pub(crate) fn classify_transport(e: reqwest::Error, timeout_secs: u64) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout_secs)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else {
        AppError::HttpError(e.to_string())
    }
}
