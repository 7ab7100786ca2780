pub mod config;
pub mod db;
pub mod domain;
pub mod error;

#[cfg(test)]
mod tests {
    use super::error::AppError;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("DB_READ_FAILED", "read failed")
            .with_details("relation=artists")
            .with_retryable(false);
        assert_eq!(err.code, "DB_READ_FAILED");
        assert_eq!(err.retryable, false);
        assert_eq!(err.to_string(), "[DB_READ_FAILED] read failed (relation=artists)");
    }
}
