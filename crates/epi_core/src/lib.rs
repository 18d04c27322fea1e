pub mod error;
pub mod record;

#[cfg(test)]
mod tests {
    use super::error::AppError;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("RECORD_TEST", "record failed")
            .with_details("field=paciente")
            .with_retryable(false);
        assert_eq!(err.code, "RECORD_TEST");
        assert_eq!(err.message, "record failed");
        assert_eq!(err.details.as_deref(), Some("field=paciente"));
        assert!(!err.retryable);
        assert_eq!(err.to_string(), "[RECORD_TEST] record failed");
    }
}
