/*!
 * Tests for error mapping
 */

use bisub::errors::{ProviderError, SubtitleError, TranslationError};

#[test]
fn test_fromStatus_shouldPickVariant() {
    assert!(matches!(ProviderError::from_status(401, "no".into()), ProviderError::AuthenticationError(_)));
    assert!(matches!(ProviderError::from_status(429, "slow".into()), ProviderError::RateLimitExceeded(_)));
    assert!(matches!(
        ProviderError::from_status(502, "bad gateway".into()),
        ProviderError::ApiError { status_code: 502, .. }
    ));
}

#[test]
fn test_isRetryable_shouldOnlyRetryTransientFailures() {
    assert!(ProviderError::from_status(503, String::new()).is_retryable());
    assert!(ProviderError::from_status(429, String::new()).is_retryable());
    assert!(ProviderError::ConnectionError("reset".into()).is_retryable());
    assert!(!ProviderError::from_status(400, String::new()).is_retryable());
    assert!(!ProviderError::from_status(401, String::new()).is_retryable());
    assert!(!ProviderError::ParseError("bad json".into()).is_retryable());
}

#[test]
fn test_display_shouldIncludeContext() {
    let error = SubtitleError::MalformedLine("oops".to_string());
    assert!(error.to_string().contains("oops"));

    let error = TranslationError::from(ProviderError::from_status(500, "boom".into()));
    assert!(error.to_string().contains("boom"));
}
