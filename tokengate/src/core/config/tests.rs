use super::*;

#[test]
fn test_reference_defaults() {
    let config = RateLimitConfig::default();
    assert_eq!(config.tokens_per_interval(), 1);
    assert_eq!(config.interval(), Duration::from_millis(2000));
    assert_eq!(config.bucket_size(), 10);
    assert_eq!(config.refill_policy(), RefillPolicy::Discard);
    assert_eq!(config.idle_timeout(), Duration::from_secs(300));
}

#[test]
fn test_new_matches_reference() {
    let config = RateLimitConfig::new(1, Duration::from_millis(2000), 10).unwrap();
    assert_eq!(config, RateLimitConfig::default());
}

#[test]
fn test_per_second_and_per_minute() {
    let config = RateLimitConfig::per_second(4, 8).unwrap();
    assert_eq!(config.tokens_per_interval(), 1);
    assert_eq!(config.interval(), Duration::from_millis(250));
    assert_eq!(config.bucket_size(), 8);

    let config = RateLimitConfig::per_minute(30, 10).unwrap();
    assert_eq!(config.interval(), Duration::from_secs(2));
}

#[test]
fn test_zero_parameters_rejected() {
    assert!(matches!(
        RateLimitConfig::new(0, Duration::from_secs(1), 10),
        Err(AdmissionError::InvalidConfig(_))
    ));
    assert!(matches!(
        RateLimitConfig::new(1, Duration::ZERO, 10),
        Err(AdmissionError::InvalidConfig(_))
    ));
    assert!(matches!(
        RateLimitConfig::new(1, Duration::from_secs(1), 0),
        Err(AdmissionError::InvalidConfig(_))
    ));
    assert!(RateLimitConfig::per_minute(0, 10).is_err());
    assert!(
        RateLimitConfig::builder()
            .idle_timeout(Duration::ZERO)
            .build()
            .is_err()
    );
}

#[test]
fn test_builder_overrides() {
    let config = RateLimitConfig::builder()
        .tokens_per_interval(3)
        .interval(Duration::from_millis(500))
        .bucket_size(7)
        .refill_policy(RefillPolicy::Carry)
        .idle_timeout(Duration::from_secs(30))
        .build()
        .unwrap();

    assert_eq!(config.tokens_per_interval(), 3);
    assert_eq!(config.interval(), Duration::from_millis(500));
    assert_eq!(config.bucket_size(), 7);
    assert_eq!(config.refill_policy(), RefillPolicy::Carry);
    assert_eq!(config.idle_timeout(), Duration::from_secs(30));
}
