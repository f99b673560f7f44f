use super::{AdmissionController, BucketStore, RateLimitConfig, RefillPolicy};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn reference() -> AdmissionController {
    AdmissionController::new(RateLimitConfig::default())
}

#[test]
fn test_first_request_admitted() {
    let controller = reference();
    let now = Instant::now();

    assert!(controller.is_allowed_at("new_client", now));
    assert_eq!(controller.remaining_tokens("new_client"), 9);
    assert_eq!(controller.reset_time_seconds("new_client"), 0);
}

#[test]
fn test_unseen_client_queries() {
    let controller = reference();
    assert_eq!(controller.remaining_tokens("nobody"), 10);
    assert_eq!(controller.reset_time_seconds("nobody"), 0);
    assert_eq!(controller.reset_after("nobody"), Duration::ZERO);
    // Observational reads never create a bucket
    assert_eq!(controller.tracked_clients(), 0);
}

#[test]
fn test_burst_exhaustion() {
    let controller = reference();
    let now = Instant::now();

    for i in 0..10 {
        assert!(
            controller.is_allowed_at("1.2.3.4", now),
            "Request {} should be allowed",
            i + 1
        );
    }
    assert!(!controller.is_allowed_at("1.2.3.4", now));
    assert_eq!(controller.remaining_tokens("1.2.3.4"), 0);
    assert_eq!(controller.reset_time_seconds("1.2.3.4"), 2);

    // Exactly one interval later a single token is back
    let later = now + Duration::from_millis(2000);
    assert!(controller.is_allowed_at("1.2.3.4", later));
    assert!(!controller.is_allowed_at("1.2.3.4", later));
}

#[test]
fn test_refill_grants_tokens_per_interval() {
    let config = RateLimitConfig::new(3, Duration::from_secs(1), 5).unwrap();
    let controller = AdmissionController::new(config);
    let now = Instant::now();

    while controller.is_allowed_at("k", now) {}

    let later = now + Duration::from_secs(1);
    let admitted = (0..10)
        .take_while(|_| controller.is_allowed_at("k", later))
        .count();
    assert_eq!(admitted, 3);
}

#[test]
fn test_refill_bounded_by_bucket_size() {
    let controller = reference();
    let now = Instant::now();

    for _ in 0..10 {
        controller.is_allowed_at("k", now);
    }

    // A day is far more than enough to overflow the bucket
    let later = now + Duration::from_secs(86_400);
    let admitted = (0..100)
        .take_while(|_| controller.is_allowed_at("k", later))
        .count();
    assert_eq!(admitted, 10);
}

#[test]
fn test_clients_are_independent() {
    let controller = reference();
    let now = Instant::now();

    for _ in 0..11 {
        controller.is_allowed_at("a", now);
    }
    assert!(!controller.is_allowed_at("a", now));

    assert!(controller.is_allowed_at("b", now));
    assert_eq!(controller.remaining_tokens("b"), 9);
    assert_eq!(controller.remaining_tokens("a"), 0);
}

#[test]
fn test_empty_identifier_gets_own_bucket() {
    let controller = reference();
    let now = Instant::now();

    assert!(controller.is_allowed_at("", now));
    assert_eq!(controller.remaining_tokens(""), 9);
    assert_eq!(controller.remaining_tokens("unknown"), 10);
}

#[test]
fn test_remaining_tokens_does_not_refill() {
    let controller = reference();
    let now = Instant::now();
    let earlier = now - Duration::from_secs(10);

    for _ in 0..10 {
        controller.is_allowed_at("k", earlier);
    }

    // Five whole intervals have elapsed, but no check has observed them
    assert_eq!(controller.remaining_tokens("k"), 0);
    assert_eq!(controller.reset_time_seconds("k"), 2);
    assert_eq!(controller.reset_after("k"), Duration::from_millis(2000));

    // The next check credits them
    let decision = controller.check_at("k", now);
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 4);
    assert_eq!(controller.remaining_tokens("k"), 4);
}

#[test]
fn test_check_reports_snapshot() {
    let controller = reference();
    let now = Instant::now();

    let first = controller.check_at("k", now);
    assert!(first.allowed);
    assert_eq!(first.limit, 10);
    assert_eq!(first.remaining, 9);
    assert_eq!(first.retry_after, Duration::ZERO);

    for _ in 0..9 {
        controller.check_at("k", now);
    }
    let denied = controller.check_at("k", now);
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
    assert_eq!(denied.retry_after, Duration::from_millis(2000));
    assert_eq!(denied.retry_after_secs(), 2);
}

#[test]
fn test_discard_policy_under_fast_polling() {
    let controller = reference();
    let now = Instant::now();

    for _ in 0..10 {
        controller.is_allowed_at("poller", now);
    }

    // Polling every second never accumulates a whole 2s interval
    for s in 1..=6 {
        assert!(!controller.is_allowed_at("poller", now + Duration::from_secs(s)));
    }
}

#[test]
fn test_carry_policy_under_fast_polling() {
    let config = RateLimitConfig::builder()
        .refill_policy(RefillPolicy::Carry)
        .build()
        .unwrap();
    let controller = AdmissionController::new(config);
    let now = Instant::now();

    for _ in 0..10 {
        controller.is_allowed_at("poller", now);
    }

    // Every other one-second poll completes an interval
    let admitted: Vec<bool> = (1..=6)
        .map(|s| controller.is_allowed_at("poller", now + Duration::from_secs(s)))
        .collect();
    assert_eq!(admitted, vec![false, true, false, true, false, true]);
}

#[test]
fn test_sweep_evicts_stale_buckets() {
    let controller = reference();
    let now = Instant::now();

    controller.is_allowed_at("stale", now);
    controller.is_allowed_at("recent", now + Duration::from_secs(2));

    let removed = controller.sweep_at(now + Duration::from_secs(5 * 60 + 1));
    assert_eq!(removed, 1);
    assert_eq!(controller.tracked_clients(), 1);
    // stale is back to full capacity
    assert_eq!(controller.remaining_tokens("stale"), 10);
    assert_eq!(controller.remaining_tokens("recent"), 9);
}

#[test]
fn test_sweep_retains_within_threshold() {
    let controller = reference();
    let now = Instant::now();

    controller.is_allowed_at("client", now);
    assert_eq!(controller.sweep_at(now + Duration::from_secs(4 * 60 + 59)), 0);
    assert_eq!(controller.tracked_clients(), 1);
}

#[test]
fn test_eviction_then_recreation() {
    let controller = reference();
    let now = Instant::now();

    for _ in 0..11 {
        controller.is_allowed_at("k", now);
    }
    let later = now + Duration::from_secs(400);
    controller.sweep_at(later);

    let decision = controller.check_at("k", later);
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 9);
}

#[test]
fn test_custom_idle_timeout() {
    let config = RateLimitConfig::builder()
        .idle_timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let controller = AdmissionController::with_store(config, BucketStore::with_shards(2));
    let now = Instant::now();

    controller.is_allowed_at("k", now);
    assert_eq!(controller.sweep_at(now + Duration::from_secs(10)), 0);
    assert_eq!(controller.sweep_at(now + Duration::from_secs(11)), 1);
}

#[test]
fn test_concurrent_checks_same_client() {
    let config = RateLimitConfig::builder().bucket_size(50).build().unwrap();
    let controller = AdmissionController::new(config);
    let now = Instant::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = controller.clone();
            thread::spawn(move || {
                (0..20)
                    .filter(|_| controller.is_allowed_at("shared", now))
                    .count()
            })
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted, 50);
    assert_eq!(controller.remaining_tokens("shared"), 0);
}

#[test]
fn test_concurrent_checks_many_clients() {
    let controller = reference();
    let now = Instant::now();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let controller = controller.clone();
            thread::spawn(move || {
                let key = format!("client_{t}");
                (0..15)
                    .filter(|_| controller.is_allowed_at(&key, now))
                    .count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 10);
    }
    assert_eq!(controller.tracked_clients(), 8);
}

#[test]
fn test_sweep_concurrent_with_checks() {
    let controller = reference();
    let start = Instant::now();
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let sweeper = {
        let controller = controller.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                // Everything looks stale from an hour ahead
                controller.sweep_at(start + Duration::from_secs(3600));
            }
        })
    };

    for i in 0..2000 {
        let key = format!("k{}", i % 50);
        let decision = controller.check_at(&key, start);
        assert!(decision.remaining <= 10);
    }

    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    sweeper.join().unwrap();
}
