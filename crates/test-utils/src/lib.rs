pub mod builders;
pub mod collecting_sink;
pub mod failing_store;

use std::sync::Once;

use chrono::{DateTime, Duration, TimeZone, Utc};
use readygate::engine::{EventKind, MutationNotification};
use readygate::store::Entity;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Fixed "now" for tests: 2026-03-02 08:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0)
        .single()
        .expect("valid fixed timestamp")
}

/// `fixed_now()` shifted by whole hours (negative for the past).
pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    fixed_now() + Duration::hours(hours)
}

/// Mutation notification carrying `entity` as its after-image.
pub fn notification<T: Entity>(kind: EventKind, entity: &T) -> MutationNotification {
    let data = serde_json::to_value(entity).expect("entity serializes");
    MutationNotification::new(kind, T::KIND.as_str(), entity.id(), data)
}
