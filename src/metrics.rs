// Prometheus metrics definitions for the clan bot.

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Command invocations, by command and outcome (ok, rejected, error).
    pub static ref COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("clanbot_commands_total", "Total command invocations"),
        &["command", "outcome"],
    )
    .unwrap();

    /// Upstream lookups, by provider and outcome (found, not_found, unavailable).
    pub static ref UPSTREAM_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("clanbot_upstream_requests_total", "Total upstream lookups"),
        &["provider", "outcome"],
    )
    .unwrap();

    /// Accounts linked since startup.
    pub static ref LINKED_ACCOUNTS_TOTAL: IntCounter = IntCounter::new(
        "clanbot_linked_accounts_total",
        "Accounts linked",
    )
    .unwrap();

    /// Drops logged since startup.
    pub static ref DROPS_LOGGED_TOTAL: IntCounter = IntCounter::new(
        "clanbot_drops_logged_total",
        "Drops logged",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Upstream request duration in seconds, by provider.
    pub static ref UPSTREAM_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "clanbot_upstream_request_duration_seconds",
            "Upstream request duration in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["provider"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(COMMANDS_TOTAL.clone()),
        Box::new(UPSTREAM_REQUESTS_TOTAL.clone()),
        Box::new(LINKED_ACCOUNTS_TOTAL.clone()),
        Box::new(DROPS_LOGGED_TOTAL.clone()),
        Box::new(UPSTREAM_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            tracing::warn!("metric registration skipped: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
