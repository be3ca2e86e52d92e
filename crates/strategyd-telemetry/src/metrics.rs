//! Prometheus metrics for the strategy daemon (§1 ambient stack).
//!
//! No HTTP exporter is wired up here — spec.md names no such surface — but
//! the registry is populated throughout the Supervisor and Swap Driver so a
//! future exporter is a one-line addition.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally: a failure here means a
//! duplicate metric name, a fatal configuration error that should crash at
//! startup rather than silently drop observability. These panics only occur
//! during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, register_int_gauge_vec,
    CounterVec, HistogramVec, IntGauge, IntGaugeVec,
};

/// Count of currently live worker tasks, one gauge per strategy kind.
pub static LIVE_WORKERS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "strategyd_live_workers",
        "Number of currently live worker tasks",
        &["kind"]
    )
    .unwrap()
});

/// Duration of one Supervisor reconcile cycle.
pub static RECONCILE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "strategyd_reconcile_duration_seconds",
        "Time taken for one supervisor reconcile cycle",
        &["outcome"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .unwrap()
});

/// Count of reconcile cycles, by outcome (ok/error).
pub static RECONCILE_CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "strategyd_reconcile_cycles_total",
        "Total supervisor reconcile cycles run",
        &["outcome"]
    )
    .unwrap()
});

/// Worker construction failures, by strategy kind — these are skipped and
/// retried on the next cycle (§4.3).
pub static WORKER_CONSTRUCTION_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "strategyd_worker_construction_failures_total",
        "Total worker construction failures during reconcile",
        &["kind"]
    )
    .unwrap()
});

/// Swap attempts, successes, and failures, by strategy kind and outcome.
pub static SWAP_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "strategyd_swap_attempts_total",
        "Total swap attempts made by the swap driver",
        &["kind", "outcome"]
    )
    .unwrap()
});

/// The slippage rung (bps) at which a swap ultimately succeeded or was
/// exhausted.
pub static SWAP_SLIPPAGE_RUNG_BPS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "strategyd_swap_slippage_rung_bps",
        "Slippage rung reached when a swap ladder concluded",
        &["kind", "outcome"],
        vec![0.0, 50.0, 150.0, 300.0, 500.0, 1000.0]
    )
    .unwrap()
});

/// Trade-event bus publish count.
pub static TRADE_EVENTS_PUBLISHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "strategyd_trade_events_published_total",
        "Total trade success events published to the bus",
        &["kind"]
    )
    .unwrap()
});

/// 1 if the supervisor's main loop is currently running, 0 otherwise.
pub static SUPERVISOR_UP: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "strategyd_supervisor_up",
        "Whether the supervisor reconcile loop is running"
    )
    .unwrap()
});

/// A thin facade over the static registry above, so call sites read as
/// `Metrics::record_swap_attempt(..)` instead of reaching for the statics
/// directly.
pub struct Metrics;

impl Metrics {
    pub fn set_live_workers(kind: &str, count: i64) {
        LIVE_WORKERS.with_label_values(&[kind]).set(count);
    }

    pub fn record_reconcile(outcome: &str, seconds: f64) {
        RECONCILE_CYCLES_TOTAL.with_label_values(&[outcome]).inc();
        RECONCILE_DURATION_SECONDS
            .with_label_values(&[outcome])
            .observe(seconds);
    }

    pub fn record_worker_construction_failure(kind: &str) {
        WORKER_CONSTRUCTION_FAILURES_TOTAL
            .with_label_values(&[kind])
            .inc();
    }

    pub fn record_swap_attempt(kind: &str, outcome: &str) {
        SWAP_ATTEMPTS_TOTAL.with_label_values(&[kind, outcome]).inc();
    }

    pub fn record_slippage_rung(kind: &str, outcome: &str, bps: f64) {
        SWAP_SLIPPAGE_RUNG_BPS
            .with_label_values(&[kind, outcome])
            .observe(bps);
    }

    pub fn record_trade_event_published(kind: &str) {
        TRADE_EVENTS_PUBLISHED_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn set_supervisor_up(up: bool) {
        SUPERVISOR_UP.set(if up { 1 } else { 0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_are_observable_without_panicking() {
        Metrics::set_live_workers("price_monitor", 3);
        Metrics::record_reconcile("ok", 0.02);
        Metrics::record_worker_construction_failure("levels");
        Metrics::record_swap_attempt("vault", "success");
        Metrics::record_slippage_rung("vault", "success", 150.0);
        Metrics::record_trade_event_published("vault");
        Metrics::set_supervisor_up(true);

        assert_eq!(LIVE_WORKERS.with_label_values(&["price_monitor"]).get(), 3);
    }
}
