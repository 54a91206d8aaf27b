use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::{LazyLock, Once};

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static PAYMENTS_INITIATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "recipehub_payments_initiated_total",
        "Checkouts initialized at the gateway and recorded as pending",
    )
    .unwrap()
});

// Labelled by error code (validation_error, payment_gateway_error, ...)
pub static PAYMENTS_FAILED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "recipehub_payments_failed_total",
            "Initiate requests that did not produce a checkout",
        ),
        &["reason"],
    )
    .unwrap()
});

pub static WEBHOOKS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("recipehub_webhooks_total", "Webhook deliveries by outcome"),
        &["outcome"],
    )
    .unwrap()
});

pub static GATEWAY_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "recipehub_gateway_latency_seconds",
            "Time spent initializing a checkout, gateway call and ledger write included",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap()
});

static REGISTER: Once = Once::new();

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(PAYMENTS_INITIATED.clone()))
            .unwrap();
        REGISTRY
            .register(Box::new(PAYMENTS_FAILED.clone()))
            .unwrap();
        REGISTRY.register(Box::new(WEBHOOKS.clone())).unwrap();
        REGISTRY
            .register(Box::new(GATEWAY_LATENCY.clone()))
            .unwrap();
    });
}
