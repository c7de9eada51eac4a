//! Shared fixtures for `tollgate-infra` integration tests.

#![allow(dead_code)]

use tollgate_domain::ClientConfig;

/// Install a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config pointed at a mock server with short, deterministic retry delays.
pub fn fast_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::with_base_url(base_url);
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 50;
    config.retry.jitter_fraction = 0.0;
    config.dispatch.worker_count = 2;
    config.dispatch.request_timeout_ms = 2_000;
    config.dispatch.default_deadline_ms = 5_000;
    config.dispatch.idle_poll_ms = 20;
    config
}
