//! Shared test helpers for `tollgate-core` integration tests.
//!
//! Provides a scripted in-memory transport and small fixtures so dispatcher
//! tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tollgate_core::{Dispatcher, Transport};
use tollgate_domain::{ApiResponse, ClientConfig, Result};

pub use transport::ScriptedTransport;

/// Install a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Configuration with deterministic retries and a small worker pool.
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::with_base_url("http://tollgate.test");
    config.retry.jitter_fraction = 0.0;
    config.retry.base_delay_ms = 100;
    config.retry.max_delay_ms = 1_000;
    config.dispatch.worker_count = 2;
    config
}

pub fn dispatcher(config: ClientConfig, transport: &Arc<ScriptedTransport>) -> Result<Dispatcher> {
    init_tracing();
    Dispatcher::new(config, Arc::clone(transport) as Arc<dyn Transport>)
}

pub fn status(code: u16) -> ApiResponse {
    ApiResponse::new(code)
}

/// Poll `condition` on the (usually paused) tokio clock in 1ms steps.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached within 10s of test time");
}
