//! Example: Fetching a URL through the resilient client
//!
//! Loads configuration from `steadfast.{json,toml}` and `STEADFAST_*`
//! environment variables, then issues a GET with a 10 second deadline.
//! Breaker transitions and attempts are logged through `tracing`.
//!
//! ```bash
//! RUST_LOG=debug STEADFAST_RETRY_MAX_ATTEMPTS=4 \
//!     cargo run -p steadfast-infra --example resilient_get -- https://httpbin.org/status/503
//! ```

use std::sync::Arc;
use std::time::Duration;

use steadfast_common::TracingObserver;
use steadfast_infra::{config, Client, HttpError, RequestContext};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| "https://example.com".to_string());
    let config = config::load()?;

    println!("Resilient GET Example");
    println!("=====================\n");
    println!("  URL:          {url}");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Threshold:    {}\n", config.server_error_threshold);

    let client = Client::builder()
        .config(config)
        .observer(Arc::new(TracingObserver::for_dependency("example")))
        .build()?;

    let ctx = RequestContext::background().with_timeout(Duration::from_secs(10));
    match client.get(&ctx, &url).await {
        Ok(response) => {
            let status = response.status();
            let body = response.text().await?;
            println!("✓ {status} ({} bytes)", body.len());
        }
        Err(HttpError::MaxRetriesExceeded { attempts, last }) => {
            println!("✗ gave up after {attempts} attempts: {last}");
        }
        Err(err) => println!("✗ request failed: {err}"),
    }

    let metrics = client.circuit_breaker().metrics();
    println!(
        "\nBreaker: {} (failures: {}, successes: {})",
        metrics.state, metrics.total_failures, metrics.total_successes
    );

    Ok(())
}
