//! Tail an upstream event source through the relay
//!
//! Run with: cargo run --example relay_tail [WS_URL] [SUBSCRIBERS]
//!
//! Examples:
//!   cargo run --example relay_tail                                  # ws://localhost:4040/events, 2 subscribers
//!   cargo run --example relay_tail ws://cardinal:4040/events 5
//!
//! Each simulated session prints what it receives. Ctrl+C requests
//! shutdown; the dispatch loop drains every session and exits.

use std::sync::Arc;
use std::time::Duration;

use event_relay::{EventHub, RegistryConfig, UpstreamConfig, UpstreamConnector};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "ws://localhost:4040/events".to_string());
    let sessions: usize = args.next().and_then(|n| n.parse().ok()).unwrap_or(2);

    let config = UpstreamConfig::new(url)
        .retry_delay(Duration::from_secs(2))
        .connect_timeout(Duration::from_secs(10));

    let hub = Arc::new(
        UpstreamConnector::new(config)
            .connect_hub(RegistryConfig::default().channel_capacity(16))
            .await?,
    );

    let dispatcher = tokio::spawn({
        let hub = Arc::clone(&hub);
        async move { hub.run().await }
    });

    for n in 0..sessions {
        let mut events = hub.subscribe(format!("session-{n}")).await?;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                println!("[{}] {}", events.session(), event.message());
            }
            println!("[{}] closed", events.session());
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            hub.request_shutdown();
        }
        _ = async {
            while !hub.is_shutdown() {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        } => {}
    }

    match dispatcher.await? {
        Ok(()) => println!("relay stopped cleanly"),
        Err(e) => println!("relay stopped: {e}"),
    }

    let stats = hub.stats().await;
    println!(
        "frames={} delivered={} dropped={}",
        stats.frames_received, stats.events_delivered, stats.events_dropped
    );

    Ok(())
}
