//! Poll a TRMNL server and report each new screen.
//!
//! Run with:
//! ```sh
//! TRMNL_ACCESS_TOKEN=your-device-api-key cargo run --example mirror
//! ```
//!
//! Point it at a BYOS server with `TRMNL_BASE_URL=https://byos.example.com`.
//! Use `RUST_LOG=trmnl_mirror=debug` to see retry decisions.

use tracing_subscriber::EnvFilter;
use trmnl_mirror::{Cancellation, DisplayClient};

#[tokio::main]
async fn main() -> Result<(), trmnl_mirror::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cancel = Cancellation::new();
    let client = DisplayClient::from_env()?.with_cancellation(cancel.clone());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
            shutdown.cancel();
        }
    });

    let mut last_filename: Option<String> = None;

    while !cancel.is_cancelled() {
        let wait = match client.current_screen().await {
            Ok(screen) => {
                if screen.filename == last_filename {
                    screen.refresh_interval()
                } else {
                    match client.download_image(&screen.image_url).await {
                        Ok(png) => {
                            println!(
                                "New screen {} ({} bytes)",
                                screen.filename.as_deref().unwrap_or("<unnamed>"),
                                png.len()
                            );
                            last_filename = screen.filename.clone();
                            screen.refresh_interval()
                        }
                        Err(err) if err.is_interrupted() => break,
                        Err(err) => {
                            tracing::warn!("Failed to download {}: {}", screen.image_url, err);
                            std::time::Duration::from_secs(60)
                        }
                    }
                }
            }
            Err(err) if err.is_interrupted() => break,
            Err(err) => {
                tracing::warn!("Failed to fetch screen: {}", err);
                std::time::Duration::from_secs(60)
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
