//! REST API server demo
//!
//! Runs xhs-dl with the REST API enabled. An optional first argument names a
//! JSON configuration file; missing fields take their defaults.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:5556/swagger-ui
//! - Submit a task via POST http://localhost:5556/xhs/download/user-posted
//! - Poll it via GET http://localhost:5556/xhs/tasks/{task_id}
//! - Stream events via GET http://localhost:5556/events
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use xhs_dl::{BatchDownloader, Config, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str::<Config>(&raw)?
        }
        None => Config::default(),
    };

    let bind_address = config.server.api.bind_address;
    let downloader = Arc::new(BatchDownloader::new(config).await?);

    let sweeper = downloader.start_retention_sweeper();
    let api = downloader.spawn_api_server();

    println!("Starting xhs-dl REST API server");
    println!("Swagger UI: http://{bind_address}/swagger-ui");
    println!("Events stream: http://{bind_address}/events");
    println!();
    println!("Example commands:");
    println!("  # Download everything a publisher posted");
    println!("  curl -X POST http://{bind_address}/xhs/download/user-posted \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"profile_url\": \"https://www.xiaohongshu.com/user/profile/<id>\", \"limit\": 20}}'");
    println!();
    println!("  # Poll a task");
    println!("  curl http://{bind_address}/xhs/tasks/<task_id>");

    run_with_shutdown((*downloader).clone()).await?;

    api.await??;
    sweeper.await?;
    Ok(())
}
