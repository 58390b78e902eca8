//! `aerochain verify`: smoke-test a running server's chat stream.

use std::io::Write;

use aerochain_chat::FAILURE_PREFIX;
use anyhow::Context;
use tokio_stream::StreamExt;
use tracing::info;

pub const VERIFY_MESSAGE: &str = "Hello, are you online?";
pub const DEFAULT_VERIFY_URL: &str = "http://localhost:8000";

/// Post a greeting to `/chat` and echo the stream to stdout.
///
/// Returns `Ok(false)` when the server answered with a non-200 status or
/// the stream carried a failure chunk.
pub async fn run(base_url: &str) -> anyhow::Result<bool> {
    let url = format!("{}/chat", base_url.trim_end_matches('/'));
    info!("Sending request to {}", url);

    let response = reqwest::Client::new()
        .post(&url)
        .form(&[("message", VERIFY_MESSAGE)])
        .send()
        .await
        .with_context(|| format!("Connection to {} failed", url))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        eprintln!("Error: {} - {}", status, body);
        return Ok(false);
    }

    println!("Response received:");
    let mut stream = response.bytes_stream();
    let mut transcript = Vec::new();
    let mut stdout = std::io::stdout();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.context("Stream read error")?;
        stdout.write_all(&bytes)?;
        stdout.flush()?;
        transcript.extend_from_slice(&bytes);
    }
    println!();

    let failed = String::from_utf8_lossy(&transcript).contains(FAILURE_PREFIX);
    if failed {
        eprintln!("\nTest Failed: server reported a generation failure");
    } else {
        println!("\nTest Passed!");
    }
    Ok(!failed)
}
