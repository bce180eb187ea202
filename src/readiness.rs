//! Web-UI readiness polling
//!
//! A bounded-retry probe of the web UI's local HTTP endpoint, run before the
//! browser-open command is issued. Any connection failure or non-2xx status
//! counts as one failed attempt; the poll sleeps a fixed interval between
//! attempts and never after the last one. It never returns an error: an
//! exhausted budget is reported as `false` and the caller prints a
//! diagnostic naming the service it was waiting for.
//!
//! The dispatcher usually runs this on a detached background task so the
//! foreground start command is not blocked. That task is fire-and-forget:
//! the program may exit while the poll is still pending, in which case the
//! browser simply does not open. Accepted behavior, not a bug.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Per-request timeout; keeps a hung endpoint from stalling the retry clock.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Polls `url` until it answers with a success status, up to `max_attempts`
/// tries `interval` apart. Returns whether the endpoint became ready.
pub async fn wait_until_ready(url: &str, max_attempts: u32, interval: Duration) -> bool {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client");

    for attempt in 1..=max_attempts {
        match client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                info!(url, attempt, "endpoint is ready");
                return true;
            }
            Ok(response) => {
                warn!(url, attempt, status = %response.status(), "endpoint not ready yet");
            }
            Err(e) => {
                debug!(url, attempt, error = %e, "endpoint not reachable yet");
            }
        }

        if attempt < max_attempts {
            sleep(interval).await;
        }
    }

    warn!(url, max_attempts, "readiness poll budget exhausted");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers one HTTP request per listed status code, then stops.
    async fn serve_statuses(listener: TcpListener, statuses: Vec<u16>) {
        for status in statuses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        }
    }

    async fn local_endpoint() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn succeeds_immediately_without_sleeping() {
        let (listener, url) = local_endpoint().await;
        tokio::spawn(serve_statuses(listener, vec![200]));

        let start = Instant::now();
        assert!(wait_until_ready(&url, 10, Duration::from_secs(5)).await);
        // No sleep after the successful attempt.
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn retries_through_failures_then_succeeds() {
        let (listener, url) = local_endpoint().await;
        tokio::spawn(serve_statuses(listener, vec![503, 503, 200]));

        let start = Instant::now();
        let interval = Duration::from_millis(50);
        assert!(wait_until_ready(&url, 10, interval).await);

        // Two failed attempts before success means exactly two sleeps.
        assert!(start.elapsed() >= interval * 2);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn gives_up_after_budget_with_interval_sleeps_between() {
        // Bind then drop, so the port reliably refuses connections.
        let (listener, url) = local_endpoint().await;
        drop(listener);

        let start = Instant::now();
        let interval = Duration::from_millis(50);
        assert!(!wait_until_ready(&url, 3, interval).await);

        // max_attempts - 1 sleeps, none after the final failure.
        let elapsed = start.elapsed();
        assert!(elapsed >= interval * 2);
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn non_success_status_counts_as_a_failed_attempt() {
        let (listener, url) = local_endpoint().await;
        tokio::spawn(serve_statuses(listener, vec![500, 404]));

        assert!(!wait_until_ready(&url, 2, Duration::from_millis(10)).await);
    }
}
