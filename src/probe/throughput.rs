//! Download and upload throughput probes.
//!
//! Single-transfer estimates: one timed request, no averaging.

use std::time::Duration;
use tokio::time::Instant;

use super::{build_client, request_error, Metric, ProbeError};
use crate::target::Status;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Shortest elapsed time used when converting a transfer into a rate.
pub const MIN_TRANSFER_TIME: Duration = Duration::from_millis(10);

const UPLOAD_CHUNK: &[u8] = b"test data for upload speed measurement ";
const UPLOAD_REPEAT: usize = 128;

/// Compute throughput in Mbps for `bytes` moved in `elapsed`.
///
/// Elapsed times below [`MIN_TRANSFER_TIME`] are raised to it.
pub fn throughput_mbps(bytes: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.max(MIN_TRANSFER_TIME).as_secs_f64();
    (bytes as f64 * 8.0) / secs / 1_000_000.0
}

/// Classify a download rate.
pub fn classify_download(mbps: f64) -> Status {
    match mbps {
        m if m >= 2.0 => Status::Connected,
        m if m >= 0.5 => Status::Slow,
        m if m >= 0.01 => Status::Timeout,
        _ => Status::Error,
    }
}

/// Classify an upload rate.
pub fn classify_upload(mbps: f64) -> Status {
    match mbps {
        m if m >= 1.0 => Status::Connected,
        m if m >= 0.2 => Status::Slow,
        m if m >= 0.01 => Status::Timeout,
        _ => Status::Error,
    }
}

/// The fixed upload body (4992 bytes).
pub fn upload_payload() -> Vec<u8> {
    UPLOAD_CHUNK.repeat(UPLOAD_REPEAT)
}

/// Run a bandwidth probe: time a full GET of the payload at `url`.
pub async fn run_bandwidth_probe(url: &str) -> (Status, Metric) {
    match download(url).await {
        Ok((bytes, elapsed)) => {
            let mbps = throughput_mbps(bytes, elapsed);
            tracing::debug!(
                "Downloaded {} bytes from {} in {:?} ({:.2} Mbps)",
                bytes,
                url,
                elapsed,
                mbps
            );
            (classify_download(mbps), Metric::Throughput(mbps))
        }
        Err(e) => {
            tracing::debug!("Bandwidth probe for {} failed: {}", url, e);
            (e.status(), Metric::None)
        }
    }
}

/// Run an upload probe: time a POST of [`upload_payload`] to `url`.
pub async fn run_upload_probe(url: &str) -> (Status, Metric) {
    match upload(url).await {
        Ok((bytes, elapsed)) => {
            let mbps = throughput_mbps(bytes, elapsed);
            tracing::debug!(
                "Uploaded {} bytes to {} in {:?} ({:.2} Mbps)",
                bytes,
                url,
                elapsed,
                mbps
            );
            (classify_upload(mbps), Metric::Throughput(mbps))
        }
        Err(e) => {
            tracing::debug!("Upload probe for {} failed: {}", url, e);
            (e.status(), Metric::None)
        }
    }
}

async fn download(url: &str) -> Result<(usize, Duration), ProbeError> {
    let client = build_client(DOWNLOAD_TIMEOUT, true)?;

    let start = Instant::now();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| request_error(e, DOWNLOAD_TIMEOUT))?;

    // Body read failures classify as Error
    let body = response
        .bytes()
        .await
        .map_err(|e| ProbeError::Request(format!("failed to read body: {}", e)))?;

    Ok((body.len(), start.elapsed()))
}

async fn upload(url: &str) -> Result<(usize, Duration), ProbeError> {
    let client = build_client(UPLOAD_TIMEOUT, true)?;
    let payload = upload_payload();
    let bytes = payload.len();

    let start = Instant::now();
    client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .body(payload)
        .send()
        .await
        .map_err(|e| request_error(e, UPLOAD_TIMEOUT))?;

    Ok((bytes, start.elapsed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testutil::serve;

    #[test]
    fn test_throughput_exact() {
        let mbps = throughput_mbps(1_000_000, Duration::from_secs(4));
        assert_eq!(mbps, 2.0);
        assert_eq!(classify_download(mbps), Status::Connected);
    }

    #[test]
    fn test_throughput_floor() {
        // 10 KB in 1ms is treated as 10ms
        let mbps = throughput_mbps(10_000, Duration::from_millis(1));
        assert!((mbps - 8.0).abs() < 1e-9);
        assert_eq!(throughput_mbps(10_000, Duration::ZERO), mbps);
    }

    #[test]
    fn test_classify_download_bands() {
        assert_eq!(classify_download(25.0), Status::Connected);
        assert_eq!(classify_download(1.99), Status::Slow);
        assert_eq!(classify_download(0.5), Status::Slow);
        assert_eq!(classify_download(0.49), Status::Timeout);
        assert_eq!(classify_download(0.01), Status::Timeout);
        assert_eq!(classify_download(0.009), Status::Error);
    }

    #[test]
    fn test_classify_upload_bands() {
        assert_eq!(classify_upload(1.0), Status::Connected);
        assert_eq!(classify_upload(0.99), Status::Slow);
        assert_eq!(classify_upload(0.2), Status::Slow);
        assert_eq!(classify_upload(0.19), Status::Timeout);
        assert_eq!(classify_upload(0.0), Status::Error);
    }

    #[test]
    fn test_upload_payload_size() {
        assert_eq!(upload_payload().len(), 4992);
    }

    #[tokio::test]
    async fn test_bandwidth_probe_against_local_server() {
        let server = serve(|_| (200, vec![0u8; 10_240])).await;
        let (status, metric) = run_bandwidth_probe(&server.url).await;
        assert_ne!(status, Status::Error);
        assert!(metric.mbps().unwrap() > 0.0);
        assert_eq!(server.methods(), vec!["GET"]);
    }

    #[tokio::test]
    async fn test_upload_probe_against_local_server() {
        let server = serve(|_| (200, b"{}".to_vec())).await;
        let (_, metric) = run_upload_probe(&server.url).await;
        assert!(metric.mbps().unwrap() > 0.0);
        assert_eq!(server.methods(), vec!["POST"]);
    }

    #[tokio::test]
    async fn test_bandwidth_probe_unreachable() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}/bytes", port);
        assert_eq!(run_bandwidth_probe(&url).await, (Status::Timeout, Metric::None));
    }
}
