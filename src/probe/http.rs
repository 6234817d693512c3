//! HTTP availability probe: HEAD with a GET fallback.

use std::time::Duration;

use super::{build_client, request_error, ProbeError};
use crate::target::Status;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do after the HEAD response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadVerdict {
    Accept,
    RetryWithGet,
    Reject,
}

/// Classify the HEAD response code.
///
/// Any 2xx-4xx answer proves the site is up, except 405 (HEAD not allowed),
/// which is retried as GET together with 5xx answers.
pub fn head_verdict(code: u16) -> HeadVerdict {
    match code {
        405 => HeadVerdict::RetryWithGet,
        200..=499 => HeadVerdict::Accept,
        500..=u16::MAX => HeadVerdict::RetryWithGet,
        _ => HeadVerdict::Reject,
    }
}

/// Classify the fallback GET response code.
pub fn fallback_status(code: u16) -> Status {
    match code {
        200..=399 => Status::Connected,
        _ => Status::Error,
    }
}

/// Run an HTTP probe against the given URL.
///
/// Redirects are followed. Request failures are `Timeout`; a site that only
/// answers with errors is `Error`.
pub async fn run_http_probe(address: &str) -> Status {
    match check_http(address).await {
        Ok(status) => status,
        Err(e) => {
            tracing::debug!("HTTP probe for {} failed: {}", address, e);
            e.status()
        }
    }
}

async fn check_http(address: &str) -> Result<Status, ProbeError> {
    let url = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    let client = build_client(HTTP_TIMEOUT, true)?;

    let head = client
        .head(&url)
        .send()
        .await
        .map_err(|e| request_error(e, HTTP_TIMEOUT))?;

    let code = head.status().as_u16();
    match head_verdict(code) {
        HeadVerdict::Accept => return Ok(Status::Connected),
        HeadVerdict::Reject => return Ok(Status::Error),
        HeadVerdict::RetryWithGet => {
            tracing::debug!("HEAD {} returned {}, retrying with GET", url, code);
        }
    }

    let get = client
        .get(&url)
        .send()
        .await
        .map_err(|e| request_error(e, HTTP_TIMEOUT))?;

    Ok(fallback_status(get.status().as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testutil::serve;

    #[test]
    fn test_head_verdict() {
        assert_eq!(head_verdict(200), HeadVerdict::Accept);
        assert_eq!(head_verdict(301), HeadVerdict::Accept);
        assert_eq!(head_verdict(404), HeadVerdict::Accept);
        assert_eq!(head_verdict(405), HeadVerdict::RetryWithGet);
        assert_eq!(head_verdict(503), HeadVerdict::RetryWithGet);
        assert_eq!(head_verdict(101), HeadVerdict::Reject);
    }

    #[test]
    fn test_fallback_status() {
        assert_eq!(fallback_status(200), Status::Connected);
        assert_eq!(fallback_status(304), Status::Connected);
        assert_eq!(fallback_status(403), Status::Error);
        assert_eq!(fallback_status(500), Status::Error);
    }

    #[tokio::test]
    async fn test_head_ok() {
        let server = serve(|_| (200, Vec::new())).await;
        assert_eq!(run_http_probe(&server.url).await, Status::Connected);
        assert_eq!(server.methods(), vec!["HEAD"]);
    }

    #[tokio::test]
    async fn test_head_405_falls_back_to_get() {
        let server = serve(|method| match method {
            "HEAD" => (405, Vec::new()),
            _ => (200, b"hello".to_vec()),
        })
        .await;
        assert_eq!(run_http_probe(&server.url).await, Status::Connected);
        assert_eq!(server.methods(), vec!["HEAD", "GET"]);
    }

    #[tokio::test]
    async fn test_server_errors_are_error() {
        let server = serve(|_| (500, Vec::new())).await;
        assert_eq!(run_http_probe(&server.url).await, Status::Error);
        assert_eq!(server.methods(), vec!["HEAD", "GET"]);
    }

    #[tokio::test]
    async fn test_unparseable_url_is_error() {
        assert_eq!(run_http_probe("http://256.256.256.256").await, Status::Error);
    }

    #[tokio::test]
    async fn test_connection_refused_is_timeout() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}/", port);
        assert_eq!(run_http_probe(&url).await, Status::Timeout);
    }
}
