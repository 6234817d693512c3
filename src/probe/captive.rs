//! Captive-portal detection against a known 204 endpoint.

use std::time::Duration;

use super::{build_client, request_error, Metric, ProbeError};
use crate::target::Status;

const CAPTIVE_TIMEOUT: Duration = Duration::from_secs(3);

/// Classify the response code of a connectivity-check endpoint.
///
/// Returns the status and whether a portal is suspected. Anything but an
/// exact 204 means something intercepted the request.
pub fn classify_captive(code: u16) -> (Status, bool) {
    if code == 204 {
        (Status::Connected, false)
    } else {
        (Status::Slow, true)
    }
}

/// Run a captive-portal probe: GET `url` without following redirects.
pub async fn run_captive_probe(url: &str) -> (Status, Metric) {
    match fetch_status(url).await {
        Ok(code) => {
            let (status, captive) = classify_captive(code);
            if captive {
                tracing::debug!("Captive portal suspected at {} (HTTP {})", url, code);
            }
            (status, Metric::CaptivePortal(captive))
        }
        Err(e) => {
            tracing::debug!("Captive portal probe for {} failed: {}", url, e);
            (e.status(), Metric::CaptivePortal(false))
        }
    }
}

async fn fetch_status(url: &str) -> Result<u16, ProbeError> {
    let client = build_client(CAPTIVE_TIMEOUT, false)?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| request_error(e, CAPTIVE_TIMEOUT))?;
    Ok(response.status().as_u16())
}
