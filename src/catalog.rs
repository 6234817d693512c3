//! Target catalog: the fixed set of endpoints monitored for the process
//! lifetime.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::probe::ProbeKind;

/// Catalog error types.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog contains no targets")]
    Empty,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub kind: ProbeKind,
    pub host: String,
    pub section: String,
}

impl TargetSpec {
    pub fn new(name: &str, kind: ProbeKind, host: &str, section: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            host: host.to_string(),
            section: section.to_string(),
        }
    }
}

/// The built-in catalog.
pub fn default_catalog() -> Vec<TargetSpec> {
    use ProbeKind::*;

    vec![
        TargetSpec::new("Google DNS", Reachability, "8.8.8.8", "DNS"),
        TargetSpec::new("Cloudflare", Reachability, "1.1.1.1", "DNS"),
        TargetSpec::new("Quad9", Reachability, "9.9.9.9", "DNS"),
        TargetSpec::new("OpenDNS", Reachability, "208.67.222.222", "DNS"),
        TargetSpec::new("DNS Resolution", Dns, "google.com", "DNS"),
        TargetSpec::new("Google", Http, "https://google.com", "Web"),
        TargetSpec::new("GitHub", Http, "https://github.com", "Web"),
        TargetSpec::new("BBC", Http, "https://bbc.co.uk", "Web"),
        TargetSpec::new("Wikipedia", Http, "https://wikipedia.org", "Web"),
        TargetSpec::new("Stack Overflow", Http, "https://stackoverflow.com", "Web"),
        TargetSpec::new("Download Test", Bandwidth, "https://httpbin.org/bytes/10240", "Speed"),
        TargetSpec::new("Upload Test", Upload, "https://httpbin.org/post", "Speed"),
        TargetSpec::new(
            "Captive Portal",
            Captive,
            "http://connectivitycheck.gstatic.com/generate_204",
            "Connectivity",
        ),
        TargetSpec::new("IPv6 Support", Ipv6, "google.com", "Connectivity"),
        TargetSpec::new("Route Hops", Traceroute, "8.8.8.8", "Connectivity"),
    ]
}

/// Load a catalog from a JSON array of entries.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<TargetSpec>, CatalogError> {
    let data = std::fs::read_to_string(path)?;
    let specs: Vec<TargetSpec> = serde_json::from_str(&data)?;

    if specs.is_empty() {
        return Err(CatalogError::Empty);
    }

    for spec in specs.iter().filter(|s| s.kind == ProbeKind::Unrecognized) {
        tracing::warn!("Catalog target {} has an unrecognized probe kind", spec.name);
    }

    Ok(specs)
}
