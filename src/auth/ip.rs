//! Client IP extraction utilities.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request};

/// Header to read the client IP from when running behind a reverse proxy.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpExtractor {
    /// First entry of `X-Forwarded-For`
    XForwardedFor,
    /// `X-Real-IP`
    XRealIp,
}

impl IpExtractor {
    pub fn header_name(&self) -> &'static str {
        match self {
            IpExtractor::XForwardedFor => "x-forwarded-for",
            IpExtractor::XRealIp => "x-real-ip",
        }
    }

    /// Parse the client IP out of a header value.
    pub fn extract(&self, value: &str) -> Result<String, &'static str> {
        let candidate = match self {
            IpExtractor::XForwardedFor => value.split(',').next().unwrap_or_default(),
            IpExtractor::XRealIp => value,
        };
        candidate
            .trim()
            .parse::<IpAddr>()
            .map(|ip| ip.to_string())
            .map_err(|_| "IP header does not contain a valid address")
    }
}

/// Extract client IP address based on configuration.
///
/// If `ip_extractor` is set, the configured header must be present and valid;
/// there is no fallback to the socket address. Otherwise the peer address from
/// `ConnectInfo` is used.
pub fn extract_client_ip(
    request: &Request,
    ip_extractor: Option<IpExtractor>,
) -> Result<String, &'static str> {
    match ip_extractor {
        Some(extractor) => {
            let header_value = request
                .headers()
                .get(extractor.header_name())
                .ok_or("IP header not present")?
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            extractor.extract(header_value)
        }
        None => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .ok_or("No client IP available"),
    }
}
