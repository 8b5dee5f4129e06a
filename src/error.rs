//! Error types for the reqwest-proxy-rotation crate.

use thiserror::Error;

/// Errors produced while parsing a proxy endpoint definition.
///
/// Callers reading proxy files treat these as skip-the-line conditions,
/// never as fatal failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointParseError {
    /// The URL scheme is not one of `http`, `https`, `socks4`, `socks5`.
    #[error("unsupported proxy scheme: {0}")]
    UnsupportedScheme(String),
    /// The definition could not be parsed as a URL at all.
    #[error("invalid proxy URL: {0}")]
    InvalidUrl(String),
    /// The endpoint has no host.
    #[error("proxy endpoint is missing a host")]
    MissingHost,
    /// The endpoint has no port and the scheme has no default.
    #[error("proxy endpoint is missing a port")]
    MissingPort,
    /// The port field is not a valid non-zero port number.
    #[error("invalid proxy port: {0:?}")]
    InvalidPort(String),
    /// A colon-delimited record did not have exactly `host:port:user:pass`.
    #[error("expected host:port:user:pass, got {0} fields")]
    MalformedRecord(usize),
    /// Username and password must be provided together, and non-empty.
    #[error("username and password must be provided together")]
    IncompleteCredentials,
}

/// Errors from the proxy vendor's listing API.
#[derive(Debug, Error)]
pub enum VendorApiError {
    /// The listing request failed in transit or the body was not valid JSON.
    #[error("vendor listing request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The vendor answered with a non-success status.
    #[error("vendor listing returned status {0}")]
    Status(reqwest::StatusCode),
}
