//! Configuration for the proxy pool.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Secret-mounted proxy file, preferred when present.
pub const DEFAULT_SECRET_FILE: &str = "/etc/secrets/proxies.txt";
/// Local proxy file, the fallback source.
pub const DEFAULT_LOCAL_FILE: &str = "proxies.txt";
/// Vendor listing endpoint queried in vendor-API mode.
pub const DEFAULT_VENDOR_API_URL: &str =
    "https://proxy.webshare.io/api/v2/proxy/list/?mode=direct&page_size=100";

/// Configuration for the proxy pool.
#[derive(Debug, Clone)]
pub struct ProxyPoolConfig {
    /// Master switch; `false` means the pool is permanently disabled.
    pub enabled: bool,
    /// Presence of a key selects vendor-API resolution mode.
    pub vendor_api_key: Option<String>,
    /// Vendor listing endpoint.
    pub vendor_api_url: String,
    /// Attempts against the vendor listing before degrading to disabled.
    pub vendor_retry_attempts: usize,
    /// Fixed delay between vendor listing attempts.
    pub vendor_retry_delay: Duration,
    /// Secret-mounted proxy file, preferred over the local file.
    pub secret_file: PathBuf,
    /// Local proxy file fallback.
    pub local_file: PathBuf,
    /// How long a cooled-down endpoint stays out of rotation.
    pub default_cooldown: Duration,
    /// Attempts through distinct proxies before a request goes direct.
    pub retry_count: usize,
    /// Per-attempt client timeout in the middleware.
    pub request_timeout: Duration,
}

impl ProxyPoolConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProxyPoolConfigBuilder {
        ProxyPoolConfigBuilder::new()
    }

    /// Read the process environment surface: `PROXY_ENABLED`,
    /// `PROXY_VENDOR_API_KEY`, `PROXY_VENDOR_API_URL`, `PROXY_SECRET_FILE`,
    /// `PROXY_LOCAL_FILE`. Anything but `PROXY_ENABLED=true` (case-insensitive)
    /// leaves the pool disabled.
    pub fn from_env() -> Self {
        let mut builder = Self::builder().enabled(env_flag("PROXY_ENABLED"));
        if let Some(key) = env_string("PROXY_VENDOR_API_KEY") {
            builder = builder.vendor_api_key(key);
        }
        if let Some(url) = env_string("PROXY_VENDOR_API_URL") {
            builder = builder.vendor_api_url(url);
        }
        if let Some(path) = env_string("PROXY_SECRET_FILE") {
            builder = builder.secret_file(path);
        }
        if let Some(path) = env_string("PROXY_LOCAL_FILE") {
            builder = builder.local_file(path);
        }
        builder.build()
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Builder for `ProxyPoolConfig`.
pub struct ProxyPoolConfigBuilder {
    enabled: bool,
    vendor_api_key: Option<String>,
    vendor_api_url: Option<String>,
    vendor_retry_attempts: Option<usize>,
    vendor_retry_delay: Option<Duration>,
    secret_file: Option<PathBuf>,
    local_file: Option<PathBuf>,
    default_cooldown: Option<Duration>,
    retry_count: Option<usize>,
    request_timeout: Option<Duration>,
}

impl ProxyPoolConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            enabled: false,
            vendor_api_key: None,
            vendor_api_url: None,
            vendor_retry_attempts: None,
            vendor_retry_delay: None,
            secret_file: None,
            local_file: None,
            default_cooldown: None,
            retry_count: None,
            request_timeout: None,
        }
    }

    /// Enable or disable the pool.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the vendor API key, selecting vendor-API resolution mode.
    pub fn vendor_api_key(mut self, key: impl Into<String>) -> Self {
        self.vendor_api_key = Some(key.into());
        self
    }

    /// Set the vendor listing endpoint.
    pub fn vendor_api_url(mut self, url: impl Into<String>) -> Self {
        self.vendor_api_url = Some(url.into());
        self
    }

    /// Set the number of vendor listing attempts.
    pub fn vendor_retry_attempts(mut self, attempts: usize) -> Self {
        self.vendor_retry_attempts = Some(attempts);
        self
    }

    /// Set the fixed delay between vendor listing attempts.
    pub fn vendor_retry_delay(mut self, delay: Duration) -> Self {
        self.vendor_retry_delay = Some(delay);
        self
    }

    /// Set the secret-mounted proxy file path.
    pub fn secret_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.secret_file = Some(path.into());
        self
    }

    /// Set the local proxy file path.
    pub fn local_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_file = Some(path.into());
        self
    }

    /// Set how long a cooled-down endpoint stays out of rotation.
    pub fn default_cooldown(mut self, cooldown: Duration) -> Self {
        self.default_cooldown = Some(cooldown);
        self
    }

    /// Set the number of proxied attempts before a request goes direct.
    pub fn retry_count(mut self, count: usize) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Set the per-attempt client timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ProxyPoolConfig {
        ProxyPoolConfig {
            enabled: self.enabled,
            vendor_api_key: self.vendor_api_key,
            vendor_api_url: self
                .vendor_api_url
                .unwrap_or_else(|| DEFAULT_VENDOR_API_URL.to_string()),
            vendor_retry_attempts: self.vendor_retry_attempts.unwrap_or(3),
            vendor_retry_delay: self.vendor_retry_delay.unwrap_or(Duration::from_millis(3000)),
            secret_file: self
                .secret_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRET_FILE)),
            local_file: self
                .local_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_FILE)),
            default_cooldown: self.default_cooldown.unwrap_or(Duration::from_secs(60)),
            retry_count: self.retry_count.unwrap_or(3),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
        }
    }
}

impl Default for ProxyPoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
