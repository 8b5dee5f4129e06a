//! Middleware implementation for reqwest.

use crate::config::ProxyPoolConfig;
use crate::dispatcher::{build_dispatcher, ProxyTransport};
use crate::pool::ProxyPool;

use anyhow::anyhow;
use async_trait::async_trait;
use log::{info, warn};
use reqwest_middleware::{Error, Middleware, Next, Result};
use std::sync::Arc;

/// Middleware that routes requests through a rotating pool of proxies and
/// degrades to a direct connection when no usable proxy exists.
///
/// A transport failure through an endpoint cools that endpoint down and the
/// next attempt draws a different one. Permanent removal (`ProxyPool::remove`)
/// stays the embedding application's decision, e.g. when the destination
/// rejects a specific endpoint's credentials.
#[derive(Clone)]
pub struct ProxyRotationMiddleware {
    /// The proxy pool.
    pool: Arc<ProxyPool>,
}

impl ProxyRotationMiddleware {
    /// Create a new middleware, resolving proxy sources per the
    /// configuration. Infallible: a failed resolution leaves the pool
    /// disabled and every request goes direct.
    pub async fn new(config: ProxyPoolConfig) -> Self {
        let pool = ProxyPool::new(config).await;
        if pool.is_enabled() {
            let (total, cooling) = pool.stats();
            info!(
                "Proxy pool initialized with {} proxies ({} cooling down)",
                total, cooling
            );
        } else {
            info!("Proxy pool disabled; requests go direct");
        }
        Self { pool }
    }

    /// Share an existing pool between clients.
    pub fn with_pool(pool: Arc<ProxyPool>) -> Self {
        Self { pool }
    }

    /// The pool backing this middleware.
    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }
}

#[async_trait]
impl Middleware for ProxyRotationMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<reqwest::Response> {
        let max_attempts = self.pool.config.retry_count;

        for attempt in 1..=max_attempts {
            let Some(endpoint) = self.pool.next() else {
                break;
            };

            let Some(dispatcher) = build_dispatcher(endpoint.url().as_str()) else {
                // Cannot turn this endpoint into a transport; this call
                // proceeds direct rather than erroring.
                break;
            };

            let proxied_request = req.try_clone().ok_or_else(|| {
                Error::Middleware(anyhow!(
                    "Request object is not cloneable. Are you passing a streaming body?"
                ))
            })?;

            info!(
                "Using proxy {} (attempt {}/{})",
                endpoint, attempt, max_attempts
            );

            let client = match dispatcher
                .wrap(reqwest::Client::builder().timeout(self.pool.config.request_timeout))
                .build()
            {
                Ok(client) => client,
                Err(e) => {
                    warn!("Failed to build client for proxy {}: {}", endpoint, e);
                    self.pool.cool_down(&endpoint);
                    continue;
                }
            };

            match client.execute(proxied_request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        "Request through proxy {} failed (attempt {}/{}): {}",
                        endpoint, attempt, max_attempts, e
                    );
                    self.pool.cool_down(&endpoint);
                }
            }
        }

        if self.pool.is_enabled() {
            let (total, cooling) = self.pool.stats();
            warn!(
                "No usable proxy ({} total, {} cooling down); sending request direct",
                total, cooling
            );
        }
        next.run(req, extensions).await
    }
}
