//! HTTP Client Factory
//!
//! Builds reqwest clients with proxy and timeout settings. Shared by the
//! oracle providers and the speech client.

use std::time::Duration;

use auraforming_core::proxy::ProxyConfig;

use crate::types::{LlmError, LlmResult};

/// Build a `reqwest::Client` with the resolved proxy configuration.
///
/// - `Some(proxy)` -> configure proxy on the client
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(proxy: Option<&ProxyConfig>, timeout: Duration) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    match proxy {
        Some(cfg) => {
            let url = cfg.url();
            let mut p = reqwest::Proxy::all(&url).map_err(|e| LlmError::InvalidRequest {
                message: format!("Invalid proxy URL {}: {}", url, e),
            })?;
            if let (Some(u), Some(pw)) = (&cfg.username, &cfg.password) {
                p = p.basic_auth(u, pw);
            }
            builder = builder.proxy(p);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    builder.build().map_err(|e| LlmError::Other {
        message: format!("Failed to build HTTP client: {}", e),
    })
}
