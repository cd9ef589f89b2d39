//! Proxy Configuration Types
//!
//! Shared by the oracle providers and the speech client. The HTTP client
//! factory that consumes these lives in the `auraforming-llm` crate.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Proxy protocol type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    /// Return the URL scheme string for this protocol.
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }
}

/// Outbound proxy settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub protocol: ProxyProtocol,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Read from `AURAFORMING_PROXY_PASSWORD`; never written to the config file.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Build the proxy URL string (without auth).
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    /// Build the proxy URL string with embedded credentials (if any).
    pub fn url_with_auth(&self) -> String {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => {
                format!("{}://{}:{}@{}:{}", self.protocol.scheme(), u, p, self.host, self.port)
            }
            (Some(u), None) => {
                format!("{}://{}@{}:{}", self.protocol.scheme(), u, self.host, self.port)
            }
            _ => self.url(),
        }
    }

    /// Reject settings no client could connect through.
    pub fn validate(&self) -> CoreResult<()> {
        if self.host.trim().is_empty() {
            return Err(CoreError::config("proxy host must not be empty"));
        }
        if self.port == 0 {
            return Err(CoreError::config("proxy port must be non-zero"));
        }
        Ok(())
    }
}
