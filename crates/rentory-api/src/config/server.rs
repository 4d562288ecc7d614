//! HTTP server configuration

use rentory_common::LogFormat;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_address: SocketAddr,

    /// Per-request timeout in seconds
    pub request_timeout: u64,

    /// Log line format: "compact" or "json"
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            request_timeout: 30,
            log_format: LogFormat::Compact,
        }
    }
}
