//! Authentication configuration

use serde::{Deserialize, Serialize};

/// Bearer tokens are HS256 JWTs issued by an external provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HS256 secret
    pub jwt_secret: String,

    /// Expected `iss` claim, not checked when unset
    pub issuer: Option<String>,

    /// Expected `aud` claim, not checked when unset
    pub audience: Option<String>,

    /// Allowed clock skew for `exp`, in seconds
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            issuer: None,
            audience: None,
            leeway_secs: 60,
        }
    }
}
