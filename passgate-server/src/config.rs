//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible
//! defaults. The relying-party identity (`RP_ID`, `RP_ORIGIN`, `RP_NAME`)
//! and the token secret are the security-relevant knobs; everything else is
//! transport tuning.

use std::net::SocketAddr;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Relying Party identifier, typically the domain (default: "localhost")
    pub rp_id: String,
    /// Exact expected web origin (default: "http://localhost:3000")
    pub rp_origin: String,
    /// Human-readable Relying Party name (default: "Passgate")
    pub rp_name: String,
    /// Secret the challenge tokens are signed with
    pub token_secret: String,
    /// Challenge token lifetime in seconds (default: 60, the ceremony timeout)
    pub token_ttl_secs: u64,
    /// Mark ceremony cookies `Secure` (default: true; disable for local HTTP)
    pub secure_cookies: bool,
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in KB (default: 256 — ceremony payloads are small)
    pub body_limit_kb: usize,
    /// Request timeout in seconds (default: 10)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
}

/// Development fallback secret, mirrored from the original deployment.
/// `from_env` warns loudly when it ends up in use.
const DEV_TOKEN_SECRET: &str = "passgate-dev-secret";

impl Default for Config {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_origin: "http://localhost:3000".to_string(),
            rp_name: "Passgate".to_string(),
            token_secret: DEV_TOKEN_SECRET.to_string(),
            token_ttl_secs: 60,
            secure_cookies: false, // tests run over plain HTTP
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_kb: 256,
            timeout_secs: 10,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let rp_id = std::env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string());

        let rp_origin =
            std::env::var("RP_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let rp_name = std::env::var("RP_NAME").unwrap_or_else(|_| "Passgate".to_string());

        let token_secret = std::env::var("TOKEN_SECRET").unwrap_or_else(|_| {
            tracing::warn!("TOKEN_SECRET not set, using development secret");
            DEV_TOKEN_SECRET.to_string()
        });

        let token_ttl_secs = std::env::var("TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let secure_cookies = std::env::var("SECURE_COOKIES")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or([127, 0, 0, 1]);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let body_limit_kb = std::env::var("BODY_LIMIT_KB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(256);

        let timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        // Rate limiting enabled by default in production, can be disabled
        // with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limit_per_sec = std::env::var("RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let rate_limit_burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        Self {
            rp_id,
            rp_origin,
            rp_name,
            token_secret,
            token_ttl_secs,
            secure_cookies,
            port,
            host,
            allowed_origins,
            body_limit_kb,
            timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}
