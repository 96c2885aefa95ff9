//! Service configuration.

use serde::Deserialize;
use std::path::Path;
use theraptrack_core::DEFAULT_CURRENCY;

/// Default Razorpay REST endpoint.
pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/theraptrack").
    pub data_dir: String,

    /// HS256 secret for user JWTs. User endpoints reject every request when unset.
    pub jwt_secret: Option<String>,

    /// Expected JWT issuer (default: "theraptrack").
    pub jwt_issuer: String,

    /// Admin API key for provisioning endpoints.
    pub admin_api_key: Option<String>,

    /// Razorpay key ID (public, handed to the checkout).
    pub razorpay_key_id: Option<String>,

    /// Razorpay key secret (orders and payment signatures).
    pub razorpay_key_secret: Option<String>,

    /// Razorpay webhook secret.
    pub razorpay_webhook_secret: Option<String>,

    /// Razorpay API base URL.
    pub razorpay_api_url: String,

    /// ISO currency for orders (default: "INR").
    pub payment_currency: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Razorpay secrets file structure.
#[derive(Debug, Deserialize)]
struct RazorpaySecrets {
    key_id: String,
    key_secret: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

/// Razorpay credentials, from a secrets file or the environment.
#[derive(Debug, Default, PartialEq, Eq)]
struct RazorpayCredentials {
    key_id: Option<String>,
    key_secret: Option<String>,
    webhook_secret: Option<String>,
}

impl From<RazorpaySecrets> for RazorpayCredentials {
    fn from(secrets: RazorpaySecrets) -> Self {
        Self {
            key_id: Some(secrets.key_id),
            key_secret: Some(secrets.key_secret),
            webhook_secret: secrets.webhook_secret.filter(|s| !s.is_empty()),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let razorpay = load_razorpay_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/theraptrack".into()),
            jwt_secret: std::env::var("JWT_SECRET").ok(),
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "theraptrack".into()),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            razorpay_key_id: razorpay.key_id,
            razorpay_key_secret: razorpay.key_secret,
            razorpay_webhook_secret: razorpay.webhook_secret,
            razorpay_api_url: std::env::var("RAZORPAY_API_URL")
                .unwrap_or_else(|_| DEFAULT_RAZORPAY_API_URL.into()),
            payment_currency: std::env::var("PAYMENT_CURRENCY")
                .unwrap_or_else(|_| DEFAULT_CURRENCY.into()),
            cors_origins: parse_origins(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".into()),
            ),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Whether Razorpay orders can be created.
    #[must_use]
    pub fn has_razorpay(&self) -> bool {
        self.razorpay_key_id.is_some() && self.razorpay_key_secret.is_some()
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Load Razorpay secrets from file or environment.
fn load_razorpay_secrets() -> RazorpayCredentials {
    let secret_paths = [
        ".secrets/razorpay.json",
        "theraptrack/.secrets/razorpay.json",
        "../.secrets/razorpay.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<RazorpaySecrets>(path) {
            tracing::info!(path = %path, "Loaded Razorpay secrets from file");
            return secrets.into();
        }
    }

    tracing::debug!("Razorpay secrets file not found, using environment variables");
    RazorpayCredentials {
        key_id: std::env::var("RAZORPAY_KEY_ID").ok(),
        key_secret: std::env::var("RAZORPAY_KEY_SECRET").ok(),
        webhook_secret: std::env::var("RAZORPAY_WEBHOOK_SECRET").ok(),
    }
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<T, std::io::Error> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/theraptrack".into(),
            jwt_secret: None,
            jwt_issuer: "theraptrack".into(),
            admin_api_key: None,
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_webhook_secret: None,
            razorpay_api_url: DEFAULT_RAZORPAY_API_URL.into(),
            payment_currency: DEFAULT_CURRENCY.into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
