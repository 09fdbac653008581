use serde::Deserialize;

/// Application configuration, loaded once at startup and passed into each
/// component constructor.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Redis connection string
    pub redis_url: String,

    pub server: ServerConfig,
    pub steam: SteamConfig,
    pub alert: AlertConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SteamConfig {
    /// Storefront API base URL
    pub api_base: String,

    /// Country code passed as `cc` — controls the currency of returned prices
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Resend API key
    pub resend_api_key: String,

    /// Sender address
    pub from: String,

    /// Recipient address
    pub to: String,

    /// Currency symbol used when rendering prices in alert emails
    pub currency_symbol: String,

    /// Minimum gap between two notifications for the same item (seconds)
    pub cooldown_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Maximum age of retained price-history entries (days)
    pub retention_days: i64,
}

impl HistoryConfig {
    pub fn retention_seconds(&self) -> i64 {
        self.retention_days * 24 * 60 * 60
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1".to_string()),
            server: ServerConfig {
                host: std::env::var("SERVER_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()?,
            },
            steam: SteamConfig {
                api_base: std::env::var("STEAM_API_BASE")
                    .unwrap_or_else(|_| "https://store.steampowered.com/api".to_string()),
                country: std::env::var("STEAM_COUNTRY")
                    .unwrap_or_else(|_| "IN".to_string()),
            },
            alert: AlertConfig {
                resend_api_key: std::env::var("RESEND_API_KEY")?,
                from: std::env::var("ALERT_FROM")
                    .unwrap_or_else(|_| "Steam Alerts <onboarding@resend.dev>".to_string()),
                to: std::env::var("ALERT_EMAIL")?,
                currency_symbol: std::env::var("CURRENCY_SYMBOL")
                    .unwrap_or_else(|_| "₹".to_string()),
                cooldown_seconds: std::env::var("COOLDOWN_SECONDS")
                    .unwrap_or_else(|_| (5 * 24 * 60 * 60).to_string())
                    .parse()?,
            },
            history: HistoryConfig {
                retention_days: std::env::var("HISTORY_RETENTION_DAYS")
                    .unwrap_or_else(|_| "180".to_string())
                    .parse()?,
            },
        })
    }
}
