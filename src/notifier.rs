//! Alert email dispatch.
//!
//! Renders one HTML email covering every item that qualified in a check run
//! and sends it through the Resend API. Transport and API failures surface
//! as `false` — the caller simply leaves those items eligible for the next
//! cycle.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AlertConfig;
use crate::error::{Result, TrackerError};
use crate::types::PriceAlert;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound notification boundary.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message covering the whole batch. Returns whether the
    /// dispatch succeeded; never errors past this boundary.
    async fn send(&self, batch: &[PriceAlert]) -> bool;
}

pub struct ResendNotifier {
    http: reqwest::Client,
    api_key: String,
    from: String,
    to: String,
    currency_symbol: String,
    cooldown_days: i64,
}

impl ResendNotifier {
    pub fn new(config: &AlertConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| TrackerError::Upstream(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.resend_api_key.clone(),
            from: config.from.clone(),
            to: config.to.clone(),
            currency_symbol: config.currency_symbol.clone(),
            cooldown_days: config.cooldown_seconds / (24 * 60 * 60),
        })
    }
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, batch: &[PriceAlert]) -> bool {
        let request = EmailRequest {
            from: &self.from,
            to: [self.to.as_str()],
            subject: render_subject(batch.len()),
            html: render_alert_html(batch, &self.currency_symbol, self.cooldown_days),
        };

        let response = self
            .http
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!("Alert email sent for {} item(s)", batch.len());
                true
            }
            Ok(response) => {
                warn!("Alert email rejected: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Alert email failed: {}", e);
                false
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

pub fn render_subject(count: usize) -> String {
    format!("🔥 {} Steam game(s) on sale!", count)
}

/// One card per qualifying item, wrapped in the alert layout.
pub fn render_alert_html(batch: &[PriceAlert], currency_symbol: &str, cooldown_days: i64) -> String {
    let cards: String = batch
        .iter()
        .map(|alert| {
            format!(
                r#"
      <tr>
        <td style="padding:20px;border-bottom:1px solid #eee;">
          <h3 style="margin:0 0 8px 0;color:#1b2838;">{name}</h3>
          <p style="margin:4px 0;">
            <span style="font-weight:bold;">Current:</span> {currency}{current}
          </p>
          <p style="margin:4px 0;">
            <span style="font-weight:bold;">Your Target:</span> {currency}{target}
          </p>
          <a href="{url}"
             style="display:inline-block;margin-top:10px;
             padding:8px 16px;
             background:#171a21;
             color:white;
             text-decoration:none;
             border-radius:6px;
             font-size:14px;">
             View on Steam
          </a>
        </td>
      </tr>"#,
                name = alert.item.name,
                currency = currency_symbol,
                current = alert.observation.price,
                target = alert.item.target_price,
                url = alert.item.store_url(),
            )
        })
        .collect();

    format!(
        r#"
  <div style="font-family:Arial,sans-serif;background:#f4f6f8;padding:30px;">
    <table width="100%" style="max-width:600px;margin:auto;background:white;border-radius:10px;overflow:hidden;">
      <tr>
        <td style="background:#171a21;color:white;padding:20px;text-align:center;">
          <h2 style="margin:0;">Steam Price Alerts</h2>
          <p style="margin:6px 0 0 0;font-size:14px;">
            {count} game(s) matched your target
          </p>
        </td>
      </tr>
{cards}
      <tr>
        <td style="padding:15px;text-align:center;font-size:12px;color:#888;">
          Cooldown active for {cooldown_days} days per game.
        </td>
      </tr>
    </table>
  </div>"#,
        count = batch.len(),
        cards = cards,
        cooldown_days = cooldown_days,
    )
}
