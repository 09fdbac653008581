//! Steam storefront client.
//!
//! Looks up current pricing for apps (`appdetails`) and packages
//! (`packagedetails`). Prices arrive in minor currency units and are
//! normalized to major units. A missing price block or a price of exactly
//! zero means the item is not currently purchasable.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SteamConfig;
use crate::error::{Result, TrackerError};
use crate::types::{ItemKind, PriceObservation, TrackedItem};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A storefront listing: display name plus the current price, if the item
/// is purchasable right now.
#[derive(Debug, Clone)]
pub struct CatalogListing {
    pub name: String,
    pub price: Option<PriceObservation>,
}

/// External pricing source boundary.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Resolve an item reference to its storefront listing.
    async fn lookup(&self, kind: ItemKind, id: &str) -> Result<CatalogListing>;

    /// Current price for a tracked item. Every failure mode (transport
    /// error, malformed payload, no purchasable price) collapses to `None`;
    /// this call never errors past the boundary.
    async fn fetch_price(&self, item: &TrackedItem) -> Option<PriceObservation>;
}

pub struct SteamClient {
    http: reqwest::Client,
    api_base: String,
    country: String,
}

impl SteamClient {
    pub fn new(config: &SteamConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| TrackerError::Upstream(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            country: config.country.clone(),
        })
    }

    /// Endpoint for one item lookup. Apps and packages live on different
    /// storefront endpoints with differently named id parameters.
    fn endpoint_url(&self, kind: ItemKind, id: &str) -> String {
        match kind {
            ItemKind::App => format!(
                "{}/appdetails?appids={}&cc={}",
                self.api_base, id, self.country
            ),
            ItemKind::Sub => format!(
                "{}/packagedetails?packageids={}&cc={}",
                self.api_base, id, self.country
            ),
        }
    }
}

#[async_trait]
impl PriceSource for SteamClient {
    async fn lookup(&self, kind: ItemKind, id: &str) -> Result<CatalogListing> {
        let url = self.endpoint_url(kind, id);
        debug!("Fetching storefront listing: {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| TrackerError::Upstream(format!("steam request failed: {}", e)))?;

        let payload: HashMap<String, CatalogEntry> = response
            .json()
            .await
            .map_err(|e| TrackerError::Upstream(format!("invalid steam response: {}", e)))?;

        let entry = payload.get(id).ok_or_else(|| {
            TrackerError::Upstream(format!("steam response has no entry for {} {}", kind, id))
        })?;

        listing_from_entry(kind, entry)
    }

    async fn fetch_price(&self, item: &TrackedItem) -> Option<PriceObservation> {
        match self.lookup(item.kind, &item.id).await {
            Ok(listing) => {
                if listing.price.is_none() {
                    debug!("No purchasable price for {} ({})", item.name, item.id);
                }
                listing.price
            }
            Err(e) => {
                warn!("Price check failed for {} ({}): {}", item.name, item.id, e);
                None
            }
        }
    }
}

// ============================================================================
// STOREFRONT PAYLOAD
// ============================================================================

/// One entry of the storefront response map (`{ "<id>": { ... } }`).
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub success: bool,
    pub data: Option<CatalogData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogData {
    pub name: String,
    /// Price block for apps.
    pub price_overview: Option<PriceBlock>,
    /// Price block for packages.
    pub price: Option<PriceBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceBlock {
    /// Current price in minor currency units (cents / paise).
    #[serde(rename = "final")]
    pub final_minor: i64,
    #[serde(default)]
    pub discount_percent: i64,
}

/// Map a storefront entry to a listing.
///
/// `success == false` (or a successful entry without data) means the
/// storefront has nothing sellable under that id. A present price block
/// with `final == 0` is treated as not purchasable rather than free.
pub fn listing_from_entry(kind: ItemKind, entry: &CatalogEntry) -> Result<CatalogListing> {
    if !entry.success {
        return Err(TrackerError::NotAvailable(
            "storefront returned an unsuccessful response".to_string(),
        ));
    }

    let data = entry.data.as_ref().ok_or_else(|| {
        TrackerError::NotAvailable("storefront entry has no data".to_string())
    })?;

    let block = match kind {
        ItemKind::App => data.price_overview.as_ref(),
        ItemKind::Sub => data.price.as_ref(),
    };

    let price = block.and_then(|block| {
        if block.final_minor == 0 {
            return None;
        }
        Some(PriceObservation {
            price: Decimal::new(block.final_minor, 2),
            discount_percent: block.discount_percent,
            observed_at: Utc::now().timestamp(),
        })
    });

    Ok(CatalogListing {
        name: data.name.clone(),
        price,
    })
}
