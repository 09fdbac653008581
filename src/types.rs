use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TrackerError};

/// Kind of store item being tracked. Selects the storefront endpoint
/// (`appdetails` vs `packagedetails`) and the price field in its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    App,
    Sub,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::App => "app",
            ItemKind::Sub => "sub",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A store item being watched for a price drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedItem {
    /// Steam numeric id (app id or package id).
    pub id: String,
    pub kind: ItemKind,
    /// Display name, captured from the storefront at registration time.
    pub name: String,
    /// Alert threshold, in major currency units.
    pub target_price: Decimal,
}

impl TrackedItem {
    /// Store page deep link for this item.
    pub fn store_url(&self) -> String {
        format!("https://store.steampowered.com/{}/{}", self.kind, self.id)
    }
}

/// A single observed price point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub price: Decimal,
    pub discount_percent: i64,
    /// Unix timestamp (seconds).
    pub observed_at: i64,
}

/// An item that qualified for a notification, with the observation that
/// triggered it.
#[derive(Debug, Clone)]
pub struct PriceAlert {
    pub item: TrackedItem,
    pub observation: PriceObservation,
}

/// Result summary of one check run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CheckSummary {
    /// Tracked items examined.
    pub checked: usize,
    /// Items that passed threshold + cooldown and were successfully notified.
    pub notified: usize,
}

/// Parse a store page URL into `(kind, id)`.
///
/// Accepts the usual page URL shapes, with or without scheme and with a
/// trailing slug or query string:
/// `https://store.steampowered.com/app/570/Dota_2/` → `(App, "570")`.
pub fn parse_store_url(url: &str) -> Result<(ItemKind, String)> {
    let rest = url
        .split("store.steampowered.com/")
        .nth(1)
        .ok_or_else(|| TrackerError::Validation(format!("not a Steam store URL: {}", url)))?;

    let mut segments = rest.split('/');

    let kind = match segments.next() {
        Some("app") => ItemKind::App,
        Some("sub") => ItemKind::Sub,
        _ => {
            return Err(TrackerError::Validation(format!(
                "store URL must point at an app or sub page: {}",
                url
            )))
        }
    };

    let id: String = segments
        .next()
        .unwrap_or("")
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if id.is_empty() {
        return Err(TrackerError::Validation(format!(
            "store URL has no numeric item id: {}",
            url
        )));
    }

    Ok((kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_app_url() {
        let (kind, id) = parse_store_url("https://store.steampowered.com/app/570/Dota_2/").unwrap();
        assert_eq!(kind, ItemKind::App);
        assert_eq!(id, "570");
    }

    #[test]
    fn test_parse_sub_url_without_scheme() {
        let (kind, id) = parse_store_url("store.steampowered.com/sub/12345").unwrap();
        assert_eq!(kind, ItemKind::Sub);
        assert_eq!(id, "12345");
    }

    #[test]
    fn test_parse_url_with_query_string() {
        let (kind, id) = parse_store_url("https://store.steampowered.com/app/570?cc=IN").unwrap();
        assert_eq!(kind, ItemKind::App);
        assert_eq!(id, "570");
    }

    #[test]
    fn test_parse_rejects_foreign_host() {
        assert!(parse_store_url("https://example.com/app/570").is_err());
    }

    #[test]
    fn test_parse_rejects_other_page_kinds() {
        assert!(parse_store_url("https://store.steampowered.com/bundle/232/").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_id() {
        assert!(parse_store_url("https://store.steampowered.com/app/").is_err());
        assert!(parse_store_url("https://store.steampowered.com/app/abc").is_err());
    }

    #[test]
    fn test_store_url_roundtrip() {
        let item = TrackedItem {
            id: "570".to_string(),
            kind: ItemKind::App,
            name: "Dota 2".to_string(),
            target_price: Decimal::from(500),
        };
        assert_eq!(item.store_url(), "https://store.steampowered.com/app/570");

        let (kind, id) = parse_store_url(&item.store_url()).unwrap();
        assert_eq!(kind, item.kind);
        assert_eq!(id, item.id);
    }
}
