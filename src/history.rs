//! Price history.
//!
//! A sorted set per item (`history:{id}`) holds JSON-encoded observations
//! scored by their timestamp. Sampling is change-triggered: an observation
//! is appended only when its price differs from the most recent stored
//! entry, so a flat price produces a single entry no matter how often it is
//! observed. Every append trims entries past the retention horizon.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, TrackerError};
use crate::store::Store;
use crate::types::PriceObservation;

fn history_key(id: &str) -> String {
    format!("history:{}", id)
}

#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn Store>,
    retention_seconds: i64,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn Store>, retention_seconds: i64) -> Self {
        Self {
            store,
            retention_seconds,
        }
    }

    /// Record an observation. Returns whether a new entry was stored
    /// (`false` when the price matches the most recent stored entry).
    pub async fn record(&self, id: &str, observation: &PriceObservation) -> Result<bool> {
        let key = history_key(id);

        let last = self.store.zrange(&key, -1, -1).await?;
        if let Some(raw) = last.first() {
            let previous: PriceObservation = serde_json::from_str(raw).map_err(|e| {
                TrackerError::Parse(format!("corrupt history entry for {}: {}", id, e))
            })?;
            if previous.price == observation.price {
                return Ok(false);
            }
        }

        let member = serde_json::to_string(observation)
            .map_err(|e| TrackerError::Parse(format!("failed to serialize observation: {}", e)))?;
        self.store
            .zadd(&key, &member, observation.observed_at as f64)
            .await?;

        // Trim everything past the retention horizon.
        let cutoff = observation.observed_at - self.retention_seconds;
        if cutoff > 0 {
            let removed = self.store.zrembyscore(&key, 0.0, cutoff as f64).await?;
            if removed > 0 {
                debug!("Trimmed {} expired history entries for {}", removed, id);
            }
        }

        Ok(true)
    }

    /// Retained observations in chronological order. Malformed entries are
    /// skipped.
    pub async fn list(&self, id: &str) -> Result<Vec<PriceObservation>> {
        let members = self.store.zrange(&history_key(id), 0, -1).await?;

        let mut entries = Vec::with_capacity(members.len());
        for raw in &members {
            match serde_json::from_str::<PriceObservation>(raw) {
                Ok(observation) => entries.push(observation),
                Err(e) => warn!("Skipping corrupt history entry for {}: {}", id, e),
            }
        }
        Ok(entries)
    }

    /// Lowest retained price. Falls back to the caller's live observation
    /// when no history is retained.
    pub async fn lowest(
        &self,
        id: &str,
        live: Option<&PriceObservation>,
    ) -> Result<Option<Decimal>> {
        let entries = self.list(id).await?;
        let min = entries.iter().map(|o| o.price).min();
        Ok(min.or_else(|| live.map(|o| o.price)))
    }

    /// Drop the entire series in one operation.
    pub async fn clear(&self, id: &str) -> Result<()> {
        self.store.del(&history_key(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const RETENTION: i64 = 1_000;

    fn history() -> HistoryStore {
        HistoryStore::new(Arc::new(MemoryStore::default()), RETENTION)
    }

    fn observation(price_major: i64, observed_at: i64) -> PriceObservation {
        PriceObservation {
            price: Decimal::from(price_major),
            discount_percent: 10,
            observed_at,
        }
    }

    #[tokio::test]
    async fn test_repeated_price_stores_one_entry() {
        let history = history();

        assert!(history.record("570", &observation(450, 100)).await.unwrap());
        assert!(!history.record("570", &observation(450, 200)).await.unwrap());
        assert!(!history.record("570", &observation(450, 300)).await.unwrap());

        assert_eq!(history.list("570").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_price_change_appends() {
        let history = history();

        history.record("570", &observation(450, 100)).await.unwrap();
        history.record("570", &observation(400, 200)).await.unwrap();
        history.record("570", &observation(450, 300)).await.unwrap();

        let entries = history.list("570").await.unwrap();
        let prices: Vec<Decimal> = entries.iter().map(|o| o.price).collect();
        assert_eq!(
            prices,
            vec![Decimal::from(450), Decimal::from(400), Decimal::from(450)]
        );
    }

    #[tokio::test]
    async fn test_entries_past_retention_are_trimmed() {
        let history = history();

        history.record("570", &observation(450, 100)).await.unwrap();
        history
            .record("570", &observation(400, 100 + RETENTION + 1))
            .await
            .unwrap();

        let entries = history.list("570").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].price, Decimal::from(400));
    }

    #[tokio::test]
    async fn test_list_is_chronological() {
        let history = history();

        history.record("570", &observation(500, 300)).await.unwrap();
        history.record("570", &observation(450, 400)).await.unwrap();

        let entries = history.list("570").await.unwrap();
        assert!(entries[0].observed_at < entries[1].observed_at);
    }

    #[tokio::test]
    async fn test_lowest_over_retained_entries() {
        let history = history();

        history.record("570", &observation(500, 100)).await.unwrap();
        history.record("570", &observation(420, 200)).await.unwrap();
        history.record("570", &observation(480, 300)).await.unwrap();

        let lowest = history.lowest("570", None).await.unwrap();
        assert_eq!(lowest, Some(Decimal::from(420)));
    }

    #[tokio::test]
    async fn test_lowest_falls_back_to_live_observation() {
        let history = history();
        let live = observation(399, 100);

        let lowest = history.lowest("570", Some(&live)).await.unwrap();
        assert_eq!(lowest, Some(Decimal::from(399)));

        assert_eq!(history.lowest("570", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_empties_series() {
        let history = history();

        history.record("570", &observation(450, 100)).await.unwrap();
        history.clear("570").await.unwrap();

        assert!(history.list("570").await.unwrap().is_empty());
    }
}
