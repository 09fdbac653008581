//! Price-check engine.
//!
//! One `run_check` pass loads the full registry, fans out a price fetch per
//! item, records history for every successful observation, and gathers the
//! items whose price dropped to or below their target while outside the
//! notification cooldown. Qualifying items are claimed, notified with a
//! single batched email, and their cooldowns committed only once the
//! dispatch is confirmed. Any single item failing — fetch, history write,
//! eligibility read — is logged and skipped without touching the rest of
//! the batch.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cooldown::CooldownTracker;
use crate::error::Result;
use crate::history::HistoryStore;
use crate::notifier::Notifier;
use crate::registry::ItemRegistry;
use crate::steam::PriceSource;
use crate::types::{CheckSummary, PriceAlert, TrackedItem};

#[derive(Clone)]
pub struct CheckEngine {
    registry: ItemRegistry,
    history: HistoryStore,
    cooldown: CooldownTracker,
    source: Arc<dyn PriceSource>,
    notifier: Arc<dyn Notifier>,
}

impl CheckEngine {
    pub fn new(
        registry: ItemRegistry,
        history: HistoryStore,
        cooldown: CooldownTracker,
        source: Arc<dyn PriceSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            history,
            cooldown,
            source,
            notifier,
        }
    }

    /// Run one full check over the registry.
    pub async fn run_check(&self) -> Result<CheckSummary> {
        // Step 1: Load the registry; nothing tracked means nothing to do.
        let items = self.registry.list().await?;
        if items.is_empty() {
            debug!("No tracked items, skipping check");
            return Ok(CheckSummary::default());
        }

        let checked = items.len();
        info!("Checking {} tracked item(s)", checked);

        // Step 2: One pipeline per item, all pending concurrently.
        // Completion order does not matter and items never block each other.
        let candidates: Vec<PriceAlert> =
            join_all(items.into_iter().map(|item| self.evaluate(item)))
                .await
                .into_iter()
                .flatten()
                .collect();

        // Step 3: Claim each candidate so an overlapping run cannot
        // dispatch for the same item.
        let mut batch = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self.cooldown.try_claim(&candidate.item.id).await {
                Ok(true) => batch.push(candidate),
                Ok(false) => debug!("Dispatch already claimed for {}", candidate.item.id),
                Err(e) => warn!("Claim failed for {}: {}", candidate.item.id, e),
            }
        }

        if batch.is_empty() {
            return Ok(CheckSummary {
                checked,
                notified: 0,
            });
        }

        // Step 4: One batched email; commit cooldowns only on confirmed
        // dispatch, otherwise release the claims so the next cycle retries.
        if self.notifier.send(&batch).await {
            let now = Utc::now().timestamp();
            let commits = join_all(batch.iter().map(|alert| {
                self.cooldown
                    .commit(&alert.item.id, now, alert.observation.price)
            }))
            .await;
            for (alert, result) in batch.iter().zip(commits) {
                if let Err(e) = result {
                    warn!("Cooldown commit failed for {}: {}", alert.item.id, e);
                }
            }

            info!("Notified {} item(s)", batch.len());
            Ok(CheckSummary {
                checked,
                notified: batch.len(),
            })
        } else {
            warn!("Alert dispatch failed, releasing {} claim(s)", batch.len());
            let releases =
                join_all(batch.iter().map(|alert| self.cooldown.release(&alert.item.id))).await;
            for (alert, result) in batch.iter().zip(releases) {
                if let Err(e) = result {
                    warn!("Claim release failed for {}: {}", alert.item.id, e);
                }
            }

            Ok(CheckSummary {
                checked,
                notified: 0,
            })
        }
    }

    /// Per-item pipeline: fetch → record history → threshold → cooldown.
    async fn evaluate(&self, item: TrackedItem) -> Option<PriceAlert> {
        let observation = self.source.fetch_price(&item).await?;

        // History tracks real price movement regardless of alerting.
        if let Err(e) = self.history.record(&item.id, &observation).await {
            warn!("History record failed for {}: {}", item.id, e);
        }

        if observation.price > item.target_price {
            return None;
        }

        match self
            .cooldown
            .is_eligible(&item.id, observation.observed_at)
            .await
        {
            Ok(true) => Some(PriceAlert { item, observation }),
            Ok(false) => {
                debug!("Cooldown active for {} ({})", item.name, item.id);
                None
            }
            Err(e) => {
                warn!("Eligibility check failed for {}: {}", item.id, e);
                None
            }
        }
    }
}
