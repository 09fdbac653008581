//! Notification cooldown gate.
//!
//! One record per item at `cooldown:{id}`, holding the timestamp (and
//! price) of the last notification, written with a TTL equal to the
//! cooldown interval. The record is only ever written after a dispatch is
//! confirmed successful — never speculatively.
//!
//! A separate short-lived claim key (`cooldown:claim:{id}`, SET NX) guards
//! the window between the eligibility check and the commit, so two
//! overlapping check runs cannot both dispatch for the same item. A failed
//! dispatch releases its claims; a crashed run's claims expire on their
//! own.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, TrackerError};
use crate::store::Store;

/// How long a dispatch claim lives before expiring on its own (seconds).
const CLAIM_TTL_SECONDS: u64 = 600;

fn record_key(id: &str) -> String {
    format!("cooldown:{}", id)
}

fn claim_key(id: &str) -> String {
    format!("cooldown:claim:{}", id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownRecord {
    /// Unix timestamp of the last successful notification.
    pub last_notified_at: i64,
    /// Price the item was notified at.
    pub price: Decimal,
}

#[derive(Clone)]
pub struct CooldownTracker {
    store: Arc<dyn Store>,
    interval_seconds: i64,
}

impl CooldownTracker {
    pub fn new(store: Arc<dyn Store>, interval_seconds: i64) -> Self {
        Self {
            store,
            interval_seconds,
        }
    }

    /// Whether a notification may be dispatched for this item at `now`:
    /// no record exists, or the interval has fully elapsed.
    pub async fn is_eligible(&self, id: &str, now: i64) -> Result<bool> {
        match self.store.get(&record_key(id)).await? {
            None => Ok(true),
            Some(raw) => {
                let record: CooldownRecord = serde_json::from_str(&raw).map_err(|e| {
                    TrackerError::Parse(format!("corrupt cooldown record for {}: {}", id, e))
                })?;
                Ok(now - record.last_notified_at >= self.interval_seconds)
            }
        }
    }

    /// Claim the right to dispatch for this item. At most one caller wins
    /// until the claim is released or expires.
    pub async fn try_claim(&self, id: &str) -> Result<bool> {
        self.store
            .set_nx_ex(&claim_key(id), "1", CLAIM_TTL_SECONDS)
            .await
    }

    /// Release a claim after a failed dispatch, so the item stays eligible
    /// for the next check cycle.
    pub async fn release(&self, id: &str) -> Result<()> {
        self.store.del(&claim_key(id)).await?;
        Ok(())
    }

    /// Record a confirmed successful dispatch. Overwrites unconditionally;
    /// the record expires with the cooldown interval.
    pub async fn commit(&self, id: &str, at: i64, price: Decimal) -> Result<()> {
        let record = CooldownRecord {
            last_notified_at: at,
            price,
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| TrackerError::Parse(format!("failed to serialize cooldown: {}", e)))?;

        let ttl = self.interval_seconds.max(0) as u64;
        self.store.set_ex(&record_key(id), &json, ttl).await
    }

    /// Remove the cooldown record and any outstanding claim.
    pub async fn clear(&self, id: &str) -> Result<()> {
        self.store.del(&record_key(id)).await?;
        self.store.del(&claim_key(id)).await?;
        Ok(())
    }
}
