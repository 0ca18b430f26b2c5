use anyhow::Result;
use uuid::Uuid;

use crate::services::database::DatabaseService;

/// Slot ledger over the per-duration counters. `reserve` takes slots at
/// checkout time, `release` puts them back when a payment fails, and
/// `commit` finalizes a reservation once the payment settles (the decrement
/// already happened at reserve time, so commit is bookkeeping only).
#[derive(Clone)]
pub struct InventoryLedger {
    db: DatabaseService,
}

impl InventoryLedger {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Returns false when the duration has fewer than `quantity` slots left.
    pub async fn reserve(&self, plan_id: &Uuid, label: &str, quantity: u32) -> Result<bool> {
        let reserved = self.db.reserve_slots(plan_id, label, quantity).await?;
        if reserved {
            log::debug!(
                "inventory reserved plan={} duration={} qty={}",
                plan_id,
                label,
                quantity
            );
        }
        Ok(reserved)
    }

    pub async fn commit(&self, plan_id: &Uuid, label: &str, quantity: u32) -> Result<()> {
        log::debug!(
            "inventory committed plan={} duration={} qty={}",
            plan_id,
            label,
            quantity
        );
        Ok(())
    }

    pub async fn release(&self, plan_id: &Uuid, label: &str, quantity: u32) -> Result<()> {
        self.db.release_slots(plan_id, label, quantity).await?;
        log::debug!(
            "inventory released plan={} duration={} qty={}",
            plan_id,
            label,
            quantity
        );
        Ok(())
    }
}
