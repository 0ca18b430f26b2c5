use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One purchasable duration of a plan. The slot counters are the only
/// contended shared state in the system; `0 <= slots_available <= total_slots`
/// must hold at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDuration {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub label: String,
    pub price: Decimal,
    pub original_price: Decimal,
    pub slots_available: u32,
    pub total_slots: u32,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlanWithDurations {
    #[serde(flatten)]
    pub plan: Plan,
    pub durations: Vec<PlanDuration>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertDurationRequest {
    #[validate(length(min = 1, max = 50, message = "Duration label is required"))]
    pub label: String,

    pub price: Decimal,
    pub original_price: Decimal,
    pub slots_available: u32,
    pub total_slots: u32,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertPlanRequest {
    #[validate(length(min = 2, max = 200, message = "Plan name must be between 2 and 200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: String,

    pub is_active: bool,

    #[validate]
    pub durations: Vec<UpsertDurationRequest>,
}

impl UpsertPlanRequest {
    /// Slot invariant check that validator's derive cannot express.
    pub fn check_slots(&self) -> Result<(), String> {
        for duration in &self.durations {
            if duration.slots_available > duration.total_slots {
                return Err(format!(
                    "duration '{}': slots_available ({}) exceeds total_slots ({})",
                    duration.label, duration.slots_available, duration.total_slots
                ));
            }
            if duration.price > duration.original_price {
                return Err(format!(
                    "duration '{}': price exceeds original_price",
                    duration.label
                ));
            }
            if duration.end_date <= duration.start_date {
                return Err(format!(
                    "duration '{}': end_date must be after start_date",
                    duration.label
                ));
            }
        }
        Ok(())
    }
}

impl Plan {
    pub fn new(request: &UpsertPlanRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            description: request.description.clone(),
            is_active: request.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

impl PlanDuration {
    pub fn new(plan_id: Uuid, request: &UpsertDurationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            plan_id,
            label: request.label.clone(),
            price: request.price,
            original_price: request.original_price,
            slots_available: request.slots_available,
            total_slots: request.total_slots,
            is_active: request.is_active,
            start_date: request.start_date,
            end_date: request.end_date,
            created_at: now,
            updated_at: now,
        }
    }
}
