use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use surrealdb::engine::local::{Db, File, Mem};
use surrealdb::Surreal;
use uuid::Uuid;

use crate::models::{
    cart::Cart,
    order::{Order, Payment},
    otp::{OneTimeCode, OtpPurpose},
    plan::{Plan, PlanDuration, PlanWithDurations},
    user::User,
};

/// Rows returned by conditional updates; only the record id comes back, so
/// an empty result means the guard did not match and nothing was applied.
#[derive(Debug, Deserialize)]
struct RowId {
    #[allow(dead_code)]
    id: Uuid,
}

#[derive(Clone)]
pub struct DatabaseService {
    db: Surreal<Db>,
}

impl DatabaseService {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = if database_url.starts_with("memory://") {
            Surreal::new::<Mem>(()).await?
        } else if database_url.starts_with("file://") {
            let path = database_url.strip_prefix("file://").unwrap_or("substore.db");
            Surreal::new::<File>(path).await?
        } else {
            return Err(anyhow!("Unsupported database URL: {}", database_url));
        };

        db.use_ns("substore").use_db("main").await?;

        let service = Self { db };
        service.initialize_schema().await?;

        Ok(service)
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.db
            .query(
                "
            DEFINE TABLE users SCHEMALESS;
            DEFINE INDEX unique_phone ON users COLUMNS phone UNIQUE;
            DEFINE INDEX unique_user_email ON users COLUMNS email UNIQUE;

            DEFINE TABLE otps SCHEMALESS;
            DEFINE INDEX otp_subject ON otps COLUMNS subject;

            DEFINE TABLE plans SCHEMALESS;
            DEFINE TABLE durations SCHEMALESS;
            DEFINE INDEX unique_plan_duration ON durations COLUMNS plan_id, label UNIQUE;

            DEFINE TABLE carts SCHEMALESS;
            DEFINE TABLE orders SCHEMALESS;

            DEFINE TABLE payments SCHEMALESS;
            DEFINE INDEX unique_merchant_txn ON payments COLUMNS merchant_transaction_id UNIQUE;
        ",
            )
            .await?
            .check()?;

        log::info!("Database schema initialized");
        Ok(())
    }

    // User operations

    pub async fn create_user(&self, user: &User) -> Result<User> {
        if self.get_user_by_phone(&user.phone).await?.is_some() {
            return Err(anyhow!("User with phone {} already exists", user.phone));
        }
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(anyhow!("User with email {} already exists", user.email));
        }

        self.db
            .query("CREATE users CONTENT $user RETURN NONE")
            .bind(("user", user))
            .await?
            .check()?;

        Ok(user.clone())
    }

    pub async fn get_user(&self, user_id: &Uuid) -> Result<Option<User>> {
        let user: Option<User> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM type::thing('users', $id)")
            .bind(("id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(user)
    }

    pub async fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let user: Option<User> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM users WHERE phone = $phone")
            .bind(("phone", phone))
            .await?
            .take(0)?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user: Option<User> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM users WHERE email = $email")
            .bind(("email", email))
            .await?
            .take(0)?;
        Ok(user)
    }

    /// Append a plan to the user's owned subscriptions. `array::union`
    /// keeps the list duplicate-free even if a settlement is replayed.
    pub async fn add_user_subscription(&self, user_id: &Uuid, plan_id: &Uuid) -> Result<()> {
        self.db
            .query(
                "UPDATE type::thing('users', $id)
                 SET subscriptions = array::union(subscriptions, [$plan]), updated_at = $now
                 RETURN NONE",
            )
            .bind(("id", user_id.to_string()))
            .bind(("plan", plan_id.to_string()))
            .bind(("now", Utc::now()))
            .await?
            .check()?;
        Ok(())
    }

    // OTP operations

    /// Delete-then-create as one transaction so two concurrent issuances for
    /// the same subject cannot leave both codes live.
    pub async fn replace_otp(&self, otp: &OneTimeCode) -> Result<()> {
        self.db
            .query(
                "BEGIN TRANSACTION;
                 DELETE otps WHERE subject = $subject;
                 CREATE otps CONTENT $otp RETURN NONE;
                 COMMIT TRANSACTION;",
            )
            .bind(("subject", &otp.subject))
            .bind(("otp", otp))
            .await?
            .check()?;
        Ok(())
    }

    pub async fn live_code_exists(&self, code: &str, cutoff: DateTime<Utc>) -> Result<bool> {
        let rows: Vec<RowId> = self
            .db
            .query("SELECT meta::id(id) AS id FROM otps WHERE code = $code AND created_at > $cutoff")
            .bind(("code", code))
            .bind(("cutoff", cutoff))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }

    pub async fn latest_otp(
        &self,
        subject: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OneTimeCode>> {
        let otp: Option<OneTimeCode> = self
            .db
            .query(
                "SELECT *, meta::id(id) AS id FROM otps
                 WHERE subject = $subject AND purpose = $purpose
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(("subject", subject))
            .bind(("purpose", purpose))
            .await?
            .take(0)?;
        Ok(otp)
    }

    pub async fn delete_otp(&self, otp_id: &Uuid) -> Result<()> {
        self.db
            .query("DELETE type::thing('otps', $id)")
            .bind(("id", otp_id.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    // Plan operations

    pub async fn create_plan(
        &self,
        plan: &Plan,
        durations: &[PlanDuration],
    ) -> Result<PlanWithDurations> {
        self.db
            .query("CREATE plans CONTENT $plan RETURN NONE")
            .bind(("plan", plan))
            .await?
            .check()?;

        for duration in durations {
            self.db
                .query("CREATE durations CONTENT $duration RETURN NONE")
                .bind(("duration", duration))
                .await?
                .check()?;
        }

        Ok(PlanWithDurations {
            plan: plan.clone(),
            durations: durations.to_vec(),
        })
    }

    /// Replace the plan's catalog fields and its duration rows.
    pub async fn update_plan(
        &self,
        plan: &Plan,
        durations: &[PlanDuration],
    ) -> Result<PlanWithDurations> {
        self.db
            .query(
                "BEGIN TRANSACTION;
                 UPDATE type::thing('plans', $id)
                 SET name = $name, description = $description, is_active = $is_active, updated_at = $now
                 RETURN NONE;
                 DELETE durations WHERE plan_id = $id;
                 COMMIT TRANSACTION;",
            )
            .bind(("id", plan.id.to_string()))
            .bind(("name", &plan.name))
            .bind(("description", &plan.description))
            .bind(("is_active", plan.is_active))
            .bind(("now", Utc::now()))
            .await?
            .check()?;

        for duration in durations {
            self.db
                .query("CREATE durations CONTENT $duration RETURN NONE")
                .bind(("duration", duration))
                .await?
                .check()?;
        }

        Ok(PlanWithDurations {
            plan: plan.clone(),
            durations: durations.to_vec(),
        })
    }

    pub async fn get_plan(&self, plan_id: &Uuid) -> Result<Option<PlanWithDurations>> {
        let plan: Option<Plan> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM type::thing('plans', $id)")
            .bind(("id", plan_id.to_string()))
            .await?
            .take(0)?;

        let plan = match plan {
            Some(plan) => plan,
            None => return Ok(None),
        };

        let durations = self.durations_for_plan(plan_id).await?;
        Ok(Some(PlanWithDurations { plan, durations }))
    }

    pub async fn list_plans(&self, active_only: bool) -> Result<Vec<PlanWithDurations>> {
        let plans: Vec<Plan> = if active_only {
            self.db
                .query("SELECT *, meta::id(id) AS id FROM plans WHERE is_active = true ORDER BY created_at DESC")
                .await?
                .take(0)?
        } else {
            self.db
                .query("SELECT *, meta::id(id) AS id FROM plans ORDER BY created_at DESC")
                .await?
                .take(0)?
        };

        let mut result = Vec::with_capacity(plans.len());
        for plan in plans {
            let durations = self.durations_for_plan(&plan.id).await?;
            result.push(PlanWithDurations { plan, durations });
        }
        Ok(result)
    }

    async fn durations_for_plan(&self, plan_id: &Uuid) -> Result<Vec<PlanDuration>> {
        let durations: Vec<PlanDuration> = self
            .db
            .query(
                "SELECT *, meta::id(id) AS id FROM durations
                 WHERE plan_id = $plan ORDER BY start_date ASC",
            )
            .bind(("plan", plan_id.to_string()))
            .await?
            .take(0)?;
        Ok(durations)
    }

    pub async fn get_duration(
        &self,
        plan_id: &Uuid,
        label: &str,
    ) -> Result<Option<PlanDuration>> {
        let duration: Option<PlanDuration> = self
            .db
            .query(
                "SELECT *, meta::id(id) AS id FROM durations
                 WHERE plan_id = $plan AND label = $label",
            )
            .bind(("plan", plan_id.to_string()))
            .bind(("label", label))
            .await?
            .take(0)?;
        Ok(duration)
    }

    // Inventory counters

    /// Atomic decrement with a floor check; the guard and the write are one
    /// statement, so two checkouts racing for the last slot cannot both win.
    pub async fn reserve_slots(&self, plan_id: &Uuid, label: &str, quantity: u32) -> Result<bool> {
        let rows: Vec<RowId> = self
            .db
            .query(
                "UPDATE durations
                 SET slots_available -= $qty, updated_at = $now
                 WHERE plan_id = $plan AND label = $label
                   AND is_active = true AND slots_available >= $qty
                 RETURN meta::id(id) AS id",
            )
            .bind(("plan", plan_id.to_string()))
            .bind(("label", label))
            .bind(("qty", quantity))
            .bind(("now", Utc::now()))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }

    /// Restore reserved slots, capped at the configured total.
    pub async fn release_slots(&self, plan_id: &Uuid, label: &str, quantity: u32) -> Result<()> {
        self.db
            .query(
                "UPDATE durations
                 SET slots_available = math::min(slots_available + $qty, total_slots),
                     updated_at = $now
                 WHERE plan_id = $plan AND label = $label
                 RETURN NONE",
            )
            .bind(("plan", plan_id.to_string()))
            .bind(("label", label))
            .bind(("qty", quantity))
            .bind(("now", Utc::now()))
            .await?
            .check()?;
        Ok(())
    }

    // Cart operations

    pub async fn get_cart(&self, user_id: &Uuid) -> Result<Cart> {
        let cart: Option<Cart> = self
            .db
            .query("SELECT * FROM type::thing('carts', $id)")
            .bind(("id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(cart.unwrap_or_else(|| Cart::empty(*user_id)))
    }

    pub async fn save_cart(&self, cart: &Cart) -> Result<()> {
        self.db
            .query("UPDATE type::thing('carts', $id) CONTENT $cart RETURN NONE")
            .bind(("id", cart.user_id.to_string()))
            .bind(("cart", cart))
            .await?
            .check()?;
        Ok(())
    }

    pub async fn clear_cart(&self, user_id: &Uuid) -> Result<()> {
        self.save_cart(&Cart::empty(*user_id)).await
    }

    // Order operations

    pub async fn create_order(&self, order: &Order) -> Result<()> {
        self.db
            .query("CREATE orders CONTENT $order RETURN NONE")
            .bind(("order", order))
            .await?
            .check()?;
        Ok(())
    }

    pub async fn get_order(&self, order_id: &Uuid) -> Result<Option<Order>> {
        let order: Option<Order> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM type::thing('orders', $id)")
            .bind(("id", order_id.to_string()))
            .await?
            .take(0)?;
        Ok(order)
    }

    pub async fn set_order_end_date(&self, order_id: &Uuid, end_date: DateTime<Utc>) -> Result<()> {
        self.db
            .query(
                "UPDATE type::thing('orders', $id)
                 SET end_date = $end, updated_at = $now RETURN NONE",
            )
            .bind(("id", order_id.to_string()))
            .bind(("end", end_date))
            .bind(("now", Utc::now()))
            .await?
            .check()?;
        Ok(())
    }

    // Payment operations

    pub async fn create_payment(&self, payment: &Payment) -> Result<()> {
        self.db
            .query("CREATE payments CONTENT $payment RETURN NONE")
            .bind(("payment", payment))
            .await?
            .check()?;
        Ok(())
    }

    pub async fn get_payment(&self, payment_id: &Uuid) -> Result<Option<Payment>> {
        let payment: Option<Payment> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM type::thing('payments', $id)")
            .bind(("id", payment_id.to_string()))
            .await?
            .take(0)?;
        Ok(payment)
    }

    /// Look a payment up by whichever reference the gateway reported: our
    /// merchant transaction id, or the remote order id for webhook flows.
    pub async fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>> {
        let payment: Option<Payment> = self
            .db
            .query(
                "SELECT *, meta::id(id) AS id FROM payments
                 WHERE merchant_transaction_id = $reference OR gateway_order_id = $reference",
            )
            .bind(("reference", reference))
            .await?
            .take(0)?;
        Ok(payment)
    }

    pub async fn set_gateway_order_id(
        &self,
        payment_id: &Uuid,
        gateway_order_id: &str,
    ) -> Result<()> {
        self.db
            .query(
                "UPDATE type::thing('payments', $id)
                 SET gateway_order_id = $gateway_order_id, updated_at = $now RETURN NONE",
            )
            .bind(("id", payment_id.to_string()))
            .bind(("gateway_order_id", gateway_order_id))
            .bind(("now", Utc::now()))
            .await?
            .check()?;
        Ok(())
    }

    /// Compare-and-set `Pending -> Success`. Returns false when the payment
    /// was already terminal, which makes replayed confirmations no-ops.
    pub async fn settle_payment_success(
        &self,
        payment_id: &Uuid,
        gateway_payment_id: Option<&str>,
    ) -> Result<bool> {
        let now = Utc::now();
        let rows: Vec<RowId> = self
            .db
            .query(
                "UPDATE type::thing('payments', $id)
                 SET status = 'Success', gateway_payment_id = $gateway_payment_id,
                     payment_date = $now, updated_at = $now
                 WHERE status = 'Pending'
                 RETURN meta::id(id) AS id",
            )
            .bind(("id", payment_id.to_string()))
            .bind(("gateway_payment_id", gateway_payment_id))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }

    /// Compare-and-set `Pending -> Failed`.
    pub async fn settle_payment_failed(&self, payment_id: &Uuid, reason: &str) -> Result<bool> {
        let now = Utc::now();
        let rows: Vec<RowId> = self
            .db
            .query(
                "UPDATE type::thing('payments', $id)
                 SET status = 'Failed', failure_reason = $reason, updated_at = $now
                 WHERE status = 'Pending'
                 RETURN meta::id(id) AS id",
            )
            .bind(("id", payment_id.to_string()))
            .bind(("reason", reason))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }

    pub async fn list_payments_by_user(&self, user_id: &Uuid) -> Result<Vec<Payment>> {
        let payments: Vec<Payment> = self
            .db
            .query(
                "SELECT *, meta::id(id) AS id FROM payments
                 WHERE user_id = $user ORDER BY created_at DESC",
            )
            .bind(("user", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(payments)
    }

    pub async fn health_check(&self) -> Result<()> {
        self.db.health().await?;
        Ok(())
    }
}
