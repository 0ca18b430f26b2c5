use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub plan_id: Uuid,
    pub duration_label: String,
    pub quantity: u32,
}

/// One cart per user. The cart is live state only; checkout copies it into
/// an order snapshot and the live cart survives until the payment succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddCartItemRequest {
    pub plan_id: Uuid,

    #[validate(length(min = 1, max = 50, message = "Duration label is required"))]
    pub duration_label: String,

    #[validate(range(min = 1, max = 10, message = "Quantity must be between 1 and 10"))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RemoveCartItemRequest {
    pub plan_id: Uuid,

    #[validate(length(min = 1, max = 50, message = "Duration label is required"))]
    pub duration_label: String,
}

impl Cart {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add_item(&mut self, plan_id: Uuid, duration_label: String, quantity: u32) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.plan_id == plan_id && item.duration_label == duration_label)
        {
            existing.quantity += quantity;
        } else {
            self.items.push(CartItem {
                plan_id,
                duration_label,
                quantity,
            });
        }
        self.updated_at = Utc::now();
    }

    pub fn remove_item(&mut self, plan_id: Uuid, duration_label: &str) -> bool {
        let before = self.items.len();
        self.items
            .retain(|item| !(item.plan_id == plan_id && item.duration_label == duration_label));
        let removed = self.items.len() < before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_quantity() {
        let plan_id = Uuid::new_v4();
        let mut cart = Cart::empty(Uuid::new_v4());

        cart.add_item(plan_id, "1 month".to_string(), 1);
        cart.add_item(plan_id, "1 month".to_string(), 2);
        cart.add_item(plan_id, "3 months".to_string(), 1);

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].quantity, 3);
    }

    #[test]
    fn test_remove_item() {
        let plan_id = Uuid::new_v4();
        let mut cart = Cart::empty(Uuid::new_v4());
        cart.add_item(plan_id, "1 month".to_string(), 1);

        assert!(cart.remove_item(plan_id, "1 month"));
        assert!(cart.is_empty());
        assert!(!cart.remove_item(plan_id, "1 month"));
    }
}
