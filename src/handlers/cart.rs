use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use validator::Validate;

use crate::errors::ApiError;
use crate::models::cart::{AddCartItemRequest, RemoveCartItemRequest};
use crate::models::common::ApiResponse;
use crate::services::database::DatabaseService;
use crate::services::token::AuthedUser;

// GET /cart
#[get("")]
pub async fn get_cart(
    user: AuthedUser,
    db: Data<DatabaseService>,
) -> Result<HttpResponse, ApiError> {
    let cart = db.get_cart(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(cart)))
}

// POST /cart/add
#[post("/add")]
pub async fn add_item(
    user: AuthedUser,
    db: Data<DatabaseService>,
    payload: Json<AddCartItemRequest>,
) -> Result<HttpResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let plan = db
        .get_plan(&payload.plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Plan {}", payload.plan_id)))?;
    if !plan.plan.is_active {
        return Err(ApiError::Validation(format!(
            "Plan '{}' is no longer available",
            plan.plan.name
        )));
    }
    if !plan
        .durations
        .iter()
        .any(|d| d.label == payload.duration_label && d.is_active)
    {
        return Err(ApiError::Validation(format!(
            "Duration '{}' of plan '{}' is no longer available",
            payload.duration_label, plan.plan.name
        )));
    }

    let mut cart = db.get_cart(&user.user_id).await?;
    cart.add_item(
        payload.plan_id,
        payload.duration_label.clone(),
        payload.quantity,
    );
    db.save_cart(&cart).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        cart,
        "Item added to cart".to_string(),
    )))
}

// POST /cart/remove
#[post("/remove")]
pub async fn remove_item(
    user: AuthedUser,
    db: Data<DatabaseService>,
    payload: Json<RemoveCartItemRequest>,
) -> Result<HttpResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let mut cart = db.get_cart(&user.user_id).await?;
    if !cart.remove_item(payload.plan_id, &payload.duration_label) {
        return Err(ApiError::NotFound("Item not in cart".to_string()));
    }
    db.save_cart(&cart).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        cart,
        "Item removed from cart".to_string(),
    )))
}
