use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, put, HttpResponse};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ApiError;
use crate::models::common::ApiResponse;
use crate::models::plan::{Plan, PlanDuration, UpsertPlanRequest};
use crate::services::database::DatabaseService;
use crate::services::token::AuthedUser;

// GET /plans
#[get("")]
pub async fn list_plans(db: Data<DatabaseService>) -> Result<HttpResponse, ApiError> {
    let plans = db.list_plans(true).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(plans)))
}

// GET /plans/{plan_id}
#[get("/{plan_id}")]
pub async fn get_plan(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let plan_id = path.into_inner();
    let plan = db
        .get_plan(&plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Plan {}", plan_id)))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(plan)))
}

// POST /plans (admin)
#[post("")]
pub async fn create_plan(
    user: AuthedUser,
    db: Data<DatabaseService>,
    payload: Json<UpsertPlanRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    payload.check_slots().map_err(ApiError::Validation)?;

    let plan = Plan::new(&payload);
    let durations: Vec<PlanDuration> = payload
        .durations
        .iter()
        .map(|d| PlanDuration::new(plan.id, d))
        .collect();

    let created = db.create_plan(&plan, &durations).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(created)))
}

// PUT /plans/{plan_id} (admin)
#[put("/{plan_id}")]
pub async fn update_plan(
    user: AuthedUser,
    db: Data<DatabaseService>,
    path: Path<Uuid>,
    payload: Json<UpsertPlanRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    payload.check_slots().map_err(ApiError::Validation)?;

    let plan_id = path.into_inner();
    let existing = db
        .get_plan(&plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Plan {}", plan_id)))?;

    let plan = Plan {
        id: plan_id,
        name: payload.name.clone(),
        description: payload.description.clone(),
        is_active: payload.is_active,
        created_at: existing.plan.created_at,
        updated_at: Utc::now(),
    };
    let durations: Vec<PlanDuration> = payload
        .durations
        .iter()
        .map(|d| PlanDuration::new(plan_id, d))
        .collect();

    let updated = db.update_plan(&plan, &durations).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}
