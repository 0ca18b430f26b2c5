use actix_web::web::Data;
use actix_web::HttpResponse;

use crate::services::database::DatabaseService;

pub async fn health_check(db: Data<DatabaseService>) -> HttpResponse {
    match db.health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })),
        Err(e) => {
            log::error!("health check failed: {:#}", e);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "degraded" }))
        }
    }
}
