use crate::handlers::operator_from_request;
use crate::models::*;
use crate::services::PlanService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/plans",
    tag = "plans",
    params(
        ("active_only" = Option<bool>, Query, description = "Only list plans open for new subscriptions")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plans ordered by price", body = [PlanResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_plans(
    plan_service: web::Data<PlanService>,
    query: web::Query<PlanQuery>,
) -> Result<HttpResponse> {
    match plan_service.list_plans(&query.into_inner()).await {
        Ok(plans) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plans
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/plans",
    tag = "plans",
    request_body = CreatePlanRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Plan created", body = PlanResponse),
        (status = 400, description = "Invalid plan"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_plan(
    plan_service: web::Data<PlanService>,
    req: HttpRequest,
    request: web::Json<CreatePlanRequest>,
) -> Result<HttpResponse> {
    let operator = match operator_from_request(&req) {
        Ok(operator) => operator,
        Err(e) => return Ok(e.error_response()),
    };
    match plan_service.create_plan(&operator, request.into_inner()).await {
        Ok(plan) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "data": plan
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/plans/{id}",
    tag = "plans",
    params(
        ("id" = i64, Path, description = "Plan id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plan", body = PlanResponse),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn get_plan(
    plan_service: web::Data<PlanService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match plan_service.get_plan(path.into_inner()).await {
        Ok(plan) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plan
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/plans/{id}",
    tag = "plans",
    params(
        ("id" = i64, Path, description = "Plan id")
    ),
    request_body = UpdatePlanRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plan updated", body = PlanResponse),
        (status = 400, description = "Invalid plan"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn update_plan(
    plan_service: web::Data<PlanService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdatePlanRequest>,
) -> Result<HttpResponse> {
    let operator = match operator_from_request(&req) {
        Ok(operator) => operator,
        Err(e) => return Ok(e.error_response()),
    };
    match plan_service
        .update_plan(&operator, path.into_inner(), request.into_inner())
        .await
    {
        Ok(plan) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plan
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/plans/{id}",
    tag = "plans",
    params(
        ("id" = i64, Path, description = "Plan id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plan deleted"),
        (status = 400, description = "Plan has subscriptions"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn delete_plan(
    plan_service: web::Data<PlanService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let operator = match operator_from_request(&req) {
        Ok(operator) => operator,
        Err(e) => return Ok(e.error_response()),
    };
    match plan_service.delete_plan(&operator, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Plan deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn plan_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/plans")
            .route("", web::get().to(list_plans))
            .route("", web::post().to(create_plan))
            .route("/{id}", web::get().to(get_plan))
            .route("/{id}", web::put().to(update_plan))
            .route("/{id}", web::delete().to(delete_plan)),
    );
}
