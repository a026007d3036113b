use crate::handlers::operator_from_request;
use crate::models::*;
use crate::services::CheckInService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use serde_json::json;

#[utoipa::path(
    post,
    path = "/check-in/lookup",
    tag = "check-in",
    request_body = CheckInLookupRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Member found, with eligibility", body = CheckInLookupResponse),
        (status = 400, description = "Empty search term"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No member matches")
    )
)]
pub async fn lookup(
    check_in_service: web::Data<CheckInService>,
    request: web::Json<CheckInLookupRequest>,
) -> Result<HttpResponse> {
    match check_in_service.lookup(request.into_inner(), Utc::now()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/check-in",
    tag = "check-in",
    request_body = CheckInRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Session recorded", body = CheckInResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subscription not found for member"),
        (status = 409, description = "No sessions remaining"),
        (status = 422, description = "Subscription is not eligible")
    )
)]
pub async fn check_in(
    check_in_service: web::Data<CheckInService>,
    req: HttpRequest,
    request: web::Json<CheckInRequest>,
) -> Result<HttpResponse> {
    let operator = match operator_from_request(&req) {
        Ok(operator) => operator,
        Err(e) => return Ok(e.error_response()),
    };
    let CheckInRequest {
        member_id,
        subscription_id,
    } = request.into_inner();

    match check_in_service
        .check_in(&operator, member_id, subscription_id, Utc::now())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response,
            "message": "Check-in recorded"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn check_in_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/check-in")
            .route("", web::post().to(check_in))
            .route("/lookup", web::post().to(lookup)),
    );
}
