use crate::handlers::operator_from_request;
use crate::models::*;
use crate::services::{CheckInService, MemberService, SubscriptionService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use serde_json::json;

#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    params(
        ("search" = Option<String>, Query, description = "Name, email or phone fragment"),
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Page size, at most 100")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Members, newest first"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_members(
    member_service: web::Data<MemberService>,
    query: web::Query<MemberQuery>,
) -> Result<HttpResponse> {
    match member_service.list_members(&query.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = CreateMemberRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Member registered", body = MemberDetailResponse),
        (status = 400, description = "Invalid member data or email taken"),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn create_member(
    member_service: web::Data<MemberService>,
    req: HttpRequest,
    request: web::Json<CreateMemberRequest>,
) -> Result<HttpResponse> {
    let operator = match operator_from_request(&req) {
        Ok(operator) => operator,
        Err(e) => return Ok(e.error_response()),
    };
    match member_service
        .register_member(&operator, request.into_inner())
        .await
    {
        Ok(detail) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "data": detail
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    params(
        ("id" = i64, Path, description = "Member id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Member with subscriptions and eligibility", body = MemberDetailResponse),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    member_service: web::Data<MemberService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match member_service.get_member(path.into_inner(), Utc::now()).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": detail
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    params(
        ("id" = i64, Path, description = "Member id")
    ),
    request_body = UpdateMemberRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Member updated", body = MemberResponse),
        (status = 400, description = "Invalid member data"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn update_member(
    member_service: web::Data<MemberService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateMemberRequest>,
) -> Result<HttpResponse> {
    let operator = match operator_from_request(&req) {
        Ok(operator) => operator,
        Err(e) => return Ok(e.error_response()),
    };
    match member_service
        .update_member(&operator, path.into_inner(), request.into_inner())
        .await
    {
        Ok(member) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": member
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    params(
        ("id" = i64, Path, description = "Member id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Member and history deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn delete_member(
    member_service: web::Data<MemberService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let operator = match operator_from_request(&req) {
        Ok(operator) => operator,
        Err(e) => return Ok(e.error_response()),
    };
    match member_service
        .delete_member(&operator, path.into_inner())
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Member deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/members/{id}/plan",
    tag = "members",
    params(
        ("id" = i64, Path, description = "Member id")
    ),
    request_body = ChangePlanRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "New subscription", body = SubscriptionResponse),
        (status = 400, description = "Plan is not active"),
        (status = 404, description = "Member or plan not found")
    )
)]
pub async fn change_plan(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<ChangePlanRequest>,
) -> Result<HttpResponse> {
    let operator = match operator_from_request(&req) {
        Ok(operator) => operator,
        Err(e) => return Ok(e.error_response()),
    };
    match subscription_service
        .change_plan(&operator, path.into_inner(), request.into_inner())
        .await
    {
        Ok(subscription) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": subscription
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/members/{id}/sessions",
    tag = "members",
    params(
        ("id" = i64, Path, description = "Member id"),
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Page size, at most 100")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Check-in history, newest first"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn member_sessions(
    check_in_service: web::Data<CheckInService>,
    path: web::Path<i64>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match check_in_service
        .member_sessions(path.into_inner(), &query.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn member_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/members")
            .route("", web::get().to(list_members))
            .route("", web::post().to(create_member))
            .route("/{id}", web::get().to(get_member))
            .route("/{id}", web::put().to(update_member))
            .route("/{id}", web::delete().to(delete_member))
            .route("/{id}/plan", web::post().to(change_plan))
            .route("/{id}/sessions", web::get().to(member_sessions)),
    );
}
