use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::member::list_members,
        handlers::member::create_member,
        handlers::member::get_member,
        handlers::member::update_member,
        handlers::member::delete_member,
        handlers::member::change_plan,
        handlers::member::member_sessions,
        handlers::plan::list_plans,
        handlers::plan::create_plan,
        handlers::plan::get_plan,
        handlers::plan::update_plan,
        handlers::plan::delete_plan,
        handlers::check_in::lookup,
        handlers::check_in::check_in,
    ),
    components(
        schemas(
            CreateMemberRequest,
            UpdateMemberRequest,
            MemberQuery,
            MemberResponse,
            MemberDetailResponse,
            CreatePlanRequest,
            UpdatePlanRequest,
            PlanQuery,
            PlanResponse,
            SessionAllowance,
            ChangePlanRequest,
            SubscriptionResponse,
            IneligibleReason,
            CheckInLookupRequest,
            CheckInLookupResponse,
            CheckInRequest,
            CheckInResponse,
            SessionResponse,
            PaginationParams,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "members", description = "Member registration and history"),
        (name = "plans", description = "Membership plan catalogue"),
        (name = "check-in", description = "Front desk check-in"),
    ),
    info(
        title = "Rink Backend API",
        version = "1.0.0",
        description = "Membership and check-in API for the rink front desk"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
