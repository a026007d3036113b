pub mod check_in;
pub mod health;
pub mod member;
pub mod plan;

pub use check_in::check_in_config;
pub use health::health_config;
pub use member::member_config;
pub use plan::plan_config;

use crate::error::{AppError, AppResult};
use crate::middlewares::current_operator;
use crate::models::Operator;
use actix_web::HttpRequest;

pub(crate) fn operator_from_request(req: &HttpRequest) -> AppResult<Operator> {
    current_operator(req).ok_or_else(|| AppError::AuthError("Missing operator".to_string()))
}
