use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of the `error` field in failed responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    #[schema(example = "NO_ELIGIBLE_SUBSCRIPTION")]
    pub code: String,
    pub message: String,
}
