use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// The staff user acting on a request, as vouched for by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl Operator {
    pub fn staff(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            is_admin: true,
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}
