use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct Role {
    pub id: String,
    pub role: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub role: String,
    pub description: String,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Deserialize, Default)]
pub struct UpdateRoleRequest {
    pub role: Option<String>,
    pub description: Option<String>,
}
