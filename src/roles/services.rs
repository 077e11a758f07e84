use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::models::{CreateRoleRequest, Role, UpdateRoleRequest};
use crate::auth::store::{Constraint, StoreError};
use crate::common::{generate_role_id, ApiError, Validator};

pub struct RolesService {
    db: SqlitePool,
}

fn map_write_error(e: sqlx::Error, role: &str) -> ApiError {
    match StoreError::from(e) {
        StoreError::Duplicate(Constraint::RoleName) => {
            ApiError::Conflict(format!("Role '{}' already exists", role))
        }
        StoreError::Database(e) => ApiError::DatabaseError(e),
        other => ApiError::InternalServer(other.to_string()),
    }
}

impl RolesService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, ApiError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY role ASC")
            .fetch_all(&self.db)
            .await
            .map_err(ApiError::DatabaseError)
    }

    pub async fn get_role(&self, role_id: &str) -> Result<Role, ApiError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ?")
            .bind(role_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound("Role not found".to_string()))
    }

    pub async fn create_role(&self, request: CreateRoleRequest) -> Result<Role, ApiError> {
        let validation_result = request.validate(&request);
        if !validation_result.is_valid {
            return Err(ApiError::from(validation_result));
        }

        let now = Utc::now();
        let role = Role {
            id: generate_role_id(),
            role: request.role.trim().to_string(),
            description: request.description.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO roles (id, role, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&role.id)
        .bind(&role.role)
        .bind(&role.description)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| map_write_error(e, &role.role))?;

        info!(role_id = %role.id, role = %role.role, "Created role");
        Ok(role)
    }

    pub async fn update_role(
        &self,
        role_id: &str,
        request: UpdateRoleRequest,
    ) -> Result<Role, ApiError> {
        let validation_result = request.validate(&request);
        if !validation_result.is_valid {
            return Err(ApiError::from(validation_result));
        }

        let mut role = self.get_role(role_id).await?;
        if let Some(name) = request.role {
            role.role = name.trim().to_string();
        }
        if let Some(description) = request.description {
            role.description = description.trim().to_string();
        }
        role.updated_at = Utc::now();

        sqlx::query("UPDATE roles SET role = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&role.role)
            .bind(&role.description)
            .bind(role.updated_at)
            .bind(&role.id)
            .execute(&self.db)
            .await
            .map_err(|e| map_write_error(e, &role.role))?;

        info!(role_id = %role.id, "Updated role");
        Ok(role)
    }

    pub async fn delete_role(&self, role_id: &str) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(role_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Role not found".to_string()));
        }

        info!(role_id = %role_id, "Deleted role");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::memory_pool;

    fn create(role: &str) -> CreateRoleRequest {
        CreateRoleRequest {
            role: role.to_string(),
            description: format!("{} role", role),
        }
    }

    #[tokio::test]
    async fn test_role_crud() {
        let service = RolesService::new(memory_pool().await);

        let admin = service.create_role(create("admin")).await.unwrap();
        assert!(admin.id.starts_with("RL_"));
        service.create_role(create("editor")).await.unwrap();

        let names: Vec<String> = service
            .list_roles()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.role)
            .collect();
        assert_eq!(names, vec!["admin", "editor"]);

        let updated = service
            .update_role(
                &admin.id,
                UpdateRoleRequest {
                    role: None,
                    description: Some("Everything".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, "admin");
        assert_eq!(updated.description, "Everything");
        assert_eq!(service.get_role(&admin.id).await.unwrap().description, "Everything");

        service.delete_role(&admin.id).await.unwrap();
        assert!(matches!(
            service.get_role(&admin.id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_role(&admin.id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_role_name_conflicts() {
        let service = RolesService::new(memory_pool().await);
        service.create_role(create("admin")).await.unwrap();
        let editor = service.create_role(create("editor")).await.unwrap();

        assert!(matches!(
            service.create_role(create("admin")).await,
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            service
                .update_role(
                    &editor.id,
                    UpdateRoleRequest {
                        role: Some("admin".to_string()),
                        description: None,
                    },
                )
                .await,
            Err(ApiError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_role_is_not_found() {
        let service = RolesService::new(memory_pool().await);
        let result = service
            .update_role(
                "RL_MISSING00000",
                UpdateRoleRequest {
                    role: Some("x".to_string()),
                    description: None,
                },
            )
            .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
