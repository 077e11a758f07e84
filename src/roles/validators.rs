use super::models::{CreateRoleRequest, UpdateRoleRequest};
use crate::common::{ValidationResult, Validator};

const ROLE_NAME_MAX: usize = 255;

fn check_role_name(result: &mut ValidationResult, name: &str) {
    if result.require("role", "Role name", name) && name.trim().len() > ROLE_NAME_MAX {
        result.add_error("role", "Role name must not exceed 255 characters");
    }
}

impl Validator<CreateRoleRequest> for CreateRoleRequest {
    fn validate(&self, data: &CreateRoleRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        check_role_name(&mut result, &data.role);
        result.require("description", "Description", &data.description);
        result
    }
}

impl Validator<UpdateRoleRequest> for UpdateRoleRequest {
    fn validate(&self, data: &UpdateRoleRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.role.is_none() && data.description.is_none() {
            result.add_error("role", "Nothing to update");
            return result;
        }
        if let Some(role) = &data.role {
            check_role_name(&mut result, role);
        }
        if let Some(description) = &data.description {
            result.require("description", "Description", description);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_role_rules() {
        let ok = CreateRoleRequest {
            role: "admin".to_string(),
            description: "Full access".to_string(),
        };
        assert!(ok.validate(&ok).is_valid);

        let bad = CreateRoleRequest {
            role: "x".repeat(256),
            description: " ".to_string(),
        };
        let result = bad.validate(&bad);
        assert!(result.has_error_for("role"));
        assert!(result.has_error_for("description"));
    }

    #[test]
    fn test_update_role_rules() {
        let empty = UpdateRoleRequest::default();
        assert!(!empty.validate(&empty).is_valid);

        let only_description = UpdateRoleRequest {
            role: None,
            description: Some("Read only".to_string()),
        };
        assert!(only_description.validate(&only_description).is_valid);

        let blank_role = UpdateRoleRequest {
            role: Some(String::new()),
            description: None,
        };
        assert!(blank_role.validate(&blank_role).has_error_for("role"));
    }
}
