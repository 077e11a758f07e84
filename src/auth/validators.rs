use super::models::{
    GoogleLoginRequest, LoginRequest, OtpGenerateRequest, OtpVerifyRequest, ProviderKind,
    RegisterRequest,
};
use crate::common::validation::is_valid_email;
use crate::common::{ValidationResult, Validator};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
/// bcrypt ignores everything past 72 bytes
pub const PASSWORD_MAX_BYTES: usize = 72;

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}

impl Validator<RegisterRequest> for RegisterRequest {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        let username = data.username.trim();
        if result.require("username", "Username", username) {
            let len = username.chars().count();
            if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
                result.add_error(
                    "username",
                    "Username must be between 3 and 50 characters",
                );
            } else if !username.chars().all(is_username_char) {
                result.add_error(
                    "username",
                    "Username may only contain letters, digits, '_', '.' and '-'",
                );
            }
        }

        if result.require("email", "Email", &data.email) && !is_valid_email(&data.email) {
            result.add_error("email", "Email must be a valid email address");
        }

        result.require("mobile", "Mobile", &data.mobile);
        result.require("display_name", "Display name", &data.display_name);
        result.require("country", "Country", &data.country);

        if data.password.is_empty() {
            result.add_error("password", "Password is required");
        } else if data.password.chars().count() < PASSWORD_MIN {
            result.add_error("password", "Password must be at least 8 characters");
        } else if data.password.len() > PASSWORD_MAX_BYTES {
            result.add_error("password", "Password must not exceed 72 bytes");
        }

        result
    }
}

impl Validator<LoginRequest> for LoginRequest {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require("username", "Username", &data.username);
        if data.password.is_empty() {
            result.add_error("password", "Password is required");
        }
        result
    }
}

impl Validator<GoogleLoginRequest> for GoogleLoginRequest {
    fn validate(&self, data: &GoogleLoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require("code", "Authorization code", &data.code);
        result
    }
}

/// Only the OTP channels accept codes
pub fn parse_otp_provider(result: &mut ValidationResult, provider: &str) -> Option<ProviderKind> {
    match provider.trim().parse::<ProviderKind>() {
        Ok(kind) if kind.is_otp() => Some(kind),
        _ => {
            result.add_error("provider", "Provider must be 'email_otp' or 'mobile_otp'");
            None
        }
    }
}

impl Validator<OtpGenerateRequest> for OtpGenerateRequest {
    fn validate(&self, data: &OtpGenerateRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        parse_otp_provider(&mut result, &data.provider);
        result
    }
}

impl Validator<OtpVerifyRequest> for OtpVerifyRequest {
    fn validate(&self, data: &OtpVerifyRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        parse_otp_provider(&mut result, &data.provider);

        let code = data.code.trim();
        if result.require("code", "Code", code)
            && (code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()))
        {
            result.add_error("code", "Code must be 6 digits");
        }
        result
    }
}
