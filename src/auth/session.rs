//! Turns a resolved user into a signed bearer token

use std::sync::Arc;

use super::errors::AuthError;
use super::models::{AuthResponse, User};
use super::token::TokenManager;

#[derive(Clone)]
pub struct SessionIssuer {
    tokens: Arc<TokenManager>,
}

impl SessionIssuer {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        Ok(self.tokens.issue(&user.id, &user.email)?)
    }

    pub fn respond(&self, user: User) -> Result<AuthResponse, AuthError> {
        let token = self.issue(&user)?;
        Ok(AuthResponse { token, user })
    }
}
