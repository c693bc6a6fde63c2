use async_trait::async_trait;
use std::collections::HashMap;

use super::{IdentityError, IdentityProvider};
use crate::config::IdentityConfig;
use crate::model::UserId;

/// Resolves tokens from a fixed table; meant for local development and tests
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        let tokens = config
            .static_tokens
            .iter()
            .map(|(token, user)| (token.clone(), UserId::new(user.clone())))
            .collect();
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, user: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), UserId::new(user));
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn resolve(&self, token: &str) -> Result<UserId, IdentityError> {
        self.tokens.get(token).cloned().ok_or(IdentityError::Rejected)
    }
}
