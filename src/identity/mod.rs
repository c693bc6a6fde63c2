//! Caller identity resolution
//!
//! Authentication itself is delegated: a bearer token taken from the request is
//! handed to an [`IdentityProvider`], which either names the user or refuses.
//! Every refusal, whatever its cause, is reported to clients as 401.

pub mod http;
pub mod static_tokens;

pub use http::HttpIdentityProvider;
pub use static_tokens::StaticTokenIdentity;

use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{IdentityConfig, IdentityProviderKind};
use crate::model::UserId;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no bearer credentials supplied")]
    MissingCredentials,
    #[error("credentials rejected by identity provider")]
    Rejected,
    #[error("identity provider unavailable: {message}")]
    Unavailable { message: String },
    #[error("invalid response from identity provider: {message}")]
    InvalidResponse { message: String },
}

/// Resolves a caller's bearer token to a user
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<UserId, IdentityError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, IdentityError> {
    let value = header.ok_or(IdentityError::MissingCredentials)?.trim();
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(IdentityError::MissingCredentials)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(IdentityError::MissingCredentials);
    }
    Ok(token)
}

/// Build the provider selected by configuration
pub fn build_identity_provider(
    config: &IdentityConfig,
) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    match config.provider {
        IdentityProviderKind::Static => Ok(Arc::new(StaticTokenIdentity::from_config(config))),
        IdentityProviderKind::Http => {
            let auth_url = config
                .auth_url
                .clone()
                .context("identity.auth_url is required for the http identity provider")?;
            let api_key = config
                .api_key
                .clone()
                .context("identity.api_key is required for the http identity provider")?;
            let provider = HttpIdentityProvider::new(
                auth_url,
                api_key,
                Duration::from_secs(config.request_timeout_seconds),
                Duration::from_secs(config.cache_ttl_seconds),
            )?;
            Ok(Arc::new(provider))
        }
    }
}
