use async_trait::async_trait;
use moka::future::Cache;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{IdentityError, IdentityProvider};
use crate::model::UserId;

/// Identity provider backed by a hosted auth service.
///
/// Each token is checked with `GET {auth_url}/auth/v1/user`; successful
/// answers are cached for the configured TTL so that a burst of requests
/// from the same session costs one round trip.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    user_url: String,
    api_key: String,
    cache: Cache<String, UserId>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

impl HttpIdentityProvider {
    pub fn new(
        auth_url: impl AsRef<str>,
        api_key: impl Into<String>,
        request_timeout: Duration,
        cache_ttl: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        let user_url = format!("{}/auth/v1/user", auth_url.as_ref().trim_end_matches('/'));

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(cache_ttl)
            .build();

        Ok(Self {
            client,
            user_url,
            api_key: api_key.into(),
            cache,
        })
    }

    /// Drop every cached token, forcing the next calls back to the service
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<UserId, IdentityError> {
        if let Some(user) = self.cache.get(token).await {
            debug!("Identity cache hit");
            return Ok(user);
        }

        let response = self
            .client
            .get(&self.user_url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable {
                message: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => {
                let body: AuthUser =
                    response
                        .json()
                        .await
                        .map_err(|e| IdentityError::InvalidResponse {
                            message: e.to_string(),
                        })?;
                if body.id.is_empty() {
                    return Err(IdentityError::InvalidResponse {
                        message: "user id is empty".to_string(),
                    });
                }

                let user = UserId::new(body.id);
                self.cache.insert(token.to_string(), user.clone()).await;
                Ok(user)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::Rejected),
            status => Err(IdentityError::Unavailable {
                message: format!("auth service returned {status}"),
            }),
        }
    }
}
