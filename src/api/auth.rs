use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SupabaseConfig;

/// Checks a bearer token and returns who it belongs to
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// `None` for any token that cannot be verified, including on transport errors
    async fn verify(&self, token: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies Supabase access tokens against `/auth/v1/user`
#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    url: String,
    anon_key: String,
}

impl SupabaseAuth {
    pub fn new(client: Client, config: &SupabaseConfig) -> Self {
        Self {
            client,
            url: format!("{}/auth/v1/user", config.url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
        }
    }
}

#[async_trait]
impl TokenVerifier for SupabaseAuth {
    async fn verify(&self, token: &str) -> Option<String> {
        let response = match self
            .client
            .get(&self.url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Supabase auth request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Supabase rejected bearer token: {}", response.status());
            return None;
        }

        match response.json::<SupabaseUser>().await {
            Ok(user) => Some(user.email.unwrap_or(user.id)),
            Err(e) => {
                warn!("Unexpected Supabase user response: {}", e);
                None
            }
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header value
pub(super) fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
