//! Clerk identity provider client.
//!
//! Token verification is fully delegated: every request re-verifies against
//! the Clerk API, and no session state is kept locally.

use async_trait::async_trait;
use serde::Deserialize;

use super::{AdapterError, IdentityProvider, UserProfile};

pub struct ClerkClient {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl ClerkClient {
    pub fn new(client: reqwest::Client, api_url: String, secret_key: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    async fn fetch_user(&self, user_id: &str) -> Result<ClerkUser, AdapterError> {
        let resp = self
            .client
            .get(format!("{}/v1/users/{user_id}", self.api_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AdapterError::upstream("identity", e))?;

        if !resp.status().is_success() {
            return Err(AdapterError::upstream(
                "identity",
                format!("user fetch returned HTTP {}", resp.status()),
            ));
        }

        resp.json()
            .await
            .map_err(|e| AdapterError::upstream("identity", e))
    }
}

#[derive(Debug, Deserialize)]
struct VerifyClaims {
    sub: String,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    image_url: Option<String>,
    primary_email_address_id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ClerkEmail>,
}

#[derive(Debug, Deserialize)]
struct ClerkEmail {
    id: String,
    email_address: String,
}

impl ClerkUser {
    /// The address marked primary; `None` when the account has none.
    fn primary_email(&self) -> Option<&str> {
        let primary_id = self.primary_email_address_id.as_deref()?;
        self.email_addresses
            .iter()
            .find(|e| e.id == primary_id)
            .map(|e| e.email_address.as_str())
    }

    fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or(""),
        );
        let name = name.trim();
        if name.is_empty() {
            self.primary_email().unwrap_or(&self.id).to_string()
        } else {
            name.to_string()
        }
    }

    fn into_profile(self) -> Option<UserProfile> {
        let email = self.primary_email()?.to_string();
        let name = self.display_name();
        Some(UserProfile {
            id: self.id,
            name,
            email,
            avatar_url: self.image_url,
        })
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn verify_token(&self, token: &str) -> Result<UserProfile, AdapterError> {
        let resp = self
            .client
            .post(format!("{}/v1/tokens/verify", self.api_url))
            .bearer_auth(&self.secret_key)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| AdapterError::Auth(format!("token verification failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AdapterError::Auth("invalid identity token".into()));
        }

        let claims: VerifyClaims = resp
            .json()
            .await
            .map_err(|e| AdapterError::Auth(format!("malformed verification response: {e}")))?;

        let user = self
            .fetch_user(&claims.sub)
            .await
            .map_err(|e| AdapterError::Auth(e.to_string()))?;

        user.into_profile()
            .ok_or_else(|| AdapterError::Auth("no primary email on account".into()))
    }

    async fn users_by_ids(&self, ids: &[String]) -> Result<Vec<UserProfile>, AdapterError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Single multi-id query; never one call per member.
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("user_id", id.as_str())).collect();
        let resp = self
            .client
            .get(format!("{}/v1/users", self.api_url))
            .query(&query)
            .query(&[("limit", ids.len().to_string())])
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AdapterError::upstream("identity", e))?;

        if !resp.status().is_success() {
            return Err(AdapterError::upstream(
                "identity",
                format!("user list returned HTTP {}", resp.status()),
            ));
        }

        let users: Vec<ClerkUser> = resp
            .json()
            .await
            .map_err(|e| AdapterError::upstream("identity", e))?;

        Ok(users
            .into_iter()
            .filter_map(|u| {
                let id = u.id.clone();
                let profile = u.into_profile();
                if profile.is_none() {
                    tracing::warn!("skipping user {id}: no primary email");
                }
                profile
            })
            .collect())
    }
}
