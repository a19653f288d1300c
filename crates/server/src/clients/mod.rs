//! Third-party service adapters.
//!
//! Each external dependency sits behind a trait so handlers and the sweep
//! job receive injected instances and tests can substitute fakes. The
//! production implementations are thin `reqwest` clients.

use async_trait::async_trait;
use std::sync::Arc;

pub mod clerk;
pub mod hf;
pub mod inbox;
pub mod resend;
pub mod supabase;

/// Failure raised by any adapter. Handlers translate `Auth` to 401 and
/// `Upstream` to 500 with the message passed through.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{0}")]
    Auth(String),
    #[error("{service} error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
}

impl AdapterError {
    pub fn upstream(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            service,
            message: err.to_string(),
        }
    }
}

/// Verified identity of a request's caller.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token and resolve the caller's profile.
    ///
    /// Every failure on this path (expired/invalid/malformed token, missing
    /// primary email) is `Auth`: the caller is not authenticated.
    async fn verify_token(&self, token: &str) -> Result<UserProfile, AdapterError>;

    /// Resolve profiles for many user ids in one batched query.
    async fn users_by_ids(&self, ids: &[String]) -> Result<Vec<UserProfile>, AdapterError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a blob under `key` and return its public URL.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AdapterError>;
}

#[async_trait]
pub trait Inference: Send + Sync {
    /// Speech-to-text over raw audio bytes.
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, AdapterError>;

    /// Condense an update into standup bullet points. Callers tolerate
    /// failure here by substituting a placeholder.
    async fn summarize(&self, text: &str) -> Result<String, AdapterError>;
}

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), AdapterError>;
}

/// A message pulled from the inbound mailbox.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    /// Recipient address; carries the encoded user/team reply target.
    pub to: String,
    pub from: String,
    pub text: String,
}

#[async_trait]
pub trait InboundMailbox: Send + Sync {
    async fn fetch_unread(&self) -> Result<Vec<InboundMessage>, AdapterError>;
    async fn mark_read(&self, id: &str) -> Result<(), AdapterError>;
}

/// Injected third-party clients, shared by handlers and the sweep job.
#[derive(Clone)]
pub struct Adapters {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn ObjectStore>,
    pub inference: Arc<dyn Inference>,
    pub mailer: Arc<dyn Mailer>,
    pub inbox: Option<Arc<dyn InboundMailbox>>,
}
