//! Fake adapters and state construction shared by the route and sweep tests.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::AppState;
use crate::clients::{
    Adapters, AdapterError, IdentityProvider, InboundMailbox, InboundMessage, Inference, Mailer,
    ObjectStore, OutboundEmail, UserProfile,
};
use crate::config::AppConfig;
use crate::storage;

/// A profile the way the fake identity provider would resolve it.
pub fn profile(user_id: &str) -> UserProfile {
    UserProfile {
        id: user_id.to_string(),
        name: format!("User {user_id}"),
        email: format!("{user_id}@example.com"),
        avatar_url: None,
    }
}

pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_token(&self, token: &str) -> Result<UserProfile, AdapterError> {
        // Tokens are user ids prefixed with "tok_".
        token
            .strip_prefix("tok_")
            .map(profile)
            .ok_or_else(|| AdapterError::Auth("invalid identity token".into()))
    }

    async fn users_by_ids(&self, ids: &[String]) -> Result<Vec<UserProfile>, AdapterError> {
        Ok(ids.iter().map(|id| profile(id)).collect())
    }
}

pub struct FakeStore;

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put(
        &self,
        key: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, AdapterError> {
        Ok(format!("https://files.test/audio/{key}"))
    }
}

pub struct FakeInference {
    pub fail_summary: Arc<AtomicBool>,
}

#[async_trait]
impl Inference for FakeInference {
    async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, AdapterError> {
        Ok("transcribed update".into())
    }

    async fn summarize(&self, text: &str) -> Result<String, AdapterError> {
        if self.fail_summary.load(Ordering::SeqCst) {
            return Err(AdapterError::upstream("summarization", "model loading"));
        }
        Ok(format!("- Completed: {text}"))
    }
}

pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), AdapterError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct FakeInbox {
    pub unread: Mutex<Vec<InboundMessage>>,
    pub read: Mutex<Vec<String>>,
}

#[async_trait]
impl InboundMailbox for FakeInbox {
    async fn fetch_unread(&self) -> Result<Vec<InboundMessage>, AdapterError> {
        Ok(self.unread.lock().unwrap().clone())
    }

    async fn mark_read(&self, id: &str) -> Result<(), AdapterError> {
        self.unread.lock().unwrap().retain(|m| m.id != id);
        self.read.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

/// Everything a test needs: the app state wired to fakes, plus handles to
/// observe and steer them.
pub struct TestApp {
    pub state: AppState,
    pub outbox: Arc<Mutex<Vec<OutboundEmail>>>,
    pub fail_summary: Arc<AtomicBool>,
    pub inbox: Arc<FakeInbox>,
    _dir: tempfile::TempDir,
}

impl TestApp {
    pub fn sent_mail(&self) -> Vec<OutboundEmail> {
        self.outbox.lock().unwrap().clone()
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        data_dir: PathBuf::from("unused"),
        port: 0,
        frontend_origin: Some("https://app.example.com".into()),
        sweep_interval_secs: 3600,
        clerk_api_url: "https://clerk.test".into(),
        clerk_secret_key: "sk_test".into(),
        storage_url: "https://files.test".into(),
        storage_service_key: "svc_test".into(),
        storage_bucket: "audio".into(),
        hf_token: "hf_test".into(),
        whisper_url: "https://hf.test/whisper".into(),
        llm_url: "https://hf.test/llm".into(),
        resend_api_key: "re_test".into(),
        resend_domain: "example.com".into(),
        inbound_domain: "inbound.example.com".into(),
        inbound_api: None,
    }
}

pub fn test_state() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = storage::init_db(dir.path()).expect("init db");

    let outbox = Arc::new(Mutex::new(Vec::new()));
    let fail_summary = Arc::new(AtomicBool::new(false));
    let inbox = Arc::new(FakeInbox {
        unread: Mutex::new(Vec::new()),
        read: Mutex::new(Vec::new()),
    });

    let adapters = Adapters {
        identity: Arc::new(FakeIdentity),
        store: Arc::new(FakeStore),
        inference: Arc::new(FakeInference {
            fail_summary: fail_summary.clone(),
        }),
        mailer: Arc::new(RecordingMailer {
            sent: outbox.clone(),
        }),
        inbox: Some(inbox.clone()),
    };

    TestApp {
        state: AppState {
            db,
            config: test_config(),
            adapters,
        },
        outbox,
        fail_summary,
        inbox,
        _dir: dir,
    }
}
