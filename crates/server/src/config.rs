//! Server configuration loaded from environment variables.
//!
//! Third-party credentials are required at startup: a missing variable
//! aborts with an error naming it rather than failing on first use.

use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    /// CORS allow-origin; `None` allows any origin.
    pub frontend_origin: Option<String>,
    pub sweep_interval_secs: u64,

    pub clerk_api_url: String,
    pub clerk_secret_key: String,

    pub storage_url: String,
    pub storage_service_key: String,
    pub storage_bucket: String,

    pub hf_token: String,
    pub whisper_url: String,
    pub llm_url: String,

    pub resend_api_key: String,
    pub resend_domain: String,
    /// Domain for reply-to addresses on reminder emails.
    pub inbound_domain: String,
    /// Inbound mailbox API; absent disables reply-by-email ingestion.
    pub inbound_api: Option<InboundApiConfig>,
}

#[derive(Clone)]
pub struct InboundApiConfig {
    pub url: String,
    pub api_key: String,
}

const DEFAULT_WHISPER_URL: &str =
    "https://api-inference.huggingface.co/models/openai/whisper-large-v2";
const DEFAULT_LLM_URL: &str =
    "https://api-inference.huggingface.co/models/mistralai/Mixtral-8x7B-Instruct-v0.1";

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let resend_domain = required("RESEND_DOMAIN")?;
        let inbound_domain =
            optional("INBOUND_DOMAIN").unwrap_or_else(|| format!("inbound.{resend_domain}"));

        let inbound_api = match (optional("INBOUND_API_URL"), optional("INBOUND_API_KEY")) {
            (Some(url), Some(api_key)) => Some(InboundApiConfig { url, api_key }),
            (None, None) => None,
            _ => anyhow::bail!(
                "INBOUND_API_URL and INBOUND_API_KEY must be set together or not at all"
            ),
        };

        Ok(Self {
            data_dir: optional("REMOTESYNC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            port: optional("PORT")
                .map(|p| p.parse().context("PORT must be a number"))
                .transpose()?
                .unwrap_or(3000),
            frontend_origin: optional("FRONTEND_ORIGIN"),
            sweep_interval_secs: optional("SWEEP_INTERVAL_SECS")
                .map(|s| s.parse().context("SWEEP_INTERVAL_SECS must be a number"))
                .transpose()?
                .unwrap_or(3600),
            clerk_api_url: optional("CLERK_API_URL")
                .unwrap_or_else(|| "https://api.clerk.com".into()),
            clerk_secret_key: required("CLERK_SECRET_KEY")?,
            storage_url: required("STORAGE_URL")?,
            storage_service_key: required("STORAGE_SERVICE_KEY")?,
            storage_bucket: optional("STORAGE_BUCKET").unwrap_or_else(|| "audio".into()),
            hf_token: required("HF_TOKEN")?,
            whisper_url: optional("WHISPER_URL").unwrap_or_else(|| DEFAULT_WHISPER_URL.into()),
            llm_url: optional("LLM_URL").unwrap_or_else(|| DEFAULT_LLM_URL.into()),
            resend_api_key: required("RESEND_API_KEY")?,
            resend_domain,
            inbound_domain,
            inbound_api,
        })
    }

    /// Sender for all outbound mail.
    pub fn from_address(&self) -> String {
        format!("RemoteSync <reminders@{}>", self.resend_domain)
    }

    /// Base URL embedded in invite join links.
    pub fn join_link_base(&self) -> String {
        self.frontend_origin
            .clone()
            .unwrap_or_else(|| "http://localhost:3000".into())
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .with_context(|| format!("required environment variable {name} is not set"))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
