//! Resend transactional email client.

use async_trait::async_trait;

use super::{AdapterError, Mailer, OutboundEmail};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(client: reqwest::Client, api_key: String, from: String) -> Self {
        Self {
            client,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), AdapterError> {
        let mut body = serde_json::json!({
            "from": self.from,
            "to": email.to,
            "subject": email.subject,
            "html": email.html,
        });
        if let Some(ref reply_to) = email.reply_to {
            body["reply_to"] = serde_json::Value::String(reply_to.clone());
        }

        let resp = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::upstream("email", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AdapterError::upstream(
                "email",
                format!("send returned HTTP {status}: {text}"),
            ));
        }

        Ok(())
    }
}
