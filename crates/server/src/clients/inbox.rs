//! Inbound mailbox poller.
//!
//! Polls a provider-agnostic inbound-mail HTTP API for unread messages and
//! marks them read once ingested. The provider parses raw MIME; this client
//! only sees `{id, to, from, text}`.

use async_trait::async_trait;
use serde::Deserialize;

use super::{AdapterError, InboundMailbox, InboundMessage};

pub struct HttpMailbox {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpMailbox {
    pub fn new(client: reqwest::Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    to: String,
    from: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl InboundMailbox for HttpMailbox {
    async fn fetch_unread(&self) -> Result<Vec<InboundMessage>, AdapterError> {
        let resp = self
            .client
            .get(format!("{}/messages", self.api_url))
            .query(&[("unread", "true")])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AdapterError::upstream("inbound mail", e))?;

        if !resp.status().is_success() {
            return Err(AdapterError::upstream(
                "inbound mail",
                format!("fetch returned HTTP {}", resp.status()),
            ));
        }

        let list: MessageList = resp
            .json()
            .await
            .map_err(|e| AdapterError::upstream("inbound mail", e))?;

        Ok(list
            .messages
            .into_iter()
            .map(|m| InboundMessage {
                id: m.id,
                to: m.to,
                from: m.from,
                text: m.text,
            })
            .collect())
    }

    async fn mark_read(&self, id: &str) -> Result<(), AdapterError> {
        let resp = self
            .client
            .post(format!("{}/messages/{id}/read", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AdapterError::upstream("inbound mail", e))?;

        if !resp.status().is_success() {
            return Err(AdapterError::upstream(
                "inbound mail",
                format!("mark-read returned HTTP {}", resp.status()),
            ));
        }

        Ok(())
    }
}
