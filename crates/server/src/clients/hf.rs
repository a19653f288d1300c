//! Hugging Face inference clients: Whisper for speech-to-text, an
//! instruction-tuned LLM for summarization.

use async_trait::async_trait;
use serde_json::Value;

use remotesync_core::summary;

use super::{AdapterError, Inference};

pub struct HfInference {
    client: reqwest::Client,
    whisper_url: String,
    llm_url: String,
    token: String,
}

impl HfInference {
    pub fn new(
        client: reqwest::Client,
        whisper_url: String,
        llm_url: String,
        token: String,
    ) -> Self {
        Self {
            client,
            whisper_url,
            llm_url,
            token,
        }
    }
}

/// The inference API returns either `{"generated_text": ...}` or a
/// one-element array of that object depending on the model.
fn extract_generated_text(value: &Value) -> Option<&str> {
    let obj = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    obj.get("generated_text")?.as_str()
}

#[async_trait]
impl Inference for HfInference {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, AdapterError> {
        let resp = self
            .client
            .post(&self.whisper_url)
            .bearer_auth(&self.token)
            .header("content-type", "audio/wav")
            .body(audio)
            .send()
            .await
            .map_err(|e| AdapterError::upstream("transcription", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::upstream(
                "transcription",
                format!("HTTP {status}: {body}"),
            ));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| AdapterError::upstream("transcription", e))?;

        value
            .get("text")
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| {
                AdapterError::upstream("transcription", "response carried no transcript")
            })
    }

    async fn summarize(&self, text: &str) -> Result<String, AdapterError> {
        let resp = self
            .client
            .post(&self.llm_url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "inputs": summary::build_prompt(text),
                "parameters": { "max_new_tokens": 120 },
            }))
            .send()
            .await
            .map_err(|e| AdapterError::upstream("summarization", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::upstream(
                "summarization",
                format!("HTTP {status}: {body}"),
            ));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| AdapterError::upstream("summarization", e))?;

        extract_generated_text(&value)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AdapterError::upstream("summarization", "response carried no summary"))
    }
}
