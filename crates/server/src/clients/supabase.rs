//! Supabase-style object storage client.

use async_trait::async_trait;

use super::{AdapterError, ObjectStore};

pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        service_key: String,
        bucket: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AdapterError> {
        let encoded = urlencoding::encode(key);
        let resp = self
            .client
            .post(format!(
                "{}/storage/v1/object/{}/{encoded}",
                self.base_url, self.bucket
            ))
            .bearer_auth(&self.service_key)
            .header("content-type", content_type.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(|e| AdapterError::upstream("object storage", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::upstream(
                "object storage",
                format!("upload returned HTTP {status}: {body}"),
            ));
        }

        Ok(format!(
            "{}/storage/v1/object/public/{}/{encoded}",
            self.base_url, self.bucket
        ))
    }
}
