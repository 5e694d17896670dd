use anyhow::{Context, Result};
use reqwest::{
    StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde_json::Value;
use tracing::error;

use crate::config::config_model::RecordStoreConfig;

/// Keyed JSON document store client.
///
/// Documents live at `{base}/v1/{collection}/{id}`; `PATCH ?merge=true`
/// merge-sets fields into an existing document (creating it when
/// absent), `PUT` replaces, and list queries filter on the indexed
/// `userId` field.
pub struct HttpRecordStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRecordStore {
    pub fn new(config: RecordStoreConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            anyhow::bail!("record store base url is empty");
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: config.api_key,
        })
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/v1/{}/{}", self.base_url, collection, id)
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "record store request failed"
        );
        anyhow::bail!("record store request failed: {} (status {})", context, status);
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let resp = self
            .http
            .get(self.doc_url(collection, id))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await
            .with_context(|| format!("get {collection}/{id}"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = Self::ensure_success(resp, "get document").await?;
        let doc: Value = resp.json().await?;
        Ok(Some(doc))
    }

    pub async fn set(&self, collection: &str, id: &str, doc: &Value) -> Result<()> {
        let resp = self
            .http
            .put(self.doc_url(collection, id))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(doc)
            .send()
            .await
            .with_context(|| format!("set {collection}/{id}"))?;
        Self::ensure_success(resp, "set document").await?;

        Ok(())
    }

    pub async fn merge(&self, collection: &str, id: &str, fields: &Value) -> Result<()> {
        let resp = self
            .http
            .patch(format!("{}?merge=true", self.doc_url(collection, id)))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(fields)
            .send()
            .await
            .with_context(|| format!("merge {collection}/{id}"))?;
        Self::ensure_success(resp, "merge document").await?;

        Ok(())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.doc_url(collection, id))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await
            .with_context(|| format!("delete {collection}/{id}"))?;

        // Deleting an absent document is a no-op.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::ensure_success(resp, "delete document").await?;

        Ok(())
    }

    pub async fn list_by_user(&self, collection: &str, user_id: &str) -> Result<Vec<Value>> {
        let resp = self
            .http
            .get(format!("{}/v1/{}", self.base_url, collection))
            .query(&[("userId", user_id)])
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await
            .with_context(|| format!("list {collection} by user"))?;
        let resp = Self::ensure_success(resp, "list documents").await?;

        let docs: Vec<Value> = resp.json().await?;
        Ok(docs)
    }
}
