//! Replay artifact storage. Uploads go to a Supabase-style object
//! store when credentials are configured, with upsert semantics
//! (delete-then-retry on 409). Any remote failure falls back to the
//! local replay directory so an outage never loses an upload.

use crate::config::SupabaseConfig;
use crate::errors::{LadderError, LadderResult};
use bytes::Bytes;
use log::warn;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};

pub struct ObjectStore {
    remote: Option<RemoteStore>,
    local_dir: PathBuf,
}

struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    key: String,
    bucket: String,
}

impl ObjectStore {
    pub fn new(supabase: Option<&SupabaseConfig>, data_dir: &Path) -> Self {
        Self {
            remote: supabase.map(|config| RemoteStore {
                client: reqwest::Client::new(),
                base_url: config.url.trim_end_matches('/').to_string(),
                key: config.key.clone(),
                bucket: config.bucket.clone(),
            }),
            local_dir: data_dir.join("replays"),
        }
    }

    /// Stores a blob under `key`, returning the pointer to record: the
    /// public object URL, or a local path when the store is
    /// unavailable or not configured
    pub async fn store(&self, key: &str, bytes: Bytes) -> LadderResult<String> {
        if let Some(remote) = &self.remote {
            match remote.upload(key, bytes.clone()).await {
                Ok(url) => return Ok(url),
                Err(err) => {
                    warn!("object store upload for {key} failed, using local fallback: {err}");
                }
            }
        }
        self.store_local(key, &bytes).await
    }

    async fn store_local(&self, key: &str, bytes: &[u8]) -> LadderResult<String> {
        let path = self.local_dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| LadderError::Upstream(err.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| LadderError::Upstream(err.to_string()))?;
        Ok(path.to_string_lossy().into_owned())
    }
}

impl RemoteStore {
    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{key}", self.base_url, self.bucket)
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{key}",
            self.base_url, self.bucket
        )
    }

    /// Upload with upsert semantics: a 409 means the key exists, so
    /// delete and upload once more
    async fn upload(&self, key: &str, bytes: Bytes) -> Result<String, reqwest::Error> {
        let response = self.put_object(key, bytes.clone()).await?;
        if response.status() == StatusCode::CONFLICT {
            self.delete_object(key).await?;
            self.put_object(key, bytes).await?.error_for_status()?;
        } else {
            response.error_for_status()?;
        }
        Ok(self.public_url(key))
    }

    async fn put_object(&self, key: &str, bytes: Bytes) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(self.object_url(key))
            .bearer_auth(&self.key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
    }

    async fn delete_object(&self, key: &str) -> Result<(), reqwest::Error> {
        self.client
            .delete(self.object_url(key))
            .bearer_auth(&self.key)
            .send()
            .await?;
        Ok(())
    }
}
