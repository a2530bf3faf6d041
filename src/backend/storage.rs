//! Object store for recipe images (`/storage/v1`).
use reqwest::Method;
use serde::Serialize;

use super::{Backend, BackendError};

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

impl Backend {
    /// Public URL of an object, valid once the upload has succeeded.
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<String, BackendError> {
        let url = self.storage_url(&format!(
            "object/public/{}/{}",
            bucket,
            path.trim_start_matches('/')
        ))?;
        Ok(url.to_string())
    }

    /// Upload `bytes` to `bucket/path`. With `upsert` an existing object is replaced.
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        let url = self.storage_url(&format!(
            "object/{}/{}",
            bucket,
            path.trim_start_matches('/')
        ))?;
        let size = bytes.len();
        let request = self
            .request(Method::POST, url)
            .header("Content-Type", content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes);
        self.send(request).await?;
        tracing::debug!(bucket = %bucket, path = %path, size, "Uploaded object");
        Ok(())
    }

    /// Remove objects by their paths within `bucket`.
    pub async fn remove_objects(&self, bucket: &str, paths: &[String]) -> Result<(), BackendError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.storage_url(&format!("object/{}", bucket))?;
        let body = serde_json::to_vec(&RemoveRequest { prefixes: paths })?;
        let request = self
            .request(Method::DELETE, url)
            .header("Content-Type", "application/json")
            .body(body);
        self.send(request).await?;
        tracing::debug!(bucket = %bucket, count = paths.len(), "Removed objects");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_public_url() {
        let backend = Backend::new("https://project.example.co", SecretString::from("k")).unwrap();
        let url = backend
            .public_url("recipe-images", "user/42/1700000000000_0.jpg")
            .unwrap();
        assert_eq!(
            url,
            "https://project.example.co/storage/v1/object/public/recipe-images/user/42/1700000000000_0.jpg"
        );
    }

    #[tokio::test]
    async fn test_remove_nothing_sends_nothing() {
        // No server behind this URL: an empty removal must not issue a request
        let backend = Backend::new("http://127.0.0.1:9", SecretString::from("k")).unwrap();
        assert!(backend.remove_objects("recipe-images", &[]).await.is_ok());
    }
}
