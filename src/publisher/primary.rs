//! Primary channel: thin wrapper over the platform's programmatic upload API
//!
//! This is a boundary-only component. The sole error discrimination the core
//! needs from it is "quota/rate exceeded" versus "other" — everything else is
//! the orchestrator's concern.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::config::PrimaryConfig;
use crate::models::{PublishRequest, UploadedVideo};

/// Failures reported by the primary channel
#[derive(Error, Debug)]
pub enum PrimaryError {
    /// The platform signaled that the usage allowance is depleted
    #[error("quota exceeded: {message}")]
    QuotaExceeded { message: String },

    /// Anything else: network, validation, server errors
    #[error("primary upload failed: {message}")]
    Other { message: String },
}

impl PrimaryError {
    /// Whether this failure matches the quota-exhaustion signature
    pub fn is_quota_signature(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// The quota-limited programmatic publish API
#[async_trait]
pub trait PrimaryChannel: Send + Sync {
    async fn upload_video(&self, request: &PublishRequest)
        -> Result<UploadedVideo, PrimaryError>;
}

/// HTTP implementation of the primary channel
pub struct ApiPublisher {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl ApiPublisher {
    /// Build a publisher from configuration
    pub fn new(config: &PrimaryConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        })
    }

    fn metadata_payload(request: &PublishRequest) -> serde_json::Value {
        json!({
            "snippet": {
                "title": request.title,
                "description": request.description,
                "tags": request.tags,
                "categoryId": request.category_id,
            },
            "status": {
                "privacyStatus": request.privacy.as_str(),
            },
        })
    }
}

/// Classify an error response into the two-way primary taxonomy
fn classify_failure(status: StatusCode, body: &str) -> PrimaryError {
    let quota_keywords = ["quotaExceeded", "rateLimitExceeded", "dailyLimitExceeded", "quota"];
    let looks_like_quota = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && quota_keywords.iter().any(|k| body.contains(k)));

    let message = format!("{status}: {body}");
    if looks_like_quota {
        PrimaryError::QuotaExceeded { message }
    } else {
        PrimaryError::Other { message }
    }
}

#[async_trait]
impl PrimaryChannel for ApiPublisher {
    async fn upload_video(
        &self,
        request: &PublishRequest,
    ) -> Result<UploadedVideo, PrimaryError> {
        let media = tokio::fs::read(&request.media_path)
            .await
            .map_err(|e| PrimaryError::Other {
                message: format!("failed to read media file: {e}"),
            })?;

        let file_name = request
            .media_file_name()
            .unwrap_or_else(|| "upload.mp4".to_string());

        let media_part = reqwest::multipart::Part::bytes(media)
            .file_name(file_name)
            .mime_str("video/mp4")
            .map_err(|e| PrimaryError::Other {
                message: e.to_string(),
            })?;

        let metadata_part =
            reqwest::multipart::Part::text(Self::metadata_payload(request).to_string())
                .mime_str("application/json")
                .map_err(|e| PrimaryError::Other {
                    message: e.to_string(),
                })?;

        let form = reqwest::multipart::Form::new()
            .part("metadata", metadata_part)
            .part("media", media_part);

        let mut builder = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| PrimaryError::Other {
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|e| PrimaryError::Other {
                message: format!("malformed upload response: {e}"),
            })?;

        let video_id = payload["id"]
            .as_str()
            .ok_or_else(|| PrimaryError::Other {
                message: "upload response is missing the video id".to_string(),
            })?
            .to_string();

        debug!(video_id = %video_id, "Primary upload accepted");

        Ok(UploadedVideo {
            video_url: format!("https://youtu.be/{video_id}"),
            video_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn test_config(endpoint: String) -> PrimaryConfig {
        PrimaryConfig {
            endpoint,
            api_token: Some("test-token".to_string()),
            request_timeout_secs: 10,
        }
    }

    fn write_media(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"fake media bytes").unwrap();
        path
    }

    #[test]
    fn test_classify_quota_signatures() {
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(err.is_quota_signature());

        let err = classify_failure(
            StatusCode::FORBIDDEN,
            r#"{"error":{"errors":[{"reason":"quotaExceeded"}]}}"#,
        );
        assert!(err.is_quota_signature());

        // A plain 403 without quota keywords is not a quota signature
        let err = classify_failure(StatusCode::FORBIDDEN, "channel suspended");
        assert!(!err.is_quota_signature());

        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "quota");
        assert!(!err.is_quota_signature());
    }

    #[tokio::test]
    async fn test_upload_success() {
        let dir = tempfile::TempDir::new().unwrap();
        let media = write_media(&dir);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .with_status(200)
            .with_body(r#"{"id": "vid12345678"}"#)
            .create_async()
            .await;

        let publisher = ApiPublisher::new(&test_config(format!("{}/upload", server.url()))).unwrap();
        let mut request = PublishRequest::new("테스트 영상", &media, ContentType::Longform);
        request.description = "설명".to_string();

        let video = publisher.upload_video(&request).await.unwrap();
        assert_eq!(video.video_id, "vid12345678");
        assert!(video.video_url.contains("vid12345678"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_quota_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let media = write_media(&dir);

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(403)
            .with_body(r#"{"error": {"message": "quotaExceeded"}}"#)
            .create_async()
            .await;

        let publisher = ApiPublisher::new(&test_config(format!("{}/upload", server.url()))).unwrap();
        let request = PublishRequest::new("영상", &media, ContentType::Shorts);

        let err = publisher.upload_video(&request).await.err().unwrap();
        assert!(err.is_quota_signature());
    }

    #[tokio::test]
    async fn test_upload_other_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let media = write_media(&dir);

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(500)
            .with_body("backend exploded")
            .create_async()
            .await;

        let publisher = ApiPublisher::new(&test_config(format!("{}/upload", server.url()))).unwrap();
        let request = PublishRequest::new("영상", &media, ContentType::Shorts);

        let err = publisher.upload_video(&request).await.err().unwrap();
        assert!(!err.is_quota_signature());
    }

    #[tokio::test]
    async fn test_missing_media_file_is_other() {
        let publisher =
            ApiPublisher::new(&test_config("http://localhost:1/upload".to_string())).unwrap();
        let request = PublishRequest::new("영상", "/nonexistent/clip.mp4", ContentType::Shorts);

        let err = publisher.upload_video(&request).await.err().unwrap();
        assert!(matches!(err, PrimaryError::Other { .. }));
    }
}
