//! HTTP automation-bridge driver
//!
//! The concrete browser lives in an external automation bridge process; this
//! module is a thin JSON-over-HTTP client implementing [`AutomationSession`]
//! against it. Command failures surface as [`AutomationError::Driver`] and
//! are handled by the state machine like any other step failure.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::AutomationError;
use super::session::{AutomationSession, Locator, SessionFactory, SessionSnapshot};

/// Factory creating sessions against a running automation bridge
pub struct BridgeSessionFactory {
    client: reqwest::Client,
    base_url: String,
}

impl BridgeSessionFactory {
    /// Create a factory for the bridge at `base_url`
    pub fn new(base_url: &str) -> Result<Self, AutomationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AutomationError::SessionInit(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SessionFactory for BridgeSessionFactory {
    async fn create(
        &self,
        snapshot: Option<&SessionSnapshot>,
    ) -> Result<Box<dyn AutomationSession>, AutomationError> {
        #[derive(Deserialize)]
        struct CreateResponse {
            #[serde(rename = "sessionId")]
            session_id: String,
        }

        let body = match snapshot {
            Some(snapshot) => json!({ "restoreState": snapshot.state }),
            None => json!({}),
        };

        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AutomationError::SessionInit(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AutomationError::SessionInit(format!(
                "bridge returned {}",
                response.status()
            )));
        }

        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| AutomationError::SessionInit(e.to_string()))?;

        debug!(session_id = %created.session_id, "Bridge session created");

        Ok(Box::new(BridgeSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session_id: created.session_id,
        }))
    }
}

/// One live session held open on the automation bridge
pub struct BridgeSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl BridgeSession {
    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/session/{}/{}", self.base_url, self.session_id, suffix)
    }

    async fn command(
        &self,
        suffix: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, AutomationError> {
        let response = self
            .client
            .post(self.endpoint(suffix))
            .json(&body)
            .send()
            .await
            .map_err(|e| AutomationError::Driver(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AutomationError::Driver(format!("{suffix}: {status} {detail}")));
        }

        response
            .json()
            .await
            .map_err(|e| AutomationError::Driver(e.to_string()))
    }

    fn locator_body(locator: &Locator) -> serde_json::Value {
        json!({ "locator": locator })
    }
}

#[async_trait]
impl AutomationSession for BridgeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        self.command("navigate", json!({ "url": url })).await?;
        Ok(())
    }

    async fn exists(&mut self, locator: &Locator) -> Result<bool, AutomationError> {
        let response = self
            .command("element/exists", Self::locator_body(locator))
            .await?;
        Ok(response["exists"].as_bool().unwrap_or(false))
    }

    async fn click(&mut self, locator: &Locator) -> Result<(), AutomationError> {
        self.command("element/click", Self::locator_body(locator))
            .await?;
        Ok(())
    }

    async fn clear(&mut self, locator: &Locator) -> Result<(), AutomationError> {
        self.command("element/clear", Self::locator_body(locator))
            .await?;
        Ok(())
    }

    async fn send_keys(&mut self, locator: &Locator, text: &str) -> Result<(), AutomationError> {
        self.command("element/keys", json!({ "locator": locator, "text": text }))
            .await?;
        Ok(())
    }

    async fn press_backspace(&mut self, locator: &Locator) -> Result<(), AutomationError> {
        self.send_keys(locator, "\u{0008}").await
    }

    async fn set_file(&mut self, locator: &Locator, path: &Path) -> Result<(), AutomationError> {
        self.command(
            "element/file",
            json!({ "locator": locator, "path": path.to_string_lossy() }),
        )
        .await?;
        Ok(())
    }

    async fn read_attribute(
        &mut self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        let response = self
            .command("element/attribute", json!({ "locator": locator, "name": name }))
            .await?;
        Ok(response["value"].as_str().map(|s| s.to_string()))
    }

    async fn export_state(&mut self) -> Result<SessionSnapshot, AutomationError> {
        let response = self
            .client
            .get(self.endpoint("state"))
            .send()
            .await
            .map_err(|e| AutomationError::Driver(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AutomationError::Driver(format!(
                "state export returned {}",
                response.status()
            )));
        }

        let state: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AutomationError::Driver(e.to_string()))?;

        Ok(SessionSnapshot::new(state))
    }

    async fn dispose(&mut self) {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        if let Err(e) = self.client.delete(&url).send().await {
            warn!(session_id = %self.session_id, error = %e, "Bridge session dispose failed");
        } else {
            debug!(session_id = %self.session_id, "Bridge session disposed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_exists_dispose_roundtrip() {
        let mut server = mockito::Server::new_async().await;

        let create = server
            .mock("POST", "/session")
            .with_status(200)
            .with_body(r#"{"sessionId": "s-1"}"#)
            .create_async()
            .await;

        let exists = server
            .mock("POST", "/session/s-1/element/exists")
            .with_status(200)
            .with_body(r#"{"exists": true}"#)
            .create_async()
            .await;

        let dispose = server
            .mock("DELETE", "/session/s-1")
            .with_status(204)
            .create_async()
            .await;

        let factory = BridgeSessionFactory::new(&server.url()).unwrap();
        let mut session = factory.create(None).await.unwrap();

        assert!(session.exists(&Locator::css("#avatar-btn")).await.unwrap());
        session.dispose().await;

        create.assert_async().await;
        exists.assert_async().await;
        dispose.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_failure_is_session_init_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/session")
            .with_status(500)
            .create_async()
            .await;

        let factory = BridgeSessionFactory::new(&server.url()).unwrap();
        let err = factory.create(None).await.err().unwrap();
        assert!(matches!(err, AutomationError::SessionInit(_)));
    }

    #[tokio::test]
    async fn test_command_failure_is_driver_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/session")
            .with_status(200)
            .with_body(r#"{"sessionId": "s-2"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/session/s-2/navigate")
            .with_status(502)
            .with_body("bridge lost the browser")
            .create_async()
            .await;

        let factory = BridgeSessionFactory::new(&server.url()).unwrap();
        let mut session = factory.create(None).await.unwrap();

        let err = session.navigate("https://example.com").await.err().unwrap();
        match err {
            AutomationError::Driver(msg) => assert!(msg.contains("502")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
