//! HTTP client for the courier server REST API
//!
//! Every request carries the caller's owner id; error bodies from the server
//! are surfaced as `anyhow` errors with the server's code attached.

use anyhow::{Context, Result, bail};
use courier_core::{DeliveryRecord, SessionSnapshot};
use courier_server::http::{
    CreateSessionRequest, DeliveryListResponse, EnqueueRequest, EnqueueResponse, HealthResponse,
    PairingResponse, SendRequest, SessionListResponse,
};
use courier_server::{ErrorResponse, OWNER_HEADER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

pub struct CourierClient {
    http: reqwest::Client,
    base_url: String,
    owner: String,
}

impl CourierClient {
    pub fn new(base_url: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(self.url(path))
            .header(OWNER_HEADER, &self.owner)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.url(path))
            .header(OWNER_HEADER, &self.owner)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("failed to reach courier server at {}", self.base_url))?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => bail!("{} ({}): {}", status, body.code, body.error),
            Err(_) => bail!("server returned {}", status),
        }
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.json(self.get("/api/health")).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSnapshot>> {
        let list: SessionListResponse = self.json(self.get("/api/sessions")).await?;
        Ok(list.sessions)
    }

    pub async fn create_session(&self, name: &str) -> Result<SessionSnapshot> {
        let body = CreateSessionRequest {
            name: name.to_string(),
        };
        self.json(self.post("/api/sessions").json(&body)).await
    }

    pub async fn get_session(&self, id: &str) -> Result<SessionSnapshot> {
        self.json(self.get(&format!("/api/sessions/{id}"))).await
    }

    /// Current pairing code, or None while the session is not pairing
    pub async fn pairing_code(&self, id: &str) -> Result<Option<String>> {
        let response = self
            .get(&format!("/api/sessions/{id}/qr"))
            .send()
            .await
            .with_context(|| format!("failed to reach courier server at {}", self.base_url))?;
        if response.status() == StatusCode::NOT_FOUND {
            let body: Option<ErrorResponse> = response.json().await.ok();
            return match body {
                Some(body) if body.code == "NO_PAIRING" => Ok(None),
                Some(body) => bail!("404 ({}): {}", body.code, body.error),
                None => bail!("session {} not found", id),
            };
        }
        if !response.status().is_success() {
            bail!("server returned {}", response.status());
        }
        let pairing: PairingResponse = response.json().await?;
        Ok(Some(pairing.code))
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        let request = self
            .http
            .delete(self.url(&format!("/api/sessions/{id}")))
            .header(OWNER_HEADER, &self.owner);
        self.send(request).await?;
        Ok(())
    }

    pub async fn reconnect_session(&self, id: &str) -> Result<SessionSnapshot> {
        self.json(self.post(&format!("/api/sessions/{id}/reconnect")))
            .await
    }

    pub async fn enqueue(
        &self,
        id: &str,
        destinations: Vec<String>,
        message: &str,
    ) -> Result<EnqueueResponse> {
        let body = EnqueueRequest {
            destinations,
            message: message.to_string(),
        };
        self.json(self.post(&format!("/api/sessions/{id}/messages")).json(&body))
            .await
    }

    pub async fn send_message(
        &self,
        id: &str,
        destination: &str,
        message: &str,
    ) -> Result<DeliveryRecord> {
        let body = SendRequest {
            destination: destination.to_string(),
            message: message.to_string(),
        };
        self.json(self.post(&format!("/api/sessions/{id}/send")).json(&body))
            .await
    }

    pub async fn deliveries(&self, id: &str) -> Result<Vec<DeliveryRecord>> {
        let list: DeliveryListResponse = self
            .json(self.get(&format!("/api/sessions/{id}/deliveries")))
            .await?;
        Ok(list.deliveries)
    }
}
