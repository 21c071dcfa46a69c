//! Authenticated HTTP transport for Graph v1.0.

use crate::auth::{Credential, TokenProvider};
use crate::error::GraphError;
use crate::types::ErrorEnvelope;
use m365_core::config::Settings;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GraphClient {
    http: Client,
    base_url: String,
    tokens: TokenProvider,
}

impl GraphClient {
    pub fn new(http: Client, base_url: impl Into<String>, tokens: TokenProvider) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Build a client from validated settings. No network traffic happens
    /// until the first call.
    pub fn from_settings(settings: &Settings) -> Result<Self, GraphError> {
        let credential = Credential::from_settings(settings)?;
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let tokens = TokenProvider::new(http.clone(), settings.authority_url.clone(), credential);
        Ok(Self::new(http, settings.graph_base_url.clone(), tokens))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GraphError> {
        let token = self.tokens.access_token().await?;
        tracing::debug!(%method, path, "graph request");
        Ok(self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GraphError> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GraphError> {
        let request = self.request(Method::GET, path).await?.query(query);
        Ok(self.send(request).await?.json().await?)
    }

    pub(crate) async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GraphError> {
        let request = self.request(Method::POST, path).await?.json(body);
        Ok(self.send(request).await?.json().await?)
    }

    /// POST whose interesting result is in the headers (or nowhere).
    pub(crate) async fn post_accepted<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, GraphError> {
        let request = self.request(Method::POST, path).await?.json(body);
        self.send(request).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), GraphError> {
        let request = self.request(Method::DELETE, path).await?;
        self.send(request).await?;
        Ok(())
    }
}

async fn api_error(response: Response) -> GraphError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => GraphError::Api {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => GraphError::Api {
            status,
            code: None,
            message: body,
        },
    }
}
