//! API client for communicating with the help desk backend.
//!
//! This module provides the `ApiClient` struct. Every call goes through the
//! same pipeline: attach credential, send, and on a 401 renew the credential
//! once and replay the call once.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::{AccessCredential, CredentialStore, RenewalCoordinator, RenewalOutcome};
use crate::config::Config;

use super::interceptor::{self, Disposition};
use super::{ApiError, ApiRequest, ApiResponse};

/// API client for the help desk backend.
/// Clone is cheap - the HTTP client, store and coordinator are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<CredentialStore>,
    renewal: Arc<RenewalCoordinator>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// The cookie store is enabled because the backend keeps the refresh
    /// credential in a cookie.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        store: Arc<CredentialStore>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
            renewal: Arc::new(RenewalCoordinator::new()),
        })
    }

    pub fn from_config(config: &Config, store: Arc<CredentialStore>) -> Result<Self> {
        Self::new(config.api_url(), config.request_timeout(), store)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Current access credential, if any
    pub fn access_credential(&self) -> Option<AccessCredential> {
        self.store.read()
    }

    /// Perform a call, renewing the credential and replaying once on 401.
    ///
    /// Non-success responses come back as typed errors. When renewal fails the
    /// original authorization failure is returned.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        loop {
            let (response, sent_with) = self.dispatch(&request).await?;

            match interceptor::disposition(&request, response.status()) {
                Disposition::Deliver => return Ok(response),
                Disposition::Propagate => return Err(response.into_error()),
                Disposition::Renew => {
                    request.mark_retried();
                    debug!(path = %request.path(), "Authorization failed, renewing credential");

                    if let RenewalOutcome::Failed = self.renew(sent_with.as_ref()).await {
                        return Err(response.into_error());
                    }
                    debug!(path = %request.path(), "Replaying request with renewed credential");
                }
            }
        }
    }

    /// Send and parse the JSON response body
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.json()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(ApiRequest::post(path).json(body)?).await
    }

    /// One HTTP exchange without any renewal logic.
    ///
    /// Returns the response together with the credential that was attached.
    pub(crate) async fn dispatch(
        &self,
        request: &ApiRequest,
    ) -> Result<(ApiResponse, Option<AccessCredential>), ApiError> {
        let url = self.url(request.path());

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .headers(request.headers().clone());
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let (builder, sent_with) = interceptor::attach_credential(builder, request, &self.store);

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            method = %request.method(),
            path = %request.path(),
            status = status.as_u16(),
            retried = request.is_retried(),
            "Request completed"
        );

        Ok((ApiResponse::new(status, body), sent_with))
    }

    /// Join or start the single renewal attempt.
    ///
    /// Tier and session generation are captured when the renewal starts, so a
    /// silent renewal keeps the user's "remember" choice and cannot outlive a
    /// logout.
    async fn renew(&self, sent_with: Option<&AccessCredential>) -> RenewalOutcome {
        let client = self.clone();
        self.renewal
            .renew(sent_with, move || {
                let (tier, generation) = client.store.renewal_target();
                async move { client.refresh_access_token(tier, generation).await }
            })
            .await
    }

    /// Forget the last settled renewal; called when a session starts or ends
    pub(crate) fn reset_renewal(&self) {
        self.renewal.reset();
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}
