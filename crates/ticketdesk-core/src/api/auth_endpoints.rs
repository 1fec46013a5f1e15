//! Authentication endpoints: login, refresh, logout and "who am I".

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{AccessCredential, PersistenceTier, RenewalOutcome};
use crate::models::UserIdentity;

use super::interceptor::{AUTH_LOGIN, AUTH_LOGOUT, AUTH_ME, AUTH_REFRESH};
use super::{ApiClient, ApiError, ApiRequest};

#[derive(Serialize)]
struct LoginBody<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    user: UserIdentity,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    user: UserIdentity,
}

impl ApiClient {
    /// Exchange login and password for an access credential.
    ///
    /// The credential is returned, not stored: the caller picks the tier.
    pub async fn login(
        &self,
        login: &str,
        password: &str,
    ) -> Result<(AccessCredential, UserIdentity), ApiError> {
        let request = ApiRequest::post(AUTH_LOGIN)
            .public()
            .json(&LoginBody { login, password })?;

        let response: LoginResponse = self.send_json(request).await?;
        let credential = AccessCredential::new(response.access_token).ok_or_else(|| {
            ApiError::InvalidResponse("Login response carried an empty access token".to_string())
        })?;

        Ok((credential, response.user))
    }

    /// Tell the backend to end the session (drops the refresh cookie)
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send(ApiRequest::post(AUTH_LOGOUT).public()).await?;
        Ok(())
    }

    /// Identity behind the current access credential
    pub async fn me(&self) -> Result<UserIdentity, ApiError> {
        let response: MeResponse = self.get_json(AUTH_ME).await?;
        Ok(response.user)
    }

    /// Mint a new access credential from the refresh cookie.
    ///
    /// `tier` and `generation` are captured when the renewal starts. Success
    /// writes the credential into `tier`; any failure clears the store. Both
    /// only happen while `generation` is still current: after a logout or a
    /// new login the result is dropped and the renewal counts as failed.
    /// Never goes through the renewal path itself.
    pub(crate) async fn refresh_access_token(
        &self,
        tier: PersistenceTier,
        generation: u64,
    ) -> RenewalOutcome {
        match self.request_refresh().await {
            Ok(credential) => {
                if self.store().write_if_current(&credential, tier, generation) {
                    info!(?tier, "Access credential renewed");
                    RenewalOutcome::Renewed(credential)
                } else {
                    info!("Session changed during renewal, dropping renewed credential");
                    RenewalOutcome::Failed
                }
            }
            Err(e) => {
                if self.store().clear_if_current(generation) {
                    warn!(error = %e, "Access credential renewal failed, clearing session");
                } else {
                    warn!(error = %e, "Access credential renewal failed after session changed");
                }
                RenewalOutcome::Failed
            }
        }
    }

    async fn request_refresh(&self) -> Result<AccessCredential, ApiError> {
        let (response, _) = self
            .dispatch(&ApiRequest::post(AUTH_REFRESH).public())
            .await?;
        if !response.is_success() {
            return Err(response.into_error());
        }

        let body: RefreshResponse = response.json()?;
        AccessCredential::new(body.access_token).ok_or_else(|| {
            ApiError::InvalidResponse("Refresh response carried an empty access token".to_string())
        })
    }
}
