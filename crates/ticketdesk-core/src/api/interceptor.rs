//! Pre- and post-call hooks around every backend request.
//!
//! The request side attaches the access credential. The response side decides
//! whether a failure is final or should go through credential renewal.

use reqwest::{RequestBuilder, StatusCode};
use tracing::debug;

use crate::auth::{AccessCredential, CredentialStore};

use super::ApiRequest;

pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_REFRESH: &str = "/auth/refresh";
pub const AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_ME: &str = "/auth/me";

/// Endpoints that never carry the access credential and never trigger renewal
const AUTH_ENDPOINTS: [&str; 3] = [AUTH_LOGIN, AUTH_REFRESH, AUTH_LOGOUT];

pub fn is_auth_endpoint(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let path = path.trim_end_matches('/');
    AUTH_ENDPOINTS.contains(&path)
}

/// Attach the current access credential to an auth-required request.
///
/// Returns the credential that was attached, if any. A missing credential is
/// not an error: the request goes out bare and the backend answers 401.
pub fn attach_credential(
    builder: RequestBuilder,
    request: &ApiRequest,
    store: &CredentialStore,
) -> (RequestBuilder, Option<AccessCredential>) {
    if !request.auth_required() || is_auth_endpoint(request.path()) {
        return (builder, None);
    }

    match store.read() {
        Some(credential) => (builder.bearer_auth(credential.as_str()), Some(credential)),
        None => {
            debug!(path = %request.path(), "No access credential, sending without one");
            (builder, None)
        }
    }
}

/// What to do with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Success, hand it to the caller
    Deliver,
    /// Failure that goes to the caller as is
    Propagate,
    /// Authorization failure worth one renewal and replay
    Renew,
}

pub fn disposition(request: &ApiRequest, status: StatusCode) -> Disposition {
    if status.is_success() {
        Disposition::Deliver
    } else if status == StatusCode::UNAUTHORIZED
        && request.auth_required()
        && !request.is_retried()
        && !is_auth_endpoint(request.path())
    {
        Disposition::Renew
    } else {
        Disposition::Propagate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PersistenceTier;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_is_auth_endpoint() {
        assert!(is_auth_endpoint("/auth/login"));
        assert!(is_auth_endpoint("/auth/refresh/"));
        assert!(is_auth_endpoint("/auth/logout?all=1"));
        assert!(!is_auth_endpoint("/auth/me"));
        assert!(!is_auth_endpoint("/tickets"));
    }

    fn authorization(request: &ApiRequest, store: &CredentialStore) -> Option<String> {
        let builder = reqwest::Client::new().get("http://localhost/x");
        let (builder, _) = attach_credential(builder, request, store);
        let built = builder.build().unwrap();
        built
            .headers()
            .get(AUTHORIZATION)
            .map(|value| value.to_str().unwrap().to_string())
    }

    #[test]
    fn test_attaches_bearer_to_protected_request() {
        let store = CredentialStore::in_memory();
        store.write(&AccessCredential::new("abc").unwrap(), PersistenceTier::Ephemeral);

        assert_eq!(
            authorization(&ApiRequest::get("/tickets"), &store).as_deref(),
            Some("Bearer abc")
        );
    }

    #[test]
    fn test_no_header_without_credential() {
        let store = CredentialStore::in_memory();
        assert_eq!(authorization(&ApiRequest::get("/tickets"), &store), None);
    }

    #[test]
    fn test_no_header_for_public_or_auth_endpoints() {
        let store = CredentialStore::in_memory();
        store.write(&AccessCredential::new("abc").unwrap(), PersistenceTier::Durable);

        assert_eq!(authorization(&ApiRequest::get("/status").public(), &store), None);
        // Even when mistakenly flagged as protected
        assert_eq!(authorization(&ApiRequest::post(AUTH_LOGOUT), &store), None);
        assert_eq!(authorization(&ApiRequest::post(AUTH_REFRESH), &store), None);
    }

    #[test]
    fn test_disposition() {
        let protected = ApiRequest::get("/tickets");
        assert_eq!(disposition(&protected, StatusCode::OK), Disposition::Deliver);
        assert_eq!(disposition(&protected, StatusCode::UNAUTHORIZED), Disposition::Renew);
        assert_eq!(disposition(&protected, StatusCode::FORBIDDEN), Disposition::Propagate);
        assert_eq!(
            disposition(&protected, StatusCode::INTERNAL_SERVER_ERROR),
            Disposition::Propagate
        );

        let mut replayed = ApiRequest::get("/tickets");
        replayed.mark_retried();
        assert_eq!(disposition(&replayed, StatusCode::UNAUTHORIZED), Disposition::Propagate);
        assert_eq!(disposition(&replayed, StatusCode::OK), Disposition::Deliver);

        let refresh = ApiRequest::post(AUTH_REFRESH).public();
        assert_eq!(disposition(&refresh, StatusCode::UNAUTHORIZED), Disposition::Propagate);

        let public = ApiRequest::get("/status").public();
        assert_eq!(disposition(&public, StatusCode::UNAUTHORIZED), Disposition::Propagate);
    }
}
