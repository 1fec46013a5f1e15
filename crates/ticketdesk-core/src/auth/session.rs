use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::UserIdentity;

use super::guard::{Route, View};
use super::token::PersistenceTier;

/// Progress of the startup session check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapPhase {
    #[default]
    Unchecked,
    Checking,
    Ready,
}

/// What the UI needs to know about the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<UserIdentity>,
    /// True once the startup check has resolved
    pub ready: bool,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }
}

/// Login form contents
#[derive(Clone)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
    /// Keep the credential across restarts
    pub remember: bool,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("remember", &self.remember)
            .finish()
    }
}

#[derive(Default)]
struct Inner {
    phase: BootstrapPhase,
    identity: Option<UserIdentity>,
}

/// Session facade for the surrounding UI.
///
/// Owns the identity of the signed-in user. The identity is only valid while
/// the store holds a credential: once a renewal fails and clears the store,
/// the next look at the session reports it signed out.
///
/// Bootstrap, login and logout run one at a time, so a login finishing during
/// the startup check is never overwritten by its result.
pub struct SessionManager {
    api: ApiClient,
    inner: Mutex<Inner>,
    transition: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            inner: Mutex::new(Inner::default()),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Client for authenticated calls
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Startup check: restore the session behind a stored credential.
    ///
    /// Runs once; later calls return the settled state without network I/O.
    /// Without a stored credential nothing is sent. A credential the backend
    /// rejects, even after renewal, is cleared and the session starts signed
    /// out. Renewal failure is not retried: the user lands on the login view.
    pub async fn bootstrap(&self) -> SessionState {
        let _transition = self.transition.lock().await;
        if self.phase() == BootstrapPhase::Ready {
            return self.state();
        }
        self.lock().phase = BootstrapPhase::Checking;

        let identity = if self.api.access_credential().is_none() {
            debug!("No stored credential, starting signed out");
            None
        } else {
            match self.api.me().await {
                Ok(user) => {
                    info!(user_id = user.id, role = ?user.role, "Session restored");
                    Some(user)
                }
                Err(e) => {
                    warn!(error = %e, "Stored session is not valid, starting signed out");
                    self.api.store().clear();
                    None
                }
            }
        };

        {
            let mut inner = self.lock();
            inner.identity = identity;
            inner.phase = BootstrapPhase::Ready;
        }
        self.state()
    }

    /// Sign in and store the credential in the tier matching `remember`
    pub async fn login(&self, request: LoginRequest) -> Result<UserIdentity, ApiError> {
        let _transition = self.transition.lock().await;
        let (credential, user) = match self.api.login(&request.login, &request.password).await {
            Ok(result) => result,
            Err(e) => {
                warn!(login = %request.login, error = %e, "Login failed");
                return Err(e);
            }
        };

        let tier = PersistenceTier::from_remember(request.remember);
        self.api.store().write(&credential, tier);
        self.api.reset_renewal();
        self.lock().identity = Some(user.clone());

        info!(user_id = user.id, role = ?user.role, ?tier, "Login successful");
        Ok(user)
    }

    /// Sign out. Backend failures are logged and the local session ends anyway.
    ///
    /// A renewal still in flight may finish, but it no longer writes to the
    /// store.
    pub async fn logout(&self) {
        let _transition = self.transition.lock().await;
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Logout request failed, signing out locally");
        }
        self.api.store().clear();
        self.api.reset_renewal();
        self.lock().identity = None;
        info!("Signed out");
    }

    pub fn current_identity(&self) -> Option<UserIdentity> {
        let mut inner = self.lock();
        if inner.identity.is_some() && self.api.access_credential().is_none() {
            info!("Access credential is gone, session ended");
            inner.identity = None;
        }
        inner.identity.clone()
    }

    pub fn is_session_ready(&self) -> bool {
        self.phase() == BootstrapPhase::Ready
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.lock().phase
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            identity: self.current_identity(),
            ready: self.is_session_ready(),
        }
    }

    /// Where the UI should go when `requested` is asked for
    pub fn route(&self, requested: View) -> Route {
        self.state().route(requested)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PersistenceTier;
    use crate::models::Role;
    use crate::test_support::{client_for, credential, store_with_tiers, user_json, NoAuthorization};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_me(server: &MockServer, token: &str, status: u16, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("Authorization", format!("Bearer {}", token).as_str()))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "user": user_json(4, "user") })),
            )
            .expect(calls)
            .mount(server)
            .await;
    }

    async fn mount_refresh(server: &MockServer, status: u16, body: serde_json::Value, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(NoAuthorization)
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(calls)
            .mount(server)
            .await;
    }

    fn login_request(remember: bool) -> LoginRequest {
        LoginRequest {
            login: "apetrova".to_string(),
            password: "hunter2".to_string(),
            remember,
        }
    }

    async fn mount_login(server: &MockServer, status: u16) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "accessToken": "abc",
                "user": user_json(9, "support"),
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_bootstrap_without_credential_sends_nothing() {
        let server = MockServer::start().await;
        let (store, _) = store_with_tiers();
        let session = SessionManager::new(client_for(&server, store));

        assert!(!session.is_session_ready());
        let state = session.bootstrap().await;

        assert_eq!(state, SessionState { identity: None, ready: true });
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_with_valid_durable_credential() {
        let server = MockServer::start().await;
        mount_me(&server, "abc", 200, 1).await;
        mount_refresh(&server, 200, json!({ "accessToken": "x" }), 0).await;

        let (store, _) = store_with_tiers();
        store.write(&credential("abc"), PersistenceTier::Durable);
        let session = SessionManager::new(client_for(&server, store));

        let state = session.bootstrap().await;
        assert!(state.ready);
        assert_eq!(state.identity.map(|user| user.id), Some(4));

        // Ready is terminal: no second check
        let again = session.bootstrap().await;
        assert!(again.is_signed_in());
        assert_eq!(session.phase(), BootstrapPhase::Ready);
    }

    #[tokio::test]
    async fn test_bootstrap_renews_expired_credential() {
        let server = MockServer::start().await;
        mount_me(&server, "old", 401, 1).await;
        mount_me(&server, "new", 200, 1).await;
        mount_refresh(&server, 200, json!({ "accessToken": "new" }), 1).await;

        let (store, tiers) = store_with_tiers();
        store.write(&credential("old"), PersistenceTier::Durable);
        let session = SessionManager::new(client_for(&server, store.clone()));

        let state = session.bootstrap().await;
        assert!(state.is_signed_in());
        assert_eq!(store.read(), Some(credential("new")));
        assert_eq!(store.current_tier(), PersistenceTier::Durable);
        assert!(tiers.ephemeral.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_with_failed_renewal_signs_out() {
        let server = MockServer::start().await;
        mount_me(&server, "old", 401, 1).await;
        mount_refresh(&server, 500, json!({ "error": "down" }), 1).await;

        let (store, tiers) = store_with_tiers();
        store.write(&credential("old"), PersistenceTier::Ephemeral);
        let session = SessionManager::new(client_for(&server, store.clone()));

        let state = session.bootstrap().await;
        assert_eq!(state, SessionState { identity: None, ready: true });
        assert!(tiers.ephemeral.is_empty());
        assert!(tiers.durable.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_with_unreachable_backend_signs_out() {
        let (store, _) = store_with_tiers();
        store.write(&credential("abc"), PersistenceTier::Durable);
        let api = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(2), store.clone())
            .unwrap();
        let session = SessionManager::new(api);

        let state = session.bootstrap().await;
        assert!(state.ready);
        assert!(!state.is_signed_in());
        assert_eq!(store.read(), None);
    }

    #[tokio::test]
    async fn test_login_without_remember_uses_ephemeral_tier() {
        let server = MockServer::start().await;
        mount_login(&server, 200).await;

        let (store, tiers) = store_with_tiers();
        let session = SessionManager::new(client_for(&server, store.clone()));

        let user = session.login(login_request(false)).await.unwrap();
        assert_eq!(user.role, Role::Support);
        assert_eq!(session.current_identity(), Some(user));
        assert_eq!(store.current_tier(), PersistenceTier::Ephemeral);
        assert!(!tiers.ephemeral.is_empty());
        assert!(tiers.durable.is_empty());
    }

    #[tokio::test]
    async fn test_login_with_remember_uses_durable_tier() {
        let server = MockServer::start().await;
        mount_login(&server, 200).await;

        let (store, tiers) = store_with_tiers();
        let session = SessionManager::new(client_for(&server, store.clone()));

        session.login(login_request(true)).await.unwrap();
        assert_eq!(store.current_tier(), PersistenceTier::Durable);
        assert!(tiers.ephemeral.is_empty());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_signed_out() {
        let server = MockServer::start().await;
        mount_login(&server, 401).await;
        mount_refresh(&server, 200, json!({ "accessToken": "x" }), 0).await;

        let (store, _) = store_with_tiers();
        let session = SessionManager::new(client_for(&server, store.clone()));

        let err = session.login(login_request(false)).await.unwrap_err();
        assert_eq!(err.login_message(), "Invalid login or password");
        assert_eq!(session.current_identity(), None);
        assert_eq!(store.read(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let server = MockServer::start().await;
        mount_login(&server, 200).await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(NoAuthorization)
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let (store, _) = store_with_tiers();
        let session = SessionManager::new(client_for(&server, store.clone()));
        session.login(login_request(true)).await.unwrap();

        session.logout().await;
        assert_eq!(session.current_identity(), None);
        assert_eq!(store.read(), None);
    }

    #[tokio::test]
    async fn test_failed_renewal_ends_session() {
        let server = MockServer::start().await;
        mount_login(&server, 200).await;
        Mock::given(method("GET"))
            .and(path("/tickets/my"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        mount_refresh(&server, 401, json!({}), 1).await;

        let (store, _) = store_with_tiers();
        let session = SessionManager::new(client_for(&server, store));
        session.bootstrap().await;
        session.login(login_request(false)).await.unwrap();
        assert!(session.current_identity().is_some());
        assert_eq!(session.route(View::Login), Route::Redirect(View::Admin));

        let result = session.api().list_my_tickets().await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(session.current_identity(), None);
        assert_eq!(session.route(View::User), Route::Redirect(View::Login));
    }

    #[tokio::test]
    async fn test_logout_during_renewal_keeps_credential_cleared() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tickets/my"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "accessToken": "new" }))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let (store, tiers) = store_with_tiers();
        store.write(&credential("old"), PersistenceTier::Durable);
        let session = SessionManager::new(client_for(&server, store.clone()));

        let (result, ()) = tokio::join!(session.api().list_my_tickets(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            session.logout().await;
        });

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(store.read(), None);
        assert!(tiers.durable.is_empty());
        assert!(tiers.ephemeral.is_empty());
        assert_eq!(session.current_identity(), None);
    }

    #[tokio::test]
    async fn test_login_during_bootstrap_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("Authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;
        mount_refresh(&server, 401, json!({}), 1).await;
        mount_login(&server, 200).await;

        let (store, _) = store_with_tiers();
        store.write(&credential("old"), PersistenceTier::Durable);
        let session = SessionManager::new(client_for(&server, store.clone()));

        let (_, login) = tokio::join!(session.bootstrap(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.login(login_request(false)).await
        });

        assert_eq!(login.unwrap().id, 9);
        assert!(session.is_session_ready());
        assert_eq!(session.current_identity().map(|user| user.id), Some(9));
        assert_eq!(store.read(), Some(credential("abc")));
        assert_eq!(store.current_tier(), PersistenceTier::Ephemeral);
    }

    #[test]
    fn test_login_request_debug_hides_password() {
        let debug = format!("{:?}", login_request(true));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("apetrova"));
    }
}
