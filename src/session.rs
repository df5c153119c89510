use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    Action, ApiClient, AuthError, ConfigError, FileBackend, GateConfig, ModuleKey,
    PermissionFetcher, PermissionMatrix, PermissionStore, Session, StoredSession, TransportError,
    UserId, wire,
};

// Candidate fields, tried in order
const TOKEN_FIELDS: &[&str] = &[
    "access_token",
    "token",
    "accessToken",
    "data.access_token",
    "data.token",
    "data.accessToken",
];
const USER_ID_FIELDS: &[&str] = &[
    "user_id",
    "userId",
    "user.id",
    "data.user_id",
    "data.user.id",
    "id",
];
const ADMIN_FIELDS: &[&str] = &[
    "is_client_admin",
    "user.is_client_admin",
    "data.is_client_admin",
    "data.user.is_client_admin",
];
const ROLE_ID_FIELDS: &[&str] = &["role_id", "user.role_id", "role.id", "data.role_id", "data.user.role_id"];
const ROLE_NAME_FIELDS: &[&str] = &[
    "role_name",
    "user.role_name",
    "role.name",
    "data.role_name",
    "data.user.role_name",
];

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Remote side of login/logout, plus the outgoing auth header
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Raw login response; its shape varies between deployments
    async fn login(&self, credentials: &Credentials) -> Result<Value, TransportError>;
    async fn logout(&self) -> Result<(), TransportError>;
    fn set_bearer_token(&self, token: Option<&str>);
}

/// Extracts a [Session] from a login response
pub fn parse_login_response(body: &Value) -> Result<Session, AuthError> {
    let token = wire::first_present(body, TOKEN_FIELDS)
        .and_then(wire::as_text)
        .ok_or(AuthError::NoAccessToken)?;
    let user_id = wire::first_present(body, USER_ID_FIELDS)
        .and_then(wire::as_u64)
        .map(UserId)
        .ok_or(AuthError::NoUserId)?;

    Ok(Session {
        token,
        user_id,
        is_client_admin: wire::first_present(body, ADMIN_FIELDS).is_some_and(wire::truthy),
        role_id: wire::first_present(body, ROLE_ID_FIELDS).and_then(wire::as_u64),
        role_name: wire::first_present(body, ROLE_NAME_FIELDS).and_then(wire::as_text),
    })
}

/// Session state as the UI sees it, re-derived from the store by
/// [set_login_data](SessionLifecycle::set_login_data)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub authenticated: bool,
    pub user_id: Option<UserId>,
    pub is_client_admin: bool,
    pub role_id: Option<u64>,
    pub role_name: Option<String>,
    pub permissions: PermissionMatrix,
}

impl SessionState {
    fn from_stored(stored: &StoredSession) -> Self {
        let session = stored.session.as_ref();
        SessionState {
            authenticated: session.is_some(),
            user_id: session.map(|session| session.user_id),
            is_client_admin: stored.is_client_admin(),
            role_id: session.and_then(|session| session.role_id),
            role_name: session.and_then(|session| session.role_name.clone()),
            permissions: stored.matrix.clone(),
        }
    }

    /// Cached answer, good for hiding buttons. Actions themselves go through the gate.
    pub fn can(&self, module: impl Into<ModuleKey>, action: Action) -> bool {
        self.is_client_admin || self.permissions.allows(module, action)
    }
}

/// Result of [SessionLifecycle::init]
#[derive(Debug)]
pub enum InitOutcome {
    Unauthenticated,
    /// Session restored; the matrix is being refreshed in the background
    Restored { hydration: JoinHandle<()> },
}

impl InitOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, InitOutcome::Restored { .. })
    }
}

/// Login, logout and startup hydration
#[derive(Clone)]
pub struct SessionLifecycle {
    store: Arc<PermissionStore>,
    fetcher: Arc<PermissionFetcher>,
    auth: Arc<dyn AuthApi>,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionLifecycle {
    pub fn new(
        store: Arc<PermissionStore>,
        fetcher: Arc<PermissionFetcher>,
        auth: Arc<dyn AuthApi>,
    ) -> Self {
        let (state, _rx) = watch::channel(SessionState::default());
        SessionLifecycle {
            store,
            fetcher,
            auth,
            state: Arc::new(state),
        }
    }

    /// HTTP client and file-backed store, as configured
    pub fn from_config(config: &GateConfig) -> Result<Self, ConfigError> {
        let client = Arc::new(ApiClient::from_config(&config.api)?);
        let store = Arc::new(PermissionStore::new(Arc::new(FileBackend::new(&config.state_path))));
        let fetcher = Arc::new(PermissionFetcher::new(client.clone()));
        Ok(Self::new(store, fetcher, client))
    }

    pub fn store(&self) -> &Arc<PermissionStore> {
        &self.store
    }

    pub fn fetcher(&self) -> &Arc<PermissionFetcher> {
        &self.fetcher
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Restores the persisted session on startup.
    ///
    /// With a persisted token the auth header and admin flag come back immediately and the
    /// matrix is refreshed on a spawned task. If that refresh fails the persisted matrix stays.
    pub async fn init(&self) -> InitOutcome {
        let restored = match self.store.init() {
            Ok(restored) => restored,
            Err(err) => {
                warn!(error = %err, "persisted session unreadable; starting unauthenticated");
                if let Err(err) = self.store.clear() {
                    error!(error = %err, "failed to discard unreadable session state");
                }
                self.auth.set_bearer_token(None);
                self.set_login_data();
                return InitOutcome::Unauthenticated;
            }
        };

        let Some(session) = restored.session.as_ref() else {
            debug!("no persisted session");
            self.auth.set_bearer_token(None);
            self.set_login_data();
            return InitOutcome::Unauthenticated;
        };

        self.auth.set_bearer_token(Some(&session.token));
        self.set_login_data();
        info!(user_id = %session.user_id, is_client_admin = session.is_client_admin, "session restored");

        let this = self.clone();
        let user_id = session.user_id;
        let hydration = tokio::spawn(async move {
            this.hydrate(user_id).await;
        });
        InitOutcome::Restored { hydration }
    }

    /// Authenticates, persists the session and loads its permission matrix.
    ///
    /// A failure after the credentials were accepted leaves nothing behind: no session in the
    /// store and no bearer token.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let body = self.auth.login(credentials).await?;
        let session = parse_login_response(&body)?;

        if let Err(err) = self.establish(&session).await {
            warn!(user_id = %session.user_id, error = %err, "login failed after authentication; rolling back");
            self.teardown();
            return Err(err);
        }

        info!(user_id = %session.user_id, is_client_admin = session.is_client_admin, "logged in");
        Ok(session)
    }

    async fn establish(&self, session: &Session) -> Result<(), AuthError> {
        self.store.update(StoredSession {
            session: Some(session.clone()),
            matrix: PermissionMatrix::new(),
        })?;
        self.auth.set_bearer_token(Some(&session.token));

        match self.fetcher.refresh(Some(session.user_id)).await {
            Some(matrix) => {
                self.store.hydrate(Some(session.user_id), matrix)?;
            }
            None => warn!(user_id = %session.user_id, "logged in without a permission matrix"),
        }

        self.set_login_data();
        Ok(())
    }

    /// Best-effort remote logout; local teardown always happens, even if this future is dropped
    /// half way.
    pub async fn logout(&self) {
        let _teardown = Teardown(self);
        if let Err(err) = self.auth.logout().await {
            warn!(error = %err, "remote logout failed; clearing local session anyway");
        }
    }

    /// Re-derives [SessionState] from whatever the store holds and publishes it
    pub fn set_login_data(&self) {
        let next = SessionState::from_stored(&self.store.snapshot());
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Out-of-band refresh of the current user's matrix. Returns whether a fresh matrix landed.
    pub async fn refresh_permissions(&self) -> bool {
        match self.store.snapshot().user_id() {
            Some(user_id) => self.hydrate(user_id).await,
            None => false,
        }
    }

    async fn hydrate(&self, user_id: UserId) -> bool {
        let Some(matrix) = self.fetcher.refresh(Some(user_id)).await else {
            return false;
        };
        let applied = match self.store.hydrate(Some(user_id), matrix) {
            Ok(applied) => applied,
            Err(err) => {
                warn!(%user_id, error = %err, "failed to persist refreshed matrix");
                true
            }
        };
        self.set_login_data();
        applied
    }

    fn teardown(&self) {
        self.auth.set_bearer_token(None);
        if let Err(err) = self.store.clear() {
            error!(error = %err, "failed to clear persisted session");
        }
        self.set_login_data();
    }
}

struct Teardown<'a>(&'a SessionLifecycle);

impl Drop for Teardown<'_> {
    fn drop(&mut self) {
        self.0.teardown();
        info!("logged out");
    }
}
