use std::{fmt, future::Future, sync::Arc};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{Action, ModuleKey, PermissionFetcher, PermissionStore, SessionLifecycle};

/// A refused (module, action) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub module: ModuleKey,
    pub action: Action,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "No Permission: {} on {}", self.action, self.module)
    }
}

/// Presents the "No Permission" signal to the user
pub trait DenialHandler: Send + Sync {
    fn on_denied(&self, denial: &Denial);
}

impl<F> DenialHandler for F
where
    F: Fn(&Denial) + Send + Sync,
{
    fn on_denied(&self, denial: &Denial) {
        self(denial)
    }
}

/// Default handler: a warning in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDenials;

impl DenialHandler for LogDenials {
    fn on_denied(&self, denial: &Denial) {
        warn!(module = %denial.module, action = %denial.action, "No Permission");
    }
}

/// Why an action was allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    AdminBypass,
    Matrix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed(Grant),
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }
}

/// Outcome of [AuthorizationGate::guard]. A denial is a normal outcome, not an error.
#[derive(Debug)]
pub enum GuardOutcome<T> {
    Allowed(T),
    Denied(Denial),
}

impl<T> GuardOutcome<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    pub fn allowed(self) -> Option<T> {
        match self {
            GuardOutcome::Allowed(value) => Some(value),
            GuardOutcome::Denied(_) => None,
        }
    }
}

/// Decision point for every protected action.
///
/// Client admins pass without a network call. Everyone else gets a fresh matrix from the
/// permission authority on every decision; when that refresh fails the cached matrix decides,
/// and with nothing cached the answer is no. If the session ended or changed hands while the
/// refresh was in flight, the decision denies.
///
/// Concurrent guards are not deduplicated. Disable the trigger of a non-idempotent operation
/// while its decision is pending.
#[derive(Clone)]
pub struct AuthorizationGate {
    store: Arc<PermissionStore>,
    fetcher: Arc<PermissionFetcher>,
    session: SessionLifecycle,
    denials: Arc<dyn DenialHandler>,
}

impl AuthorizationGate {
    /// Gate sharing store and fetcher with `session`
    pub fn new(session: &SessionLifecycle) -> Self {
        AuthorizationGate {
            store: session.store().clone(),
            fetcher: session.fetcher().clone(),
            session: session.clone(),
            denials: Arc::new(LogDenials),
        }
    }

    pub fn with_denial_handler(mut self, handler: impl DenialHandler + 'static) -> Self {
        self.denials = Arc::new(handler);
        self
    }

    /// Decides without running anything and without signalling a denial
    pub async fn check(&self, module: impl Into<ModuleKey>, action: Action) -> Decision {
        let module = module.into();
        let snapshot = self.store.snapshot();

        if snapshot.is_client_admin() {
            debug!(%module, %action, "client admin bypass");
            return Decision::Allowed(Grant::AdminBypass);
        }

        let user_id = snapshot.user_id();
        let allowed = match self.fetcher.refresh(user_id).await {
            Some(fresh) => {
                let allowed = fresh.allows(&module, action);
                match self.store.hydrate(user_id, fresh) {
                    Ok(true) => {
                        self.session.set_login_data();
                        allowed
                    }
                    // The fresh matrix belongs to a session that is gone
                    Ok(false) => {
                        debug!(%module, %action, "session changed during refresh");
                        false
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to persist refreshed matrix");
                        self.session.set_login_data();
                        allowed
                    }
                }
            }
            None => {
                let current = self.store.snapshot();
                current.user_id() == user_id && current.matrix.allows(&module, action)
            }
        };

        if allowed {
            debug!(%module, %action, "allowed");
            Decision::Allowed(Grant::Matrix)
        } else {
            debug!(%module, %action, "denied");
            Decision::Denied(Denial { module, action })
        }
    }

    /// Runs `operation` only if `action` on `module` is allowed right now.
    /// On denial the [DenialHandler] fires and `operation` is dropped unrun.
    pub async fn guard<F, Fut>(
        &self,
        module: impl Into<ModuleKey>,
        action: Action,
        operation: F,
    ) -> GuardOutcome<Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        match self.check(module, action).await {
            Decision::Allowed(_) => GuardOutcome::Allowed(operation().await),
            Decision::Denied(denial) => {
                self.denials.on_denied(&denial);
                GuardOutcome::Denied(denial)
            }
        }
    }

    /// [guard](Self::guard) for synchronous event handlers: runs on a spawned task. The decision
    /// and its cache write complete even if the handle is dropped.
    pub fn spawn_guard<F, Fut>(
        &self,
        module: impl Into<ModuleKey>,
        action: Action,
        operation: F,
    ) -> JoinHandle<GuardOutcome<Fut::Output>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let gate = self.clone();
        let module = module.into();
        tokio::spawn(async move { gate.guard(module, action, operation).await })
    }
}
