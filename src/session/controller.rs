//! Client-side session lifecycle.
//!
//! [`SessionController`] owns a cookie store and the current request context.
//! It establishes a token on start-up, rotates it when it nears expiry, and
//! tears the session down on logout or on any failed exchange. Navigation
//! side effects (go to login, reload, go to the dashboard) are recorded for
//! the embedding UI to act on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use super::cookie::ACCESS_COOKIE_NAME;
use super::login::{FieldErrors, INVALID_CREDENTIALS_MESSAGE, LoginForm, sign_in};
use super::refresh::{RefreshDecision, decide, exchange};
use super::state::{Session, SessionEvent, SessionState};
use super::store::{CookieStore, StoredCredentials, clear_cookies, read_user, save_user_cookie};
use super::token::now_secs;
use crate::api::{AuthService, RequestContext, User};

/// Interval between background refresh checks (4.5 minutes).
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(270);

/// Navigation requested by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Login,
    Dashboard,
    /// Reload the current view so it renders with the refreshed session.
    Reload,
}

/// What the UI renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub is_logged_in: bool,
    pub loading: bool,
}

/// Outcome of [`SessionController::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub ok: bool,
    pub errors: FieldErrors,
    /// Toast text shown next to the field errors.
    pub toast: Option<&'static str>,
}

pub struct SessionController<S> {
    auth: AuthService,
    store: S,
    context: RequestContext,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    loading: bool,
    navigation: Option<Navigation>,
}

impl<S: CookieStore> SessionController<S> {
    /// Create a controller over `store`. The cached user (if any) seeds the
    /// state, the way a server-rendered page hands its user to the client.
    pub fn new(auth: AuthService, store: S) -> Self {
        let state = match (store.get(ACCESS_COOKIE_NAME), read_user(&store)) {
            (Some(access_token), Some(user)) => SessionState::Authenticated(Session {
                access_token,
                user: Some(user),
            }),
            _ => SessionState::Anonymous,
        };
        let (state_tx, _) = watch::channel(state.clone());
        Self {
            auth,
            store,
            context: RequestContext::anonymous(),
            state,
            state_tx,
            loading: true,
            navigation: None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.state.user().cloned(),
            is_logged_in: self.state.is_logged_in(),
            loading: self.loading,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Follow state changes, including the in-flight `Refreshing` state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Context carrying the current access token, for API calls made by the UI.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Take the pending navigation, if any.
    pub fn take_navigation(&mut self) -> Option<Navigation> {
        self.navigation.take()
    }

    fn transition(&mut self, event: SessionEvent) {
        let current = std::mem::take(&mut self.state);
        let name = event.name();
        self.state = match current.clone().apply(event) {
            Ok(next) => next,
            Err(e) => {
                // Not reachable from the public methods; keep the old state.
                error!(error = %e, "Ignoring session event");
                current
            }
        };
        debug!(event = name, state = %self.state, "Session transition");
        self.state_tx.send_replace(self.state.clone());
    }

    /// Drop all session state, in memory and persisted.
    fn reset(&mut self) {
        clear_cookies(&mut self.store);
        self.context.set_token(None);
        self.transition(SessionEvent::LoggedOut);
        self.loading = false;
    }

    /// First-mount initialization.
    ///
    /// When a user is already cached the token is simply kept fresh. Otherwise a
    /// token is established and the profile fetched; a failed profile fetch
    /// ends the session and navigates to login.
    pub async fn initialize(&mut self) {
        if self.state.user().is_some() && self.state.access_token().is_some() {
            self.context
                .set_token(self.state.access_token().map(String::from));
            self.refresh().await;
            self.loading = false;
            return;
        }

        self.loading = true;
        if !self.refresh_inner(true).await {
            self.reset();
            return;
        }

        if !self.state.is_logged_in() {
            let response = self.auth.profile(&self.context).await;
            match response.into_result() {
                Ok(user) => self.set_user(user),
                Err(e) => {
                    warn!(error = %e, "Failed to load profile");
                    self.reset();
                    self.navigation = Some(Navigation::Login);
                    return;
                }
            }
        }
        self.loading = false;
    }

    /// Refresh decision: keep, rotate, or discard the stored token.
    pub async fn refresh(&mut self) {
        self.refresh_inner(false).await;
    }

    /// Returns whether a usable token is set afterwards.
    ///
    /// The state is `Refreshing` for as long as the exchange is in flight. A
    /// failed exchange applies `RefreshFailed`, then clears every cookie.
    async fn refresh_inner(&mut self, initial: bool) -> bool {
        let stored = StoredCredentials::read(&self.store);
        let (email, refresh_token) = match decide(&stored, now_secs()) {
            RefreshDecision::UseToken(token) => {
                if self.state.access_token() != Some(token.as_str()) {
                    let user = self.state.user().cloned();
                    self.transition(SessionEvent::LoggedIn(Session {
                        access_token: token.clone(),
                        user,
                    }));
                }
                self.context.set_token(Some(token));
                return true;
            }
            RefreshDecision::NoSession => {
                self.reset();
                return false;
            }
            RefreshDecision::Refresh {
                email,
                refresh_token,
            } => (email, refresh_token),
        };

        self.transition(SessionEvent::RefreshStarted);
        match exchange(&self.auth, &mut self.store, &email, &refresh_token).await {
            Ok(creds) => {
                info!(email = %creds.account_email, "Session refreshed");
                self.transition(SessionEvent::Refreshed(creds.access_token.clone()));
                if let Some(user) = self.state.user().cloned() {
                    save_user_cookie(&mut self.store, Some(&user));
                }
                self.context.set_token(Some(creds.access_token));
                if initial {
                    self.navigation = Some(Navigation::Reload);
                }
                true
            }
            Err(e) => {
                warn!(email = %email, error = %e, "Session refresh failed");
                self.transition(SessionEvent::RefreshFailed);
                clear_cookies(&mut self.store);
                self.context.set_token(None);
                self.loading = false;
                self.navigation = Some(Navigation::Login);
                false
            }
        }
    }

    fn set_user(&mut self, user: User) {
        save_user_cookie(&mut self.store, Some(&user));
        self.transition(SessionEvent::ProfileLoaded(user));
        self.loading = false;
    }

    /// Validate the form, sign in, load the profile and navigate to the dashboard.
    pub async fn login(&mut self, form: &LoginForm) -> LoginOutcome {
        if let Err(errors) = form.validate() {
            return LoginOutcome {
                ok: false,
                errors,
                toast: None,
            };
        }

        self.loading = true;
        let creds = match sign_in(&self.auth, &mut self.store, form).await {
            Ok(creds) => creds,
            Err(_) => {
                self.loading = false;
                return LoginOutcome {
                    ok: false,
                    errors: FieldErrors {
                        password: Some(INVALID_CREDENTIALS_MESSAGE),
                        ..Default::default()
                    },
                    toast: Some(INVALID_CREDENTIALS_MESSAGE),
                };
            }
        };

        self.context.set_token(Some(creds.access_token.clone()));
        self.transition(SessionEvent::LoggedIn(Session {
            access_token: creds.access_token,
            user: None,
        }));

        match self.auth.profile(&self.context).await.into_result() {
            Ok(user) => self.set_user(user),
            Err(e) => warn!(error = %e, "Signed in but failed to load profile"),
        }
        self.loading = false;
        self.navigation = Some(Navigation::Dashboard);

        LoginOutcome {
            ok: true,
            errors: FieldErrors::default(),
            toast: None,
        }
    }

    /// Clear cookies, the in-memory token and the state. Safe to call repeatedly.
    pub fn logout(&mut self) {
        self.loading = true;
        self.reset();
        info!("Logged out");
    }
}

/// Spawn the periodic refresh. Runs every [`REFRESH_INTERVAL`] while a user is
/// present; the mutex keeps cycles from overlapping with UI-driven calls.
pub fn spawn_refresh_scheduler<S>(
    controller: Arc<Mutex<SessionController<S>>>,
) -> tokio::task::JoinHandle<()>
where
    S: CookieStore + Send + 'static,
{
    spawn_refresh_scheduler_every(controller, REFRESH_INTERVAL)
}

/// [`spawn_refresh_scheduler`] with a custom period. The first check runs one
/// period after spawning.
pub fn spawn_refresh_scheduler_every<S>(
    controller: Arc<Mutex<SessionController<S>>>,
    period: Duration,
) -> tokio::task::JoinHandle<()>
where
    S: CookieStore + Send + 'static,
{
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);

        loop {
            interval.tick().await;
            let mut controller = controller.lock().await;
            if controller.state().user().is_some() {
                controller.refresh().await;
            }
        }
    })
}
