//! Injected session context
//!
//! The context is the only holder of "who is signed in" for a shell. It is
//! passed down explicitly, and every consumer registers its own subscription
//! whose lifetime it controls.

use super::account::{validate_email, PasswordChange, SignUpForm};
use super::store::{AuthBackend, Session, SessionEvent, SessionEventKind};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Buffered session events per subscriber before it is reported as lagging
const EVENT_CAPACITY: usize = 16;

/// Session context shared by everything mounted for one user agent
pub struct SessionContext {
    backend: Arc<dyn AuthBackend>,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionContext {
    /// Create an unauthenticated context over a backend
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { backend, current: RwLock::new(None), events }
    }

    /// Create a context that already holds a session
    pub fn with_session(backend: Arc<dyn AuthBackend>, session: Session) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { backend, current: RwLock::new(Some(session)), events }
    }

    /// One-shot read of the current session
    ///
    /// An expired session is dropped on read and reported to subscribers.
    pub async fn current_session(&self) -> Option<Session> {
        let mut current = self.current.write().await;
        if !current.as_ref().is_some_and(Session::is_expired) {
            return current.clone();
        }

        if let Some(stale) = current.take() {
            log::info!("Session for {} expired", stale.user_id());
        }
        drop(current);
        self.publish(SessionEventKind::Expired, None);
        None
    }

    /// Register a listener for session changes
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription { receiver: self.events.subscribe() }
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Sign in through the backend and make the result the current session
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> crate::Result<Session> {
        let session = self.backend.sign_in_with_password(email, password).await?;
        *self.current.write().await = Some(session.clone());
        log::info!("User signed in: {} via {}", session.user_id(), self.backend.name());
        self.publish(SessionEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Register an account
    ///
    /// When the platform signs the new user in at once, the session becomes
    /// current exactly as after a password sign-in. `Ok(None)` means a
    /// confirmation e-mail went out and nobody is signed in yet.
    pub async fn sign_up(&self, form: &SignUpForm) -> crate::Result<Option<Session>> {
        let (email, full_name) = form.validate()?;
        let session = self.backend.sign_up(email, &form.password, full_name).await?;

        match session {
            Some(session) => {
                *self.current.write().await = Some(session.clone());
                log::info!("User signed up and in: {} via {}", session.user_id(), self.backend.name());
                self.publish(SessionEventKind::SignedIn, Some(session.clone()));
                Ok(Some(session))
            }
            None => {
                log::info!("Sign-up for {} awaits e-mail confirmation", email);
                Ok(None)
            }
        }
    }

    /// Ask for a password-reset e-mail
    pub async fn request_password_reset(&self, email: &str, redirect_to: Option<&str>) -> crate::Result<()> {
        let email = validate_email(email)?;
        self.backend.request_password_reset(email, redirect_to).await?;
        log::info!("Password reset requested for {}", email);
        Ok(())
    }

    /// Change the password of the signed-in account
    pub async fn update_password(&self, change: &PasswordChange) -> crate::Result<()> {
        let password = change.validate()?;
        let Some(session) = self.current_session().await else {
            return Err(crate::Error::Authentication("Not signed in".to_string()));
        };

        self.backend.update_password(&session.access_token, password).await?;
        log::info!("Password updated for {}", session.user_id());
        self.publish(SessionEventKind::UserUpdated, Some(session));
        Ok(())
    }

    /// Restore a session from a token carried by the caller
    ///
    /// Any failure leaves the context unauthenticated; the error is logged,
    /// not returned.
    pub async fn restore(&self, access_token: &str) -> Option<Session> {
        let session = match self.backend.get_session(access_token).await {
            Ok(Some(session)) if !session.is_expired() => session,
            Ok(Some(_)) => {
                log::debug!("Presented session token is expired");
                return None;
            }
            Ok(None) => {
                log::debug!("Presented session token is unknown to {}", self.backend.name());
                return None;
            }
            Err(e) => {
                log::error!("Session lookup failed: {}", e);
                return None;
            }
        };

        *self.current.write().await = Some(session.clone());
        self.publish(SessionEventKind::InitialSession, Some(session.clone()));
        Some(session)
    }

    /// Sign out the current session
    ///
    /// The local session is cleared even when the backend call fails, so a
    /// user is never stuck signed in because the platform is unreachable.
    pub async fn sign_out(&self) -> crate::Result<()> {
        let previous = self.current.write().await.take();
        let Some(session) = previous else {
            return Ok(());
        };

        let result = self.backend.sign_out(&session.access_token).await;
        if let Err(ref e) = result {
            log::warn!("Backend sign-out failed for {}: {}", session.user_id(), e);
        } else {
            log::info!("User signed out: {}", session.user_id());
        }

        self.publish(SessionEventKind::SignedOut, None);
        result
    }

    fn publish(&self, kind: SessionEventKind, session: Option<Session>) {
        // No receivers is not an error: nothing is mounted right now.
        let _ = self.events.send(SessionEvent::new(kind, session));
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("backend", &self.backend.name())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// What a subscription yields
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// A session change
    Changed(SessionEvent),
    /// The subscriber fell behind and missed this many events
    Missed(u64),
}

/// Live listener registration
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// removes the listener from the context.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    /// Wait for the next update; `None` once the context is gone
    pub async fn next(&mut self) -> Option<SessionUpdate> {
        match self.receiver.recv().await {
            Ok(event) => Some(SessionUpdate::Changed(event)),
            Err(broadcast::error::RecvError::Lagged(missed)) => Some(SessionUpdate::Missed(missed)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Explicitly remove this listener
    pub fn unsubscribe(self) {}
}
