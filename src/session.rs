//! Process-wide sign-in state.
//!
//! [`SessionContext`] owns the auth provider and publishes every change on a
//! `watch` channel. The REST store subscribes to it so writes carry the
//! visitor's token; the header renders a [`SessionIndicator`] from it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::model::User;
use crate::store::{AuthProvider, AuthSession};

pub const SIGN_IN_MESSAGE: &str = "Login successful! Redirecting...";
pub const SIGN_UP_MESSAGE: &str =
    "Sign up successful! Please check your email to confirm your account.";

pub struct SessionContext {
    auth: Arc<dyn AuthProvider>,
    tx: watch::Sender<Option<AuthSession>>,
    resolved: AtomicBool,
}

impl SessionContext {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            auth,
            tx,
            resolved: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.tx.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.tx.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn indicator(&self) -> SessionIndicator {
        if !self.resolved.load(Ordering::Acquire) {
            return SessionIndicator::Loading;
        }
        match self.current_user() {
            Some(user) => SessionIndicator::SignedIn {
                name: user.short_name().to_owned(),
            },
            None => SessionIndicator::SignedOut,
        }
    }

    fn publish(&self, session: Option<AuthSession>) {
        self.tx.send_replace(session);
        self.resolved.store(true, Ordering::Release);
    }

    /// Re-check the held token with the provider.
    pub async fn refresh(&self) -> Option<User> {
        let Some(session) = self.current() else {
            self.resolved.store(true, Ordering::Release);
            return None;
        };
        match self.auth.get_user(&session.access_token).await {
            Ok(Some(user)) => {
                self.publish(Some(AuthSession {
                    access_token: session.access_token,
                    user: user.clone(),
                }));
                Some(user)
            }
            Ok(None) => {
                tracing::info!("session expired");
                self.publish(None);
                None
            }
            Err(err) => {
                tracing::warn!(?err, "refresh session");
                self.publish(None);
                None
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<User> {
        let session = self.auth.sign_in_with_password(email.trim(), password).await?;
        let user = session.user.clone();
        tracing::info!(user = %user.email, "signed in");
        self.publish(Some(session));
        Ok(user)
    }

    /// Publishes only when the provider hands back a session right away.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> anyhow::Result<User> {
        let (user, session) = self.auth.sign_up(email.trim(), password, full_name).await?;
        tracing::info!(user = %user.email, confirmed = session.is_some(), "signed up");
        if let Some(session) = session {
            self.publish(Some(session));
        }
        Ok(user)
    }

    /// Local state is cleared even when the provider call fails.
    pub async fn sign_out(&self) -> anyhow::Result<()> {
        let session = self.current();
        self.publish(None);
        if let Some(session) = session {
            self.auth.sign_out(&session.access_token).await?;
            tracing::info!(user = %session.user.email, "signed out");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIndicator {
    Loading,
    SignedIn { name: String },
    SignedOut,
}

impl fmt::Display for SessionIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("Loading..."),
            Self::SignedIn { name } => write!(f, "Welcome, {name}"),
            Self::SignedOut => f.write_str("Sign In"),
        }
    }
}
