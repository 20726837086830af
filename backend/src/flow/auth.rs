//! Authentication collaborator seam for the kiosk flow.
//!
//! The hosted identity provider owns sign-in; the flow only needs three
//! capabilities from it: the current session status (which starts out
//! unknown while the provider initializes), a bearer token for API calls,
//! and the hosted sign-in URL carrying a return address.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use url::Url;

/// Sign-in status as the identity provider reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// The provider has not finished initializing; not a failure.
    Loading,
    SignedOut,
    SignedIn,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn status(&self) -> AuthStatus;
    async fn bearer_token(&self) -> Result<String>;
    /// Hosted sign-in entry point that redirects back to `return_url`.
    fn sign_in_url(&self, return_url: &str) -> String;
}

#[async_trait]
impl<T: AuthProvider + ?Sized> AuthProvider for Arc<T> {
    fn status(&self) -> AuthStatus {
        (**self).status()
    }

    async fn bearer_token(&self) -> Result<String> {
        (**self).bearer_token().await
    }

    fn sign_in_url(&self, return_url: &str) -> String {
        (**self).sign_in_url(return_url)
    }
}

struct Session {
    status: AuthStatus,
    token: Option<String>,
}

/// Client-side handle on the hosted identity provider.
///
/// The provider's own SDK drives the transitions: the handle starts in
/// `Loading` and is flipped by `set_signed_out` / `set_session` once the
/// SDK resolves the session.
pub struct HostedAuthProvider {
    sign_in_base: Url,
    session: RwLock<Session>,
}

impl HostedAuthProvider {
    pub fn new(sign_in_base: Url) -> Self {
        Self {
            sign_in_base,
            session: RwLock::new(Session {
                status: AuthStatus::Loading,
                token: None,
            }),
        }
    }

    /// Records that the provider resolved to "no session".
    pub fn set_signed_out(&self) {
        let mut session = self.session.write().expect("auth session lock poisoned");
        session.status = AuthStatus::SignedOut;
        session.token = None;
    }

    /// Records a resolved session and its bearer token.
    pub fn set_session(&self, token: impl Into<String>) {
        let mut session = self.session.write().expect("auth session lock poisoned");
        session.status = AuthStatus::SignedIn;
        session.token = Some(token.into());
    }
}

#[async_trait]
impl AuthProvider for HostedAuthProvider {
    fn status(&self) -> AuthStatus {
        self.session.read().expect("auth session lock poisoned").status
    }

    async fn bearer_token(&self) -> Result<String> {
        self.session
            .read()
            .expect("auth session lock poisoned")
            .token
            .clone()
            .ok_or_else(|| anyhow!("no active session"))
    }

    fn sign_in_url(&self, return_url: &str) -> String {
        let mut url = self.sign_in_base.clone();
        url.query_pairs_mut().append_pair("return_url", return_url);
        url.to_string()
    }
}
