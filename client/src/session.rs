//! # Auth coordinator — identity session lifecycle
//!
//! Owns the reactive [`Session`] and the four operations on it: restore at
//! boot, login, logout, and registration. Identity is persisted through the
//! [`SessionStore`] before the in-memory state is published, and evicted
//! from both on sign-out. Sign-out also evicts walk state through the walk
//! coordinator, so a signed-out session can never retain a stale active
//! walk.
//!
//! Expected failures (unknown credentials, existing account, server errors)
//! come back as [`ClientError`] values with the session unchanged; a login
//! either transitions to signed-in or changes nothing.

use std::sync::Arc;

use tokio::sync::watch;

use api::{ApiError, AuthContext, RegisterRequest};
use store::{KeyValueStore, SessionStore, UserType};

use crate::backend::Backend;
use crate::error::ClientError;
use crate::walk::WalkCoordinator;

/// The client's local projection of the signed-in identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub is_loading: bool,
    pub token: Option<String>,
    /// `None` while signed out — or, with a token present, when the stored
    /// role is unrecognized and the only safe action is sign-out.
    pub user_type: Option<UserType>,
    pub email: Option<String>,
}

impl Session {
    fn loading() -> Self {
        Session {
            is_loading: true,
            token: None,
            user_type: None,
            email: None,
        }
    }

    fn signed_out() -> Self {
        Session {
            is_loading: false,
            ..Session::loading()
        }
    }

    /// Authenticated iff a token is held.
    pub fn is_signed_out(&self) -> bool {
        self.token.is_none()
    }

    /// A token without a recognized role: route to the error branch that
    /// offers only sign-out.
    pub fn has_unknown_role(&self) -> bool {
        self.token.is_some() && self.user_type.is_none()
    }

    /// Headers for authenticated requests, when fully signed in.
    pub fn auth_context(&self) -> Option<AuthContext> {
        Some(AuthContext {
            token: self.token.clone()?,
            email: self.email.clone()?,
            user_type: self.user_type?,
        })
    }
}

struct AuthInner<B, S: KeyValueStore> {
    backend: B,
    store: SessionStore<S>,
    state: watch::Sender<Session>,
}

/// Owner of [`Session`]. Cheap to clone; clones share state.
pub struct AuthCoordinator<B, S: KeyValueStore> {
    inner: Arc<AuthInner<B, S>>,
}

impl<B, S: KeyValueStore> Clone for AuthCoordinator<B, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B, S> AuthCoordinator<B, S>
where
    B: Backend + Clone + Send + Sync + 'static,
    S: KeyValueStore + Clone + Send + Sync + 'static,
{
    /// The session starts loading until [`restore_session`](Self::restore_session)
    /// resolves it.
    pub fn new(backend: B, store: SessionStore<S>) -> Self {
        let (state, _) = watch::channel(Session::loading());
        Self {
            inner: Arc::new(AuthInner {
                backend,
                store,
                state,
            }),
        }
    }

    /// Watch the reactive session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Resolve the persisted identity. Never fails: an absent or unreadable
    /// identity is signed-out, and the session always leaves the loading
    /// state.
    pub async fn restore_session(&self) {
        match self.inner.store.load_identity().await {
            None => {
                tracing::debug!("no persisted identity, starting signed out");
                self.publish(Session::signed_out());
            }
            Some(identity) => {
                if identity.user_type.is_none() {
                    tracing::warn!("persisted user type is unrecognized");
                }
                self.publish(Session {
                    is_loading: false,
                    token: Some(identity.token),
                    user_type: identity.user_type,
                    email: Some(identity.email),
                });
            }
        }
    }

    /// Trade credentials for a token. Unknown credentials surface as
    /// [`ClientError::InvalidCredentials`]; any other failure as a generic
    /// server error. The session transitions to signed-in or stays exactly
    /// as it was.
    pub async fn login(
        &self,
        user_type: UserType,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let resp = self
            .inner
            .backend
            .login(user_type, email, password)
            .await
            .map_err(|err| match err {
                ApiError::NotFound => ClientError::InvalidCredentials,
                other => ClientError::Server(other),
            })?;

        self.inner
            .store
            .save_identity(&resp.token, user_type, email)
            .await;
        self.publish(Session {
            is_loading: false,
            token: Some(resp.token),
            user_type: Some(user_type),
            email: Some(email.to_string()),
        });
        tracing::info!(email, role = user_type.as_str(), "signed in");
        Ok(())
    }

    /// Create an account, then sign in with it. An email that already has an
    /// account surfaces as [`ClientError::AccountExists`].
    pub async fn register(&self, req: &RegisterRequest) -> Result<(), ClientError> {
        match self.inner.backend.user_exists(&req.email).await {
            Ok(true) => return Err(ClientError::AccountExists),
            Ok(false) => {}
            Err(err) => return Err(ClientError::Server(err)),
        }
        self.inner
            .backend
            .register(req)
            .await
            .map_err(|err| match err {
                ApiError::Conflict => ClientError::AccountExists,
                other => ClientError::Server(other),
            })?;
        self.login(req.user_type(), &req.email, &req.password).await
    }

    /// Sign out: evict the walk first, then the identity, then publish the
    /// signed-out session.
    pub async fn logout(&self, walk: &WalkCoordinator<B, S>) {
        walk.evict().await;
        self.inner.store.clear_identity().await;
        self.publish(Session::signed_out());
        tracing::info!("signed out");
    }

    fn publish(&self, session: Session) {
        self.inner.state.send_replace(session);
    }
}
