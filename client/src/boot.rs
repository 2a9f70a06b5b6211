//! # Boot sequencer — cold-start restore, reconciliation, route selection
//!
//! Runs exactly once per process start, never on warm resume:
//!
//! 1. Restore the persisted identity into the session.
//! 2. Reconcile the persisted walk flag against server truth — the one
//!    place local cache is cross-checked against the source of truth. A
//!    flag that went stale while the app was closed (counterpart canceled,
//!    app killed mid-walk) resolves silently to "inactive."
//! 3. Select the initial navigation branch.
//!
//! Role branching happens exactly once, here: the stored role string is
//! parsed into [`UserType`](store::UserType) during restore, and everything
//! downstream carries the typed value. A token whose stored role is
//! unrecognized routes to [`InitialRoute::UnknownRole`], an explicit error
//! branch whose only action is sign-out.
//!
//! The realtime connection is not part of boot: it is established at login
//! and torn down at logout. [`spawn_event_pump`] bridges a connected
//! channel's subscription into the walk coordinator.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use store::{KeyValueStore, SessionStore};

use crate::backend::Backend;
use crate::config::SafewalkConfig;
use crate::realtime::Subscription;
use crate::session::{AuthCoordinator, Session};
use crate::walk::WalkCoordinator;

/// Which navigation branch a cold start lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialRoute {
    /// No identity: authentication flow.
    SignedOut,
    /// A token with an unrecognized role: error screen offering only
    /// sign-out.
    UnknownRole,
    /// Signed in, no walk in progress.
    Idle,
    /// Signed in with a server-confirmed active walk.
    ActiveWalk,
}

/// The coordinators and initial route produced by [`boot`].
pub struct Boot<B, S: KeyValueStore> {
    pub auth: AuthCoordinator<B, S>,
    pub walk: WalkCoordinator<B, S>,
    pub route: InitialRoute,
}

/// Build the coordinators and resolve the initial route.
pub async fn boot<B, S>(config: &SafewalkConfig, backend: B, store: SessionStore<S>) -> Boot<B, S>
where
    B: Backend + Clone + Send + Sync + 'static,
    S: KeyValueStore + Clone + Send + Sync + 'static,
{
    let auth = AuthCoordinator::new(backend.clone(), store.clone());
    let walk = WalkCoordinator::new(backend, store, config.walk.pending_timeout());

    auth.restore_session().await;
    let session = auth.current();

    let route = if session.is_signed_out() {
        // No identity, so no walk either; clear any leftovers.
        walk.evict().await;
        InitialRoute::SignedOut
    } else if session.has_unknown_role() {
        InitialRoute::UnknownRole
    } else {
        let Some(auth_ctx) = session.auth_context() else {
            walk.evict().await;
            return Boot {
                auth,
                walk,
                route: InitialRoute::SignedOut,
            };
        };
        if walk.reconcile(&auth_ctx).await {
            InitialRoute::ActiveWalk
        } else {
            InitialRoute::Idle
        }
    };

    tracing::info!(?route, "boot complete");
    Boot { auth, walk, route }
}

/// Forward channel events into the walk coordinator until the channel or
/// the session goes away. Spawned once per login, after
/// [`WalkCoordinator::attach_channel`].
pub fn spawn_event_pump<B, S>(
    mut subscription: Subscription,
    walk: WalkCoordinator<B, S>,
    session: watch::Receiver<Session>,
) -> JoinHandle<()>
where
    B: Backend + Clone + Send + Sync + 'static,
    S: KeyValueStore + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = subscription.next().await {
            let auth = session.borrow().auth_context();
            let Some(auth) = auth else {
                // Signed out mid-stream; stop folding events.
                break;
            };
            walk.handle_event(&auth, &event).await;
        }
        tracing::debug!("event pump stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::{Event, RealtimeChannel, StatusSignal};
    use crate::testing::FakeBackend;
    use crate::walk::WalkPhase;
    use api::WalkStatus;
    use std::time::Duration;
    use store::{LatLng, MemoryStore, StoredWalk, UserType};

    fn stored_walk(id: &str) -> StoredWalk {
        StoredWalk {
            walk_id: id.to_string(),
            active: true,
            start: Some(LatLng::new(43.0757, -89.4040)),
            destination: Some(LatLng::new(43.0731, -89.4012)),
            user_email: Some("user@wisc.edu".to_string()),
            walker_email: Some("walker@wisc.edu".to_string()),
            user_socket_id: Some("u-sock".to_string()),
            walker_socket_id: Some("w-sock".to_string()),
        }
    }

    #[tokio::test]
    async fn test_boot_without_identity_routes_signed_out() {
        let store = SessionStore::new(MemoryStore::new());
        // Leftover walk keys from a torn-down session get swept.
        store.save_walk(&stored_walk("17")).await;

        let booted = boot(
            &SafewalkConfig::default(),
            FakeBackend::default(),
            store.clone(),
        )
        .await;

        assert_eq!(booted.route, InitialRoute::SignedOut);
        assert!(!store.has_walk_keys().await);
        assert!(!booted.auth.current().is_loading);
    }

    #[tokio::test]
    async fn test_boot_with_unknown_role_routes_to_error_branch() {
        let raw = MemoryStore::new();
        let store = SessionStore::new(raw.clone());
        store
            .save_identity("tok-1", UserType::User, "user@wisc.edu")
            .await;
        raw.put(store::keys::USER_TYPE, "superuser").await;

        let booted = boot(&SafewalkConfig::default(), FakeBackend::default(), store).await;

        assert_eq!(booted.route, InitialRoute::UnknownRole);
        assert!(booted.auth.current().has_unknown_role());
    }

    #[tokio::test]
    async fn test_boot_without_walk_routes_idle() {
        let store = SessionStore::new(MemoryStore::new());
        store
            .save_identity("tok-1", UserType::User, "user@wisc.edu")
            .await;

        let booted = boot(&SafewalkConfig::default(), FakeBackend::default(), store).await;

        assert_eq!(booted.route, InitialRoute::Idle);
        assert_eq!(booted.walk.state().phase(), WalkPhase::Empty);
    }

    #[tokio::test]
    async fn test_boot_with_stale_walk_clears_keys_and_routes_idle() {
        let store = SessionStore::new(MemoryStore::new());
        store
            .save_identity("tok-1", UserType::User, "user@wisc.edu")
            .await;
        store.save_walk(&stored_walk("17")).await;
        // The fake server has no walk "17": the status read is a 404.

        let booted = boot(&SafewalkConfig::default(), FakeBackend::default(), store.clone()).await;

        assert_eq!(booted.route, InitialRoute::Idle);
        assert_eq!(booted.walk.state().phase(), WalkPhase::Empty);
        assert!(!store.has_walk_keys().await);
    }

    #[tokio::test]
    async fn test_boot_with_live_walk_routes_active() {
        let backend = FakeBackend::default();
        backend.insert_requested_walk("17", "user@wisc.edu", Some("u-sock"));
        backend.set_walk_status("17", WalkStatus::Accepted);
        let store = SessionStore::new(MemoryStore::new());
        store
            .save_identity("tok-1", UserType::User, "user@wisc.edu")
            .await;
        store.save_walk(&stored_walk("17")).await;

        let booted = boot(&SafewalkConfig::default(), backend.clone(), store).await;

        assert_eq!(booted.route, InitialRoute::ActiveWalk);
        let state = booted.walk.state();
        assert_eq!(state.phase(), WalkPhase::Active);
        assert_eq!(state.counterpart_email, Some("walker@wisc.edu".to_string()));
        // Companion fields were read back from storage, not fetched.
        assert_eq!(backend.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_event_pump_folds_accept_into_state() {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message;

        let backend = FakeBackend::default();
        backend.add_account("user@wisc.edu", "hunter22", UserType::User);
        let store = SessionStore::new(MemoryStore::new());
        let booted = boot(&SafewalkConfig::default(), backend.clone(), store).await;
        booted
            .auth
            .login(UserType::User, "user@wisc.edu", "hunter22")
            .await
            .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Wait for the availability broadcast and the readiness ping
            // before pushing the accept, so the client-side walk exists.
            let _ = ws.next().await;
            let _ = ws.next().await;
            let accept = Event::WalkerWalkStatus {
                user_id: "u-sock".to_string(),
                status: StatusSignal::Accept,
            };
            ws.send(Message::Text(serde_json::to_string(&accept).unwrap()))
                .await
                .unwrap();
            let _ = ws.next().await;
        });

        let channel = RealtimeChannel::connect(&format!("ws://{addr}"))
            .await
            .unwrap();
        booted.walk.attach_channel(&channel);
        let pump = spawn_event_pump(
            channel.subscribe(),
            booted.walk.clone(),
            booted.auth.subscribe(),
        );

        let auth_ctx = booted.auth.current().auth_context().unwrap();
        booted
            .walk
            .create_walk(&auth_ctx, LatLng::new(43.07, -89.40), "Union", "Library")
            .await
            .unwrap();
        backend.set_walk_walker("1", "walker@wisc.edu", "w-sock");
        backend.set_walk_status("1", WalkStatus::Accepted);
        // Readiness ping: tells the loopback server it may push the accept.
        channel
            .sender()
            .emit(Event::WalkerLocation(LatLng::new(43.07, -89.40)));

        let mut rx = booted.walk.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            while rx.borrow().phase() != WalkPhase::Active {
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("walk never went active");

        assert_eq!(
            booted.walk.state().counterpart_email,
            Some("walker@wisc.edu".to_string())
        );

        channel.close();
        pump.abort();
        server.abort();
    }
}
