//! # Walk coordinator — the walk lifecycle state machine
//!
//! Owns the client's projection of the current walk and every transition on
//! it. The server record is the source of truth; this coordinator keeps a
//! local [`WalkState`] consistent with it through REST writes, counterpart
//! events, and (at boot) [`reconcile`](WalkCoordinator::reconcile).
//!
//! ## State machine
//!
//! ```text
//! EMPTY --create_walk--> PENDING
//! PENDING --accept (walker)--> ACTIVE
//! PENDING --deny | timeout | cancel--> EMPTY
//! ACTIVE --cancel (either party)--> EMPTY
//! ACTIVE --complete (walker)--> EMPTY
//! ```
//!
//! The terminal state is always EMPTY. A failed operation either collapses
//! back to EMPTY or leaves the previous state untouched with an error
//! surfaced — never a partial state. How a walk ended is published as
//! [`WalkState::last_end`], with a distinct value for each way out, and the
//! presentation layer clears it once shown.
//!
//! ## Ordering
//!
//! Every mutation writes through the [`SessionStore`] before publishing the
//! in-memory state, so a process kill between the two loses at most the
//! in-memory update. There is no multi-key transaction; boot reconciliation
//! treats any inconsistency as "walk inactive."
//!
//! ## Races
//!
//! Walk assignment is arbitrated by the server: `accept_walk` reads the
//! status immediately before writing, and a losing Safewalker gets
//! [`ClientError::Unavailable`] with its own state untouched. Duplicate
//! `create_walk` calls are rejected while a request is pending, in flight
//! included, so at most one walk id is ever persisted per identity.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use api::{ApiError, AuthContext, Walk, WalkRequest, WalkStatus, WalkUpdate};
use store::{KeyValueStore, LatLng, SessionStore, StoredWalk, UserType};

use crate::backend::Backend;
use crate::error::ClientError;
use crate::realtime::{Event, EventSender, RealtimeChannel, StatusSignal};

/// Phase of the local walk projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkPhase {
    Empty,
    Pending,
    Active,
}

/// How the last walk ended. Each variant carries a distinct user-facing
/// message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEnd {
    Canceled { by: UserType },
    TimedOut,
    Denied,
    Completed,
}

impl WalkEnd {
    pub fn message(&self) -> &'static str {
        match self {
            WalkEnd::Canceled { by: UserType::User } => "The user canceled the walk.",
            WalkEnd::Canceled { by: UserType::Safewalker } => {
                "The SAFEwalker canceled the walk."
            }
            WalkEnd::TimedOut => "No SAFEwalker responded in time, so the request timed out.",
            WalkEnd::Denied => "Your walk request was denied.",
            WalkEnd::Completed => "Walk completed.",
        }
    }
}

/// The client's local projection of the current walk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WalkState {
    pub is_loading: bool,
    pub active: bool,
    pub walk_id: Option<String>,
    pub start: Option<LatLng>,
    pub destination: Option<LatLng>,
    pub counterpart_email: Option<String>,
    pub own_socket_id: Option<String>,
    pub counterpart_socket_id: Option<String>,
    /// Live position of the Safewalker, folded from location events.
    pub walker_location: Option<LatLng>,
    /// Set when a walk ends; cleared by the presentation layer once shown.
    pub last_end: Option<WalkEnd>,
}

impl WalkState {
    pub fn phase(&self) -> WalkPhase {
        if self.walk_id.is_none() {
            WalkPhase::Empty
        } else if self.active {
            WalkPhase::Active
        } else {
            WalkPhase::Pending
        }
    }
}

struct WalkInner<B, S: KeyValueStore> {
    backend: B,
    store: SessionStore<S>,
    state: watch::Sender<WalkState>,
    events: Mutex<Option<EventSender>>,
    own_socket: Mutex<Option<String>>,
    pending_timeout: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Owner of [`WalkState`]. Cheap to clone; clones share state.
pub struct WalkCoordinator<B, S: KeyValueStore> {
    inner: Arc<WalkInner<B, S>>,
}

impl<B, S: KeyValueStore> Clone for WalkCoordinator<B, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B, S> WalkCoordinator<B, S>
where
    B: Backend + Clone + Send + Sync + 'static,
    S: KeyValueStore + Clone + Send + Sync + 'static,
{
    pub fn new(backend: B, store: SessionStore<S>, pending_timeout: Duration) -> Self {
        let (state, _) = watch::channel(WalkState::default());
        Self {
            inner: Arc::new(WalkInner {
                backend,
                store,
                state,
                events: Mutex::new(None),
                own_socket: Mutex::new(None),
                pending_timeout,
                timer: Mutex::new(None),
            }),
        }
    }

    /// Watch the reactive walk state.
    pub fn subscribe(&self) -> watch::Receiver<WalkState> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> WalkState {
        self.inner.state.borrow().clone()
    }

    /// Wire counterpart notifications through a connected channel. Called
    /// once per login.
    pub fn attach_channel(&self, channel: &RealtimeChannel) {
        self.set_event_sender(channel.sender());
        if let Some(id) = channel.socket_id() {
            *self.inner.own_socket.lock().unwrap() = Some(id);
        }
    }

    pub fn set_event_sender(&self, sender: EventSender) {
        *self.inner.events.lock().unwrap() = Some(sender);
    }

    /// Clear the end-of-walk marker after the presentation layer has shown
    /// its message.
    pub fn clear_last_end(&self) {
        self.inner.state.send_modify(|s| s.last_end = None);
    }

    /// Request an escort. Valid only while no walk is pending or active for
    /// this identity, in-flight requests included.
    pub async fn create_walk(
        &self,
        auth: &AuthContext,
        origin: LatLng,
        start_text: &str,
        dest_text: &str,
    ) -> Result<(), ClientError> {
        let state = self.state();
        if state.is_loading || state.phase() != WalkPhase::Empty {
            return Err(ClientError::AlreadyRequested);
        }
        self.set_loading(true);

        let req = WalkRequest {
            time: current_timestamp(),
            start_lat: origin.lat,
            start_lng: origin.lng,
            start_text: start_text.to_string(),
            dest_text: dest_text.to_string(),
            user_socket_id: self.own_socket(),
        };
        let walk = match self.inner.backend.create_walk(auth, &req).await {
            Ok(walk) => walk,
            Err(err) => {
                // A failed create leaves nothing behind.
                self.publish(WalkState::default());
                return Err(ClientError::Server(err));
            }
        };

        let stored = StoredWalk {
            walk_id: walk.id.clone(),
            active: false,
            start: Some(origin),
            destination: walk.destination(),
            user_email: Some(auth.email.clone()),
            walker_email: None,
            user_socket_id: req.user_socket_id.clone(),
            walker_socket_id: None,
        };
        self.inner.store.save_walk(&stored).await;
        self.publish(WalkState {
            walk_id: Some(walk.id.clone()),
            start: Some(origin),
            destination: stored.destination,
            own_socket_id: stored.user_socket_id.clone(),
            ..WalkState::default()
        });

        // Tell Safewalkers a request is available.
        self.emit(Event::WalkStatus(true));
        self.arm_timer(auth.clone(), walk.id);
        Ok(())
    }

    /// Claim a listed request (Safewalker). The status is re-read
    /// immediately before the write; the server remains the authority when
    /// two Safewalkers race, and the loser surfaces
    /// [`ClientError::Unavailable`] without touching its own state.
    pub async fn accept_walk(&self, auth: &AuthContext, walk: &Walk) -> Result<(), ClientError> {
        let state = self.state();
        if state.is_loading || state.phase() != WalkPhase::Empty {
            return Err(ClientError::AlreadyRequested);
        }
        self.set_loading(true);

        let status = match self.inner.backend.walk_status(auth, &walk.id).await {
            Ok(status) => status,
            Err(ApiError::NotFound) => return self.fail(ClientError::Unavailable),
            Err(err) => return self.fail(ClientError::Server(err)),
        };
        if status != WalkStatus::Requested {
            return self.fail(ClientError::Unavailable);
        }

        let update = WalkUpdate {
            status: WalkStatus::Accepted,
            walker_socket_id: self.own_socket(),
        };
        if let Err(err) = self.inner.backend.update_walk(auth, &walk.id, &update).await {
            let mapped = match err {
                ApiError::NotFound | ApiError::Conflict => ClientError::Unavailable,
                other => ClientError::Server(other),
            };
            return self.fail(mapped);
        }

        let stored = StoredWalk {
            walk_id: walk.id.clone(),
            active: true,
            start: Some(walk.start()),
            destination: walk.destination(),
            user_email: Some(walk.user_email.clone()),
            walker_email: Some(auth.email.clone()),
            user_socket_id: walk.user_socket_id.clone(),
            walker_socket_id: update.walker_socket_id.clone(),
        };
        self.inner.store.save_walk(&stored).await;
        self.publish(WalkState {
            active: true,
            walk_id: Some(walk.id.clone()),
            start: stored.start,
            destination: stored.destination,
            counterpart_email: Some(walk.user_email.clone()),
            own_socket_id: stored.walker_socket_id.clone(),
            counterpart_socket_id: stored.user_socket_id.clone(),
            ..WalkState::default()
        });

        self.emit(Event::WalkerWalkStatus {
            user_id: walk.user_socket_id.clone().unwrap_or_default(),
            status: StatusSignal::Accept,
        });
        Ok(())
    }

    /// Turn down a listed request (Safewalker). Deleting an already-deleted
    /// walk is success; the denier never owned the walk locally, so its own
    /// state is untouched.
    pub async fn deny_walk(
        &self,
        auth: &AuthContext,
        walk_id: &str,
        user_socket_id: &str,
    ) -> Result<(), ClientError> {
        self.inner
            .backend
            .delete_walk(auth, walk_id)
            .await
            .map_err(ClientError::server)?;
        self.emit(Event::WalkerWalkStatus {
            user_id: user_socket_id.to_string(),
            status: StatusSignal::Deny,
        });
        Ok(())
    }

    /// Cancel the current walk, pending or active, from either party.
    pub async fn cancel_walk(&self, auth: &AuthContext) -> Result<(), ClientError> {
        self.end_walk(auth, WalkEnd::Canceled { by: auth.user_type })
            .await
    }

    /// Auto-cancel an unanswered request. Runs the cancel path with the
    /// timed-out reason, but only if this exact walk is still pending —
    /// an accept or explicit cancel that raced ahead wins.
    pub async fn timeout_pending_request(
        &self,
        auth: &AuthContext,
        walk_id: &str,
    ) -> Result<(), ClientError> {
        let state = self.state();
        if state.active || state.walk_id.as_deref() != Some(walk_id) {
            return Ok(());
        }
        tracing::info!(walk_id, "pending walk timed out");
        self.end_walk(auth, WalkEnd::TimedOut).await
    }

    /// Mark the active walk finished (Safewalker).
    pub async fn complete_walk(&self, auth: &AuthContext) -> Result<(), ClientError> {
        let state = self.state();
        let Some(walk_id) = state.walk_id.clone() else {
            return Ok(());
        };
        let update = WalkUpdate {
            status: WalkStatus::Completed,
            walker_socket_id: state.own_socket_id.clone(),
        };
        self.inner
            .backend
            .update_walk(auth, &walk_id, &update)
            .await
            .map_err(ClientError::server)?;
        self.emit(Event::WalkerWalkStatus {
            user_id: state.counterpart_socket_id.clone().unwrap_or_default(),
            status: StatusSignal::Complete,
        });
        self.evict_with(Some(WalkEnd::Completed)).await;
        Ok(())
    }

    /// Fold a counterpart-pushed transition into the local state.
    pub async fn handle_event(&self, auth: &AuthContext, event: &Event) {
        match event {
            Event::SocketId(id) => {
                *self.inner.own_socket.lock().unwrap() = Some(id.clone());
            }
            // Received by the User: the Safewalker moved the walk.
            Event::WalkerWalkStatus { status, .. } => match status {
                StatusSignal::Accept => self.on_accepted(auth).await,
                StatusSignal::Deny => self.end_locally(WalkEnd::Denied).await,
                StatusSignal::Cancel => {
                    self.end_locally(WalkEnd::Canceled {
                        by: UserType::Safewalker,
                    })
                    .await;
                }
                StatusSignal::Complete => self.end_locally(WalkEnd::Completed).await,
            },
            // Received by the Safewalker: only cancellation travels this way.
            Event::UserWalkStatus { status, .. } => {
                if *status == StatusSignal::Cancel {
                    self.end_locally(WalkEnd::Canceled { by: UserType::User })
                        .await;
                }
            }
            Event::WalkerLocation(location) => {
                if self.state().walk_id.is_some() {
                    self.inner
                        .state
                        .send_modify(|s| s.walker_location = Some(*location));
                }
            }
            Event::ConnectionLost(_) => self.connection_lost(auth).await,
            // Availability broadcasts drive the Safewalker's pending queue,
            // not this state.
            Event::WalkStatus(_) => {}
        }
    }

    /// Boot-time reconciliation of the persisted flag against server truth.
    /// Returns whether an active walk survived. Any inconsistency resolves
    /// silently to "inactive" — it is never surfaced as an error.
    pub async fn reconcile(&self, auth: &AuthContext) -> bool {
        let Some(stored) = self.inner.store.load_walk().await else {
            // Defensive reset: clears any partial keys from a mid-write kill.
            self.evict_with(None).await;
            return false;
        };
        if !stored.active {
            self.evict_with(None).await;
            return false;
        }
        match self.inner.backend.walk_status(auth, &stored.walk_id).await {
            Ok(WalkStatus::Accepted) => {
                let (counterpart_email, own_socket, counterpart_socket) = match auth.user_type {
                    UserType::User => (
                        stored.walker_email.clone(),
                        stored.user_socket_id.clone(),
                        stored.walker_socket_id.clone(),
                    ),
                    UserType::Safewalker => (
                        stored.user_email.clone(),
                        stored.walker_socket_id.clone(),
                        stored.user_socket_id.clone(),
                    ),
                };
                self.publish(WalkState {
                    active: true,
                    walk_id: Some(stored.walk_id.clone()),
                    start: stored.start,
                    destination: stored.destination,
                    counterpart_email,
                    own_socket_id: own_socket,
                    counterpart_socket_id: counterpart_socket,
                    ..WalkState::default()
                });
                true
            }
            Ok(WalkStatus::Completed) => {
                self.evict_with(Some(WalkEnd::Completed)).await;
                false
            }
            Ok(WalkStatus::Requested) => {
                // The persisted flag ran ahead of the server.
                self.evict_with(None).await;
                false
            }
            Err(err) => {
                tracing::info!(%err, walk_id = %stored.walk_id, "persisted walk is gone on the server");
                self.evict_with(None).await;
                false
            }
        }
    }

    /// Drop the walk entirely: persisted keys and reactive state. Used by
    /// sign-out and defensive resets.
    pub async fn evict(&self) {
        self.disarm_timer();
        self.evict_with(None).await;
    }

    async fn on_accepted(&self, auth: &AuthContext) {
        let state = self.state();
        let Some(walk_id) = state.walk_id.clone() else {
            return;
        };
        if state.active {
            return;
        }
        self.disarm_timer();

        // Best-effort detail fetch for the walker's identity; the walk goes
        // active either way and reconciliation can fill gaps later.
        let walk = match self.inner.backend.get_walk(auth, &walk_id).await {
            Ok(walk) => Some(walk),
            Err(err) => {
                tracing::warn!(%err, "accepted walk detail fetch failed");
                None
            }
        };
        let stored = StoredWalk {
            walk_id: walk_id.clone(),
            active: true,
            start: state.start,
            destination: walk
                .as_ref()
                .and_then(|w| w.destination())
                .or(state.destination),
            user_email: Some(auth.email.clone()),
            walker_email: walk.as_ref().and_then(|w| w.walker_email.clone()),
            user_socket_id: state.own_socket_id.clone(),
            walker_socket_id: walk.as_ref().and_then(|w| w.walker_socket_id.clone()),
        };
        self.inner.store.save_walk(&stored).await;
        self.publish(WalkState {
            active: true,
            walk_id: Some(walk_id),
            start: stored.start,
            destination: stored.destination,
            counterpart_email: stored.walker_email.clone(),
            own_socket_id: stored.user_socket_id.clone(),
            counterpart_socket_id: stored.walker_socket_id.clone(),
            ..WalkState::default()
        });
    }

    /// Counterpart-driven end: the server record is already gone or final,
    /// so only the local side is torn down. Stray signals with no walk in
    /// progress are ignored.
    async fn end_locally(&self, end: WalkEnd) {
        if self.state().walk_id.is_none() {
            return;
        }
        self.disarm_timer();
        self.evict_with(Some(end)).await;
    }

    async fn connection_lost(&self, auth: &AuthContext) {
        let state = self.state();
        let Some(walk_id) = state.walk_id.clone() else {
            return;
        };
        tracing::warn!(%walk_id, "counterpart connection lost, canceling walk");
        self.disarm_timer();
        if let Err(err) = self.inner.backend.delete_walk(auth, &walk_id).await {
            tracing::debug!(%err, "cleanup delete failed");
        }
        self.evict_with(Some(WalkEnd::Canceled {
            by: auth.user_type.counterpart(),
        }))
        .await;
    }

    async fn end_walk(&self, auth: &AuthContext, end: WalkEnd) -> Result<(), ClientError> {
        let state = self.state();
        let Some(walk_id) = state.walk_id.clone() else {
            return Ok(());
        };
        self.disarm_timer();
        self.inner
            .backend
            .delete_walk(auth, &walk_id)
            .await
            .map_err(ClientError::server)?;

        // Exactly one counterpart notification per ended walk.
        if state.active {
            let counterpart = state.counterpart_socket_id.clone().unwrap_or_default();
            match auth.user_type {
                UserType::User => self.emit(Event::UserWalkStatus {
                    walker_id: counterpart,
                    status: StatusSignal::Cancel,
                }),
                UserType::Safewalker => self.emit(Event::WalkerWalkStatus {
                    user_id: counterpart,
                    status: StatusSignal::Cancel,
                }),
            }
        } else {
            // No counterpart yet: withdraw the availability broadcast.
            self.emit(Event::WalkStatus(false));
        }

        self.evict_with(Some(end)).await;
        Ok(())
    }

    async fn evict_with(&self, end: Option<WalkEnd>) {
        self.inner.store.clear_walk().await;
        self.publish(WalkState {
            last_end: end,
            ..WalkState::default()
        });
    }

    fn arm_timer(&self, auth: AuthContext, walk_id: String) {
        let this = self.clone();
        let timeout = self.inner.pending_timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            // Release our own handle before running the cancel path, so
            // disarming inside it does not abort this task mid-flight.
            this.inner.timer.lock().unwrap().take();
            if let Err(err) = this.timeout_pending_request(&auth, &walk_id).await {
                tracing::warn!(%err, "pending walk timeout cleanup failed");
            }
        });
        if let Some(previous) = self.inner.timer.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }

    fn disarm_timer(&self) {
        if let Some(handle) = self.inner.timer.lock().unwrap().take() {
            handle.abort();
        }
    }

    fn own_socket(&self) -> Option<String> {
        self.inner.own_socket.lock().unwrap().clone()
    }

    fn emit(&self, event: Event) {
        if let Some(sender) = self.inner.events.lock().unwrap().as_ref() {
            sender.emit(event);
        }
    }

    fn set_loading(&self, loading: bool) {
        self.inner.state.send_modify(|s| s.is_loading = loading);
    }

    fn fail<T>(&self, err: ClientError) -> Result<T, ClientError> {
        self.set_loading(false);
        Err(err)
    }

    fn publish(&self, state: WalkState) {
        self.inner.state.send_replace(state);
    }
}

fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
