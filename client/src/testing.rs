//! In-memory backend fake for coordinator tests. Behaves like a miniature
//! server: walks live in a map, statuses move on update, deletes are
//! idempotent — so tests exercise the same sequences the real backend sees.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api::{
    ApiError, AuthContext, LoginResponse, RegisterRequest, Walk, WalkRequest, WalkStatus,
    WalkUpdate,
};
use store::UserType;
use tokio::sync::mpsc;

use crate::backend::Backend;
use crate::realtime::{Event, EventSender};

pub(crate) fn user_auth() -> AuthContext {
    AuthContext {
        token: "token-user".to_string(),
        email: "user@wisc.edu".to_string(),
        user_type: UserType::User,
    }
}

pub(crate) fn walker_auth() -> AuthContext {
    AuthContext {
        token: "token-walker".to_string(),
        email: "walker@wisc.edu".to_string(),
        user_type: UserType::Safewalker,
    }
}

pub(crate) fn register_fixture() -> RegisterRequest {
    RegisterRequest {
        email: "user@wisc.edu".to_string(),
        password: "hunter22".to_string(),
        first_name: "Alex".to_string(),
        last_name: "Badger".to_string(),
        phone_number: "608-555-0142".to_string(),
        is_user: true,
    }
}

/// A detached outbound-event queue for asserting notifications.
pub(crate) fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender::new(tx), rx)
}

#[derive(Default)]
struct FakeState {
    accounts: Mutex<HashMap<String, (String, UserType)>>,
    walks: Mutex<HashMap<String, Walk>>,
    fail_login: Mutex<Option<u16>>,
    fail_create: Mutex<Option<u16>>,
    create_delay: Mutex<Option<Duration>>,
    next_id: AtomicU32,
    create_calls: AtomicU32,
    delete_calls: AtomicU32,
    get_calls: AtomicU32,
    status_calls: AtomicU32,
}

#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    state: Arc<FakeState>,
}

impl FakeBackend {
    pub fn add_account(&self, email: &str, password: &str, user_type: UserType) {
        self.state
            .accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), user_type));
    }

    /// Seed a requested walk, as if a user had posted it, and return the
    /// record a Safewalker would see in the listing.
    pub fn insert_requested_walk(
        &self,
        id: &str,
        user_email: &str,
        user_socket_id: Option<&str>,
    ) -> Walk {
        let walk = Walk {
            id: id.to_string(),
            time: 1_700_000_000,
            start_lat: 43.0757,
            start_lng: -89.4040,
            start_text: "Memorial Union".to_string(),
            dest_text: "College Library".to_string(),
            dest_lat: None,
            dest_lng: None,
            user_email: user_email.to_string(),
            walker_email: None,
            user_socket_id: user_socket_id.map(|s| s.to_string()),
            walker_socket_id: None,
            status: WalkStatus::Requested,
        };
        self.state
            .walks
            .lock()
            .unwrap()
            .insert(id.to_string(), walk.clone());
        walk
    }

    pub fn walk(&self, id: &str) -> Option<Walk> {
        self.state.walks.lock().unwrap().get(id).cloned()
    }

    pub fn remove_walk(&self, id: &str) {
        self.state.walks.lock().unwrap().remove(id);
    }

    pub fn set_walk_status(&self, id: &str, status: WalkStatus) {
        if let Some(walk) = self.state.walks.lock().unwrap().get_mut(id) {
            walk.status = status;
        }
    }

    pub fn set_walk_walker(&self, id: &str, walker_email: &str, walker_socket_id: &str) {
        if let Some(walk) = self.state.walks.lock().unwrap().get_mut(id) {
            walk.walker_email = Some(walker_email.to_string());
            walk.walker_socket_id = Some(walker_socket_id.to_string());
        }
    }

    pub fn fail_next_login(&self, status: u16) {
        *self.state.fail_login.lock().unwrap() = Some(status);
    }

    pub fn fail_next_create(&self, status: u16) {
        *self.state.fail_create.lock().unwrap() = Some(status);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.state.create_delay.lock().unwrap() = Some(delay);
    }

    pub fn create_calls(&self) -> u32 {
        self.state.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u32 {
        self.state.delete_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> u32 {
        self.state.get_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.state.status_calls.load(Ordering::SeqCst)
    }

    fn take_failure(slot: &Mutex<Option<u16>>) -> Option<ApiError> {
        slot.lock().unwrap().take().and_then(ApiError::from_status)
    }
}

impl Backend for FakeBackend {
    async fn login(
        &self,
        user_type: UserType,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        if let Some(err) = Self::take_failure(&self.state.fail_login) {
            return Err(err);
        }
        let accounts = self.state.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((stored, stored_type)) if stored == password && *stored_type == user_type => {
                Ok(LoginResponse {
                    token: format!("token-{email}"),
                })
            }
            _ => Err(ApiError::NotFound),
        }
    }

    async fn register(&self, req: &RegisterRequest) -> Result<(), ApiError> {
        let mut accounts = self.state.accounts.lock().unwrap();
        if accounts.contains_key(&req.email) {
            return Err(ApiError::Conflict);
        }
        accounts.insert(
            req.email.clone(),
            (req.password.clone(), req.user_type()),
        );
        Ok(())
    }

    async fn user_exists(&self, email: &str) -> Result<bool, ApiError> {
        Ok(self.state.accounts.lock().unwrap().contains_key(email))
    }

    async fn create_walk(&self, auth: &AuthContext, req: &WalkRequest) -> Result<Walk, ApiError> {
        self.state.create_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = Self::take_failure(&self.state.fail_create) {
            return Err(err);
        }
        let id = (self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        let walk = Walk {
            id: id.clone(),
            time: req.time,
            start_lat: req.start_lat,
            start_lng: req.start_lng,
            start_text: req.start_text.clone(),
            dest_text: req.dest_text.clone(),
            dest_lat: None,
            dest_lng: None,
            user_email: auth.email.clone(),
            walker_email: None,
            user_socket_id: req.user_socket_id.clone(),
            walker_socket_id: None,
            status: WalkStatus::Requested,
        };
        self.state.walks.lock().unwrap().insert(id, walk.clone());
        Ok(walk)
    }

    async fn get_walk(&self, _auth: &AuthContext, id: &str) -> Result<Walk, ApiError> {
        self.state.get_calls.fetch_add(1, Ordering::SeqCst);
        self.walk(id).ok_or(ApiError::NotFound)
    }

    async fn walk_status(&self, _auth: &AuthContext, id: &str) -> Result<WalkStatus, ApiError> {
        self.state.status_calls.fetch_add(1, Ordering::SeqCst);
        self.walk(id).map(|w| w.status).ok_or(ApiError::NotFound)
    }

    async fn update_walk(
        &self,
        _auth: &AuthContext,
        id: &str,
        update: &WalkUpdate,
    ) -> Result<(), ApiError> {
        let mut walks = self.state.walks.lock().unwrap();
        let Some(walk) = walks.get_mut(id) else {
            return Err(ApiError::NotFound);
        };
        walk.status = update.status;
        if update.walker_socket_id.is_some() {
            walk.walker_socket_id = update.walker_socket_id.clone();
        }
        Ok(())
    }

    async fn delete_walk(&self, _auth: &AuthContext, id: &str) -> Result<(), ApiError> {
        self.state.delete_calls.fetch_add(1, Ordering::SeqCst);
        // Idempotent, like the real route wrapper.
        self.state.walks.lock().unwrap().remove(id);
        Ok(())
    }
}
