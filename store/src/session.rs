//! # SessionStore — typed snapshots over an abstract key-value store
//!
//! This module is the durable mirror of the client's session. [`SessionStore`]
//! provides typed identity and walk accessors without caring where the bytes
//! live. All reads and writes go through the [`KeyValueStore`] trait, so the
//! same logic works against an in-memory store (tests, ephemeral fallback) or
//! a file-per-key store (device persistence across restarts).
//!
//! ## [`KeyValueStore`] trait
//!
//! An async interface with three methods — `get`/`put` for string values under
//! string keys, and `remove`. Implementations live in sibling modules
//! ([`crate::memory`], [`crate::file_store`]). A backend read failure is
//! indistinguishable from an absent key: both are `None`, and the caller
//! treats either as "nothing persisted."
//!
//! ## Identity snapshot
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`load_identity`](SessionStore::load_identity) | Reads `userToken`/`userType`/`email`. No token means no identity. An unrecognized user type loads as `None` so the caller can route to an explicit error branch. |
//! | [`save_identity`](SessionStore::save_identity) | Writes all three identity keys. |
//! | [`clear_identity`](SessionStore::clear_identity) | Removes all three identity keys. |
//!
//! ## Walk snapshot
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`load_walk`](SessionStore::load_walk) | Reads the walk keys. A missing id or active flag means no walk; partially-written companion fields load as `None` rather than failing. |
//! | [`save_walk`](SessionStore::save_walk) | Writes the full walk snapshot, active flag included. |
//! | [`clear_walk`](SessionStore::clear_walk) | Removes every walk key. |
//!
//! The store is a mirror, not an owner: coordinators write through here
//! before (or together with) publishing the matching in-memory state, so a
//! process kill between the two can only lose the in-memory update. There is
//! no multi-key transaction; a kill mid-sequence can leave partial companion
//! fields, which boot reconciliation treats as "walk inactive."

use crate::keys;
use crate::models::{LatLng, StoredIdentity, StoredWalk, UserType};

/// Async trait for string-keyed on-device storage.
pub trait KeyValueStore {
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Option<String>> + Send;
    fn put(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = ()> + Send;
    fn remove(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = ()> + Send;
}

/// Typed session mirror backed by a KeyValueStore.
#[derive(Clone, Debug)]
pub struct SessionStore<S: KeyValueStore> {
    backend: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Read the persisted identity. `None` when no token is stored.
    pub async fn load_identity(&self) -> Option<StoredIdentity> {
        let token = self.backend.get(keys::USER_TOKEN).await?;
        let user_type = self
            .backend
            .get(keys::USER_TYPE)
            .await
            .and_then(|s| UserType::parse(&s));
        let email = self.backend.get(keys::EMAIL).await.unwrap_or_default();
        Some(StoredIdentity {
            token,
            user_type,
            email,
        })
    }

    pub async fn save_identity(&self, token: &str, user_type: UserType, email: &str) {
        self.backend.put(keys::USER_TOKEN, token).await;
        self.backend.put(keys::USER_TYPE, user_type.as_str()).await;
        self.backend.put(keys::EMAIL, email).await;
    }

    pub async fn clear_identity(&self) {
        for key in keys::IDENTITY_KEYS {
            self.backend.remove(key).await;
        }
    }

    /// Read the persisted walk. `None` when no id or active flag is stored.
    pub async fn load_walk(&self) -> Option<StoredWalk> {
        let walk_id = self.backend.get(keys::WALK_ID).await?;
        let active = self.backend.get(keys::IS_WALK_ACTIVE).await?;
        Some(StoredWalk {
            walk_id,
            active: active == "true",
            start: self.load_coords(keys::START_LAT, keys::START_LNG).await,
            destination: self.load_coords(keys::DEST_LAT, keys::DEST_LNG).await,
            user_email: self.backend.get(keys::USER_EMAIL).await,
            walker_email: self.backend.get(keys::WALKER_EMAIL).await,
            user_socket_id: self.backend.get(keys::USER_SOCKET_ID).await,
            walker_socket_id: self.backend.get(keys::WALKER_SOCKET_ID).await,
        })
    }

    pub async fn save_walk(&self, walk: &StoredWalk) {
        self.backend.put(keys::WALK_ID, &walk.walk_id).await;
        // The flag is stringified only here; everywhere else it is a bool.
        let active = if walk.active { "true" } else { "false" };
        self.backend.put(keys::IS_WALK_ACTIVE, active).await;
        self.save_coords(keys::START_LAT, keys::START_LNG, walk.start)
            .await;
        self.save_coords(keys::DEST_LAT, keys::DEST_LNG, walk.destination)
            .await;
        self.save_opt(keys::USER_EMAIL, &walk.user_email).await;
        self.save_opt(keys::WALKER_EMAIL, &walk.walker_email).await;
        self.save_opt(keys::USER_SOCKET_ID, &walk.user_socket_id)
            .await;
        self.save_opt(keys::WALKER_SOCKET_ID, &walk.walker_socket_id)
            .await;
    }

    pub async fn clear_walk(&self) {
        for key in keys::WALK_KEYS {
            self.backend.remove(key).await;
        }
    }

    /// True when any walk key is still present. Used by tests and defensive
    /// resets.
    pub async fn has_walk_keys(&self) -> bool {
        for key in keys::WALK_KEYS {
            if self.backend.get(key).await.is_some() {
                return true;
            }
        }
        false
    }

    async fn load_coords(&self, lat_key: &str, lng_key: &str) -> Option<LatLng> {
        let lat = self.backend.get(lat_key).await?.parse().ok()?;
        let lng = self.backend.get(lng_key).await?.parse().ok()?;
        Some(LatLng { lat, lng })
    }

    async fn save_coords(&self, lat_key: &str, lng_key: &str, coords: Option<LatLng>) {
        if let Some(c) = coords {
            self.backend.put(lat_key, &c.lat.to_string()).await;
            self.backend.put(lng_key, &c.lng.to_string()).await;
        } else {
            self.backend.remove(lat_key).await;
            self.backend.remove(lng_key).await;
        }
    }

    async fn save_opt(&self, key: &str, value: &Option<String>) {
        match value {
            Some(v) => self.backend.put(key, v).await,
            None => self.backend.remove(key).await,
        }
    }
}
