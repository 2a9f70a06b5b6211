//! # Client crate — walk lifecycle coordination for SAFEwalk
//!
//! The headless core the presentation layer is built on. Two coordinators
//! each own one piece of reactive state and expose subscribe/dispatch; a
//! realtime channel pushes counterpart transitions; a boot sequencer
//! reconciles persisted state against the server once per cold start.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`session`] | [`AuthCoordinator`] — restore, login, logout, registration |
//! | [`walk`] | [`WalkCoordinator`] — the walk state machine |
//! | [`realtime`] | [`RealtimeChannel`] — the per-session push connection |
//! | [`boot`] | Cold-start restore, reconciliation, initial route |
//! | [`backend`] | The REST seam the coordinators call through |
//! | [`config`] | `safewalk.toml` |
//! | [`error`] | [`ClientError`] — the surfaced failure conditions |
//!
//! ## Wiring
//!
//! ```no_run
//! # async fn run() -> Result<(), client::ClientError> {
//! use std::path::Path;
//!
//! let config = client::SafewalkConfig::load(Path::new("safewalk.toml"));
//! let store = store::SessionStore::new(store::FileStore::in_data_dir());
//! let backend = api::ApiClient::new(config.server.base_url.clone());
//!
//! let booted = client::boot::boot(&config, backend, store).await;
//! // ...after login:
//! let channel = client::RealtimeChannel::connect(&config.server.socket_url).await?;
//! booted.walk.attach_channel(&channel);
//! let pump = client::boot::spawn_event_pump(
//!     channel.subscribe(),
//!     booted.walk.clone(),
//!     booted.auth.subscribe(),
//! );
//! # Ok(()) }
//! ```

pub mod backend;
pub mod boot;
pub mod config;
pub mod error;
pub mod realtime;
pub mod session;
pub mod walk;

#[cfg(test)]
mod testing;

pub use backend::Backend;
pub use boot::{Boot, InitialRoute};
pub use config::SafewalkConfig;
pub use error::ClientError;
pub use realtime::{Event, EventSender, RealtimeChannel, StatusSignal, Subscription};
pub use session::{AuthCoordinator, Session};
pub use walk::{WalkCoordinator, WalkEnd, WalkPhase, WalkState};
