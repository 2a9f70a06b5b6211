//! # API crate — REST surface of the external SAFEwalk backend
//!
//! This crate owns everything that crosses the HTTP boundary: the typed
//! request/response models, the error taxonomy for non-success responses,
//! and [`ApiClient`], the `reqwest`-based client the coordinators call.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`client`] | `ApiClient` — one method per backend route, custom auth headers |
//! | [`error`] | [`ApiError`] — not-found/conflict/other-status/network taxonomy |
//! | [`models`] | Walk, walk status, profile, and login/registration bodies |
//!
//! ## Auth convention
//!
//! The backend does not use a bearer scheme. Authenticated requests carry
//! three custom headers — `token`, `email`, `isUser` — captured here as
//! [`AuthContext`]. `isUser` is a direct mapping from the account's
//! [`UserType`](store::UserType): `"true"` for users, `"false"` for
//! Safewalkers.

pub mod client;
pub mod error;
pub mod models;

pub use client::{ApiClient, AuthContext};
pub use error::ApiError;
pub use models::{
    LoginResponse, Profile, RegisterRequest, Walk, WalkRequest, WalkStatus, WalkUpdate,
};

pub use store::{LatLng, UserType};
