//! Request and response bodies for the backend routes. All wire names are
//! camelCase to match the deployed API.

mod user;
mod walk;

pub use user::{LoginResponse, Profile, RegisterRequest};
pub use walk::{Walk, WalkRequest, WalkStatus, WalkUpdate};
