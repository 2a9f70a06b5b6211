pub mod keys;
pub mod models;
pub mod session;

mod file_store;
mod memory;

pub use file_store::FileStore;
pub use memory::MemoryStore;

pub use models::{LatLng, StoredIdentity, StoredWalk, UserType};
pub use session::{KeyValueStore, SessionStore};
