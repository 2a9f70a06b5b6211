//! # Domain primitives shared across the workspace
//!
//! Defines the types that cross the storage, REST, and coordination layers:
//!
//! | Type | Represents |
//! |------|-----------|
//! | [`UserType`] | Which side of an escort a signed-in account is on. Exactly two variants; anything else read from storage or the wire is an error state the caller must handle explicitly. |
//! | [`LatLng`] | A WGS84 coordinate pair. |
//! | [`StoredIdentity`] | The persisted identity snapshot read back at boot. |
//! | [`StoredWalk`] | The persisted walk snapshot read back at boot. |
//!
//! `UserType` round-trips through the lowercase strings `"user"` /
//! `"safewalker"`, the encoding shared with the deployed apps and the
//! backend's `isUser` header convention.

use serde::{Deserialize, Serialize};

/// Which side of an escort an account is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// The party requesting a walking escort.
    User,
    /// The party providing the walking escort.
    Safewalker,
}

impl UserType {
    /// The storage/wire encoding of this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::User => "user",
            UserType::Safewalker => "safewalker",
        }
    }

    /// Parse the storage/wire encoding. Unrecognized strings are `None`,
    /// never coerced to a default: the caller decides how to surface them.
    pub fn parse(s: &str) -> Option<UserType> {
        match s {
            "user" => Some(UserType::User),
            "safewalker" => Some(UserType::Safewalker),
            _ => None,
        }
    }

    /// The other party of an escort.
    pub fn counterpart(&self) -> UserType {
        match self {
            UserType::User => UserType::Safewalker,
            UserType::Safewalker => UserType::User,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, UserType::User)
    }
}

/// A WGS84 coordinate pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Identity snapshot read back from storage at boot.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredIdentity {
    pub token: String,
    /// `None` when the persisted string is not a recognized variant —
    /// surfaced so boot can route to the role-error branch instead of
    /// guessing.
    pub user_type: Option<UserType>,
    pub email: String,
}

/// Walk snapshot read back from storage at boot.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredWalk {
    pub walk_id: String,
    /// A real boolean in the data model; the string encoding of the
    /// deployed apps is confined to the storage layer.
    pub active: bool,
    pub start: Option<LatLng>,
    pub destination: Option<LatLng>,
    pub user_email: Option<String>,
    pub walker_email: Option<String>,
    pub user_socket_id: Option<String>,
    pub walker_socket_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_type_round_trip() {
        assert_eq!(UserType::parse("user"), Some(UserType::User));
        assert_eq!(UserType::parse("safewalker"), Some(UserType::Safewalker));
        assert_eq!(UserType::parse(UserType::User.as_str()), Some(UserType::User));
    }

    #[test]
    fn test_user_type_rejects_unknown() {
        assert_eq!(UserType::parse("admin"), None);
        assert_eq!(UserType::parse("User"), None);
        assert_eq!(UserType::parse(""), None);
    }

    #[test]
    fn test_counterpart() {
        assert_eq!(UserType::User.counterpart(), UserType::Safewalker);
        assert_eq!(UserType::Safewalker.counterpart(), UserType::User);
    }
}
