//! Account and profile bodies for the login and profile routes.

use serde::{Deserialize, Serialize};
use store::UserType;

/// Profile fields stored under `/api/Users/{email}` or
/// `/api/Safewalkers/{email}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl Profile {
    /// Display name for greetings and counterpart labels.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Body for `POST /api/Login` (account creation).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub is_user: bool,
}

impl RegisterRequest {
    pub fn user_type(&self) -> UserType {
        if self.is_user {
            UserType::User
        } else {
            UserType::Safewalker
        }
    }

    pub fn profile(&self) -> Profile {
        Profile {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: self.phone_number.clone(),
        }
    }
}

/// Body returned by `GET /api/Login` on success.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}
