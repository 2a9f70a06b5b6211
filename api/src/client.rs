//! # ApiClient — one method per backend route
//!
//! A thin typed layer over `reqwest`. Every method issues a single request,
//! maps non-success statuses through [`ApiError::from_status`], and decodes
//! the JSON body. There is no retry or backoff anywhere in the client; the
//! caller decides how failures surface.
//!
//! ## Routes
//!
//! | Method | Route |
//! |--------|-------|
//! | [`login`](ApiClient::login) | `GET /api/Login` (credential headers) |
//! | [`register`](ApiClient::register) | `POST /api/Login` |
//! | [`user_exists`](ApiClient::user_exists) | `GET /api/Login/{email}` |
//! | [`get_profile`](ApiClient::get_profile) / [`create_profile`](ApiClient::create_profile) / [`update_profile`](ApiClient::update_profile) | `GET/POST/PUT /api/Users/{email}` or `/api/Safewalkers/{email}` |
//! | [`create_walk`](ApiClient::create_walk) / [`list_walks`](ApiClient::list_walks) / [`get_walk`](ApiClient::get_walk) | `POST/GET /api/Walks`, `GET /api/Walks/{id}` |
//! | [`walk_status`](ApiClient::walk_status) | `GET /api/Walks/{id}/status` |
//! | [`update_walk`](ApiClient::update_walk) / [`delete_walk`](ApiClient::delete_walk) | `PUT/DELETE /api/Walks/{id}` |

use store::UserType;

use crate::error::ApiError;
use crate::models::{
    LoginResponse, Profile, RegisterRequest, Walk, WalkRequest, WalkStatus, WalkUpdate,
};

/// Identity attached to authenticated requests as the `token`/`email`/
/// `isUser` headers.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthContext {
    pub token: String,
    pub email: String,
    pub user_type: UserType,
}

impl AuthContext {
    /// Header value for `isUser`. A direct mapping, on purpose: the account
    /// type is a two-variant enum and each variant gets an explicit arm.
    pub fn is_user_header(&self) -> &'static str {
        match self.user_type {
            UserType::User => "true",
            UserType::Safewalker => "false",
        }
    }
}

/// REST client for the SAFEwalk backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn profile_path(user_type: UserType, email: &str) -> String {
        match user_type {
            UserType::User => format!("/api/Users/{email}"),
            UserType::Safewalker => format!("/api/Safewalkers/{email}"),
        }
    }

    fn authed(
        &self,
        builder: reqwest::RequestBuilder,
        auth: &AuthContext,
    ) -> reqwest::RequestBuilder {
        builder
            .header("token", &auth.token)
            .header("email", &auth.email)
            .header("isUser", auth.is_user_header())
    }

    /// Trade credentials for a token. The backend reports unknown
    /// credentials as 404, which maps to [`ApiError::NotFound`].
    pub async fn login(
        &self,
        user_type: UserType,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let is_user = match user_type {
            UserType::User => "true",
            UserType::Safewalker => "false",
        };
        let resp = self
            .http
            .get(self.url("/api/Login"))
            .header("email", email)
            .header("password", password)
            .header("isUser", is_user)
            .send()
            .await?;
        Ok(check(resp)?.json().await?)
    }

    /// Create an account.
    pub async fn register(&self, req: &RegisterRequest) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url("/api/Login"))
            .json(req)
            .send()
            .await?;
        check(resp)?;
        Ok(())
    }

    /// Probe whether an account exists for this email.
    pub async fn user_exists(&self, email: &str) -> Result<bool, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/Login/{email}")))
            .send()
            .await?;
        match check(resp) {
            Ok(_) => Ok(true),
            Err(ApiError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub async fn get_profile(
        &self,
        auth: &AuthContext,
        user_type: UserType,
        email: &str,
    ) -> Result<Profile, ApiError> {
        let url = self.url(&Self::profile_path(user_type, email));
        let resp = self.authed(self.http.get(url), auth).send().await?;
        Ok(check(resp)?.json().await?)
    }

    pub async fn create_profile(
        &self,
        auth: &AuthContext,
        user_type: UserType,
        profile: &Profile,
    ) -> Result<(), ApiError> {
        let url = self.url(&Self::profile_path(user_type, &profile.email));
        let resp = self
            .authed(self.http.post(url), auth)
            .json(profile)
            .send()
            .await?;
        check(resp)?;
        Ok(())
    }

    pub async fn update_profile(
        &self,
        auth: &AuthContext,
        user_type: UserType,
        profile: &Profile,
    ) -> Result<(), ApiError> {
        let url = self.url(&Self::profile_path(user_type, &profile.email));
        let resp = self
            .authed(self.http.put(url), auth)
            .json(profile)
            .send()
            .await?;
        check(resp)?;
        Ok(())
    }

    /// Create a walk request. The server assigns the id.
    pub async fn create_walk(
        &self,
        auth: &AuthContext,
        req: &WalkRequest,
    ) -> Result<Walk, ApiError> {
        let resp = self
            .authed(self.http.post(self.url("/api/Walks")), auth)
            .json(req)
            .send()
            .await?;
        Ok(check(resp)?.json().await?)
    }

    /// List open walk requests (the Safewalker's pending queue).
    pub async fn list_walks(&self, auth: &AuthContext) -> Result<Vec<Walk>, ApiError> {
        let resp = self
            .authed(self.http.get(self.url("/api/Walks")), auth)
            .send()
            .await?;
        Ok(check(resp)?.json().await?)
    }

    pub async fn get_walk(&self, auth: &AuthContext, id: &str) -> Result<Walk, ApiError> {
        let url = self.url(&format!("/api/Walks/{id}"));
        let resp = self.authed(self.http.get(url), auth).send().await?;
        Ok(check(resp)?.json().await?)
    }

    /// Read just the status code of a walk.
    pub async fn walk_status(
        &self,
        auth: &AuthContext,
        id: &str,
    ) -> Result<WalkStatus, ApiError> {
        let url = self.url(&format!("/api/Walks/{id}/status"));
        let resp = self.authed(self.http.get(url), auth).send().await?;
        let code: i32 = check(resp)?.json().await?;
        WalkStatus::try_from(code).map_err(ApiError::Decode)
    }

    pub async fn update_walk(
        &self,
        auth: &AuthContext,
        id: &str,
        update: &WalkUpdate,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/Walks/{id}"));
        let resp = self
            .authed(self.http.put(url), auth)
            .json(update)
            .send()
            .await?;
        check(resp)?;
        Ok(())
    }

    /// Delete a walk record. Deleting an already-deleted walk is success:
    /// denial and cancellation race against each other and against timeouts,
    /// and the end state is identical.
    pub async fn delete_walk(&self, auth: &AuthContext, id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/Walks/{id}"));
        let resp = self.authed(self.http.delete(url), auth).send().await?;
        match check(resp) {
            Ok(_) | Err(ApiError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    match ApiError::from_status(resp.status().as_u16()) {
        None => Ok(resp),
        Some(err) => {
            tracing::debug!(status = resp.status().as_u16(), "request failed");
            Err(err)
        }
    }
}
