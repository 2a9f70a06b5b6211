//! Backend seam for the coordinators.
//!
//! [`Backend`] mirrors the slice of the REST surface the coordinators use,
//! so the coordination logic can run against [`api::ApiClient`] in the app
//! and against scripted in-memory fakes in tests — the same discipline as
//! the [`store::KeyValueStore`] seam under the session mirror.

use api::{
    ApiClient, ApiError, AuthContext, LoginResponse, RegisterRequest, Walk, WalkRequest,
    WalkStatus, WalkUpdate,
};
use store::UserType;

/// The slice of the REST surface the coordinators depend on.
pub trait Backend {
    fn login(
        &self,
        user_type: UserType,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<LoginResponse, ApiError>> + Send;

    fn register(
        &self,
        req: &RegisterRequest,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    fn user_exists(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<bool, ApiError>> + Send;

    fn create_walk(
        &self,
        auth: &AuthContext,
        req: &WalkRequest,
    ) -> impl std::future::Future<Output = Result<Walk, ApiError>> + Send;

    fn get_walk(
        &self,
        auth: &AuthContext,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Walk, ApiError>> + Send;

    fn walk_status(
        &self,
        auth: &AuthContext,
        id: &str,
    ) -> impl std::future::Future<Output = Result<WalkStatus, ApiError>> + Send;

    fn update_walk(
        &self,
        auth: &AuthContext,
        id: &str,
        update: &WalkUpdate,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    fn delete_walk(
        &self,
        auth: &AuthContext,
        id: &str,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;
}

impl Backend for ApiClient {
    async fn login(
        &self,
        user_type: UserType,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        ApiClient::login(self, user_type, email, password).await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<(), ApiError> {
        ApiClient::register(self, req).await
    }

    async fn user_exists(&self, email: &str) -> Result<bool, ApiError> {
        ApiClient::user_exists(self, email).await
    }

    async fn create_walk(&self, auth: &AuthContext, req: &WalkRequest) -> Result<Walk, ApiError> {
        ApiClient::create_walk(self, auth, req).await
    }

    async fn get_walk(&self, auth: &AuthContext, id: &str) -> Result<Walk, ApiError> {
        ApiClient::get_walk(self, auth, id).await
    }

    async fn walk_status(&self, auth: &AuthContext, id: &str) -> Result<WalkStatus, ApiError> {
        ApiClient::walk_status(self, auth, id).await
    }

    async fn update_walk(
        &self,
        auth: &AuthContext,
        id: &str,
        update: &WalkUpdate,
    ) -> Result<(), ApiError> {
        ApiClient::update_walk(self, auth, id, update).await
    }

    async fn delete_walk(&self, auth: &AuthContext, id: &str) -> Result<(), ApiError> {
        ApiClient::delete_walk(self, auth, id).await
    }
}
