//! Typed calls to the notes backend

use uuid::Uuid;

use super::client::AuthenticatedHttpClient;
use super::error::ApiError;
use crate::models::{DeleteAccountResponse, NewNote, Note, User};

pub const ME_PATH: &str = "/users/me";
pub const NAME_PATH: &str = "/users/me/name";
pub const NOTES_PATH: &str = "/users/me/notes";

#[derive(Debug, Clone)]
pub struct BackendApi {
    client: AuthenticatedHttpClient,
}

impl BackendApi {
    #[must_use]
    pub fn new(client: AuthenticatedHttpClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &AuthenticatedHttpClient {
        &self.client
    }

    /// Fetch the signed-in user's profile
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.client.get(ME_PATH).await
    }

    /// Rename the signed-in user
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn update_name(&self, new_name: &str) -> Result<User, ApiError> {
        self.client
            .put_query(NAME_PATH, &[("new_name", new_name)])
            .await
    }

    /// Create a note
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn add_note(&self, content: &str) -> Result<Note, ApiError> {
        let body = NewNote {
            content: content.to_string(),
        };
        self.client.post_json(NOTES_PATH, &body).await
    }

    /// Delete a note by id
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn delete_note(&self, id: Uuid) -> Result<(), ApiError> {
        self.client
            .delete_discarding(&format!("{NOTES_PATH}/{id}"))
            .await
    }

    /// Delete the signed-in user's account
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    pub async fn delete_account(&self) -> Result<DeleteAccountResponse, ApiError> {
        self.client.delete(ME_PATH).await
    }
}
