//! Main view: profile and notes of the signed-in user
//!
//! Every user action is a single request behind its own in-flight flag, and
//! every failure lands in that action's inline error slot. Only a 401 leaves
//! the view: the client has already torn the session down, and the action
//! reports [`ActionOutcome::SessionEnded`] so the caller routes to login.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::api::{ApiError, BackendApi};
use crate::models::{Note, User};
use crate::router::{Route, Router};
use crate::session::SessionController;
use crate::utils::InFlight;
use crate::validation::{validate_name, validate_note};

pub const FETCH_USER_FAILED: &str = "Failed to fetch user data";
pub const UPDATE_NAME_FAILED: &str = "Failed to update name";
pub const ADD_NOTE_FAILED: &str = "Failed to add note";
pub const DELETE_NOTE_FAILED: &str = "Failed to delete note";
pub const DELETE_ACCOUNT_FAILED: &str = "Failed to delete account";
pub const LOGOUT_FAILED: &str = "Failed to log out";
pub const ACTION_IN_PROGRESS: &str = "Another request is still in progress.";

/// What happened to a user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// Refused before any request was sent (in-flight guard, then validation)
    Rejected(String),
    /// The request failed; the message is also in the action's error slot
    Failed(String),
    /// The backend rejected the session; the next route is login
    SessionEnded,
    /// Logout or account deletion finished; the next route is login
    SignedOut,
}

impl ActionOutcome {
    /// Whether the caller should leave the main view
    #[must_use]
    pub const fn leaves_view(&self) -> bool {
        matches!(self, Self::SessionEnded | Self::SignedOut)
    }
}

/// Inline error slots, one per action
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ViewErrors {
    pub load: Option<String>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub account: Option<String>,
}

#[derive(Debug, Default)]
struct ViewState {
    user: Option<User>,
    errors: ViewErrors,
}

#[derive(Debug)]
pub struct HomeView {
    api: BackendApi,
    router: Router,
    state: Mutex<ViewState>,
    loading: InFlight,
    name_update: InFlight,
    // Adding and deleting notes share one flag
    note_change: InFlight,
    account_deletion: InFlight,
}

impl HomeView {
    #[must_use]
    pub fn new(api: BackendApi) -> Self {
        let router = Router::new(api.client().session().clone());
        Self {
            api,
            router,
            state: Mutex::default(),
            loading: InFlight::new(),
            name_update: InFlight::new(),
            note_change: InFlight::new(),
            account_deletion: InFlight::new(),
        }
    }

    fn session(&self) -> &Arc<SessionController> {
        self.api.client().session()
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    #[must_use]
    pub fn notes(&self) -> Vec<Note> {
        self.state()
            .user
            .as_ref()
            .map(|user| user.notes.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn errors(&self) -> ViewErrors {
        self.state().errors.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.is_active()
    }

    #[must_use]
    pub fn is_updating_name(&self) -> bool {
        self.name_update.is_active()
    }

    #[must_use]
    pub fn is_changing_notes(&self) -> bool {
        self.note_change.is_active()
    }

    #[must_use]
    pub fn is_deleting_account(&self) -> bool {
        self.account_deletion.is_active()
    }

    /// Route the client should show after the last action
    #[must_use]
    pub fn next_route(&self) -> Route {
        self.router.resolve(Route::Home.path()).route()
    }

    /// Fetch the profile and notes
    pub async fn load(&self) -> ActionOutcome {
        let Some(_guard) = self.loading.try_begin() else {
            return ActionOutcome::Rejected(ACTION_IN_PROGRESS.to_string());
        };

        match self.api.me().await {
            Ok(user) => {
                let mut state = self.state();
                state.user = Some(user);
                state.errors.load = None;
                ActionOutcome::Completed
            }
            Err(e) => self.fail(&e, FETCH_USER_FAILED, |errors| &mut errors.load),
        }
    }

    /// Change the display name
    pub async fn update_name(&self, new_name: &str) -> ActionOutcome {
        let Some(_guard) = self.name_update.try_begin() else {
            return ActionOutcome::Rejected(ACTION_IN_PROGRESS.to_string());
        };
        if let Err(e) = validate_name(new_name) {
            self.state().errors.name = Some(e.to_string());
            return ActionOutcome::Rejected(e.to_string());
        }
        self.state().errors.name = None;

        match self.api.update_name(new_name).await {
            Ok(updated) => {
                if let Some(user) = self.state().user.as_mut() {
                    user.name = updated.name;
                }
                ActionOutcome::Completed
            }
            Err(e) => self.fail(&e, UPDATE_NAME_FAILED, |errors| &mut errors.name),
        }
    }

    /// Create a note and append it to the list
    pub async fn add_note(&self, content: &str) -> ActionOutcome {
        let Some(_guard) = self.note_change.try_begin() else {
            return ActionOutcome::Rejected(ACTION_IN_PROGRESS.to_string());
        };
        if let Err(e) = validate_note(content) {
            self.state().errors.notes = Some(e.to_string());
            return ActionOutcome::Rejected(e.to_string());
        }
        self.state().errors.notes = None;

        match self.api.add_note(content).await {
            Ok(note) => {
                if let Some(user) = self.state().user.as_mut() {
                    user.notes.push(note);
                }
                ActionOutcome::Completed
            }
            Err(e) => self.fail(&e, ADD_NOTE_FAILED, |errors| &mut errors.notes),
        }
    }

    /// Delete a note and drop it from the list
    pub async fn delete_note(&self, id: Uuid) -> ActionOutcome {
        let Some(_guard) = self.note_change.try_begin() else {
            return ActionOutcome::Rejected(ACTION_IN_PROGRESS.to_string());
        };
        self.state().errors.notes = None;

        match self.api.delete_note(id).await {
            Ok(()) => {
                if let Some(user) = self.state().user.as_mut() {
                    user.notes.retain(|note| note.id != id);
                }
                ActionOutcome::Completed
            }
            Err(e) => self.fail(&e, DELETE_NOTE_FAILED, |errors| &mut errors.notes),
        }
    }

    /// Delete the account, then end the session
    pub async fn delete_account(&self) -> ActionOutcome {
        let Some(_guard) = self.account_deletion.try_begin() else {
            return ActionOutcome::Rejected(ACTION_IN_PROGRESS.to_string());
        };
        self.state().errors.account = None;

        match self.api.delete_account().await {
            Ok(response) => {
                log::info!("{}", response.message);
                if self.session().account_deleted().is_err() {
                    self.state().errors.account = Some(DELETE_ACCOUNT_FAILED.to_string());
                    return ActionOutcome::Failed(DELETE_ACCOUNT_FAILED.to_string());
                }
                self.state().user = None;
                ActionOutcome::SignedOut
            }
            Err(e) => self.fail(&e, DELETE_ACCOUNT_FAILED, |errors| &mut errors.account),
        }
    }

    /// End the session locally
    pub fn logout(&self) -> ActionOutcome {
        if self.session().logout().is_err() {
            self.state().errors.account = Some(LOGOUT_FAILED.to_string());
            return ActionOutcome::Failed(LOGOUT_FAILED.to_string());
        }
        self.state().user = None;
        ActionOutcome::SignedOut
    }

    fn fail(
        &self,
        error: &ApiError,
        message: &str,
        slot: impl FnOnce(&mut ViewErrors) -> &mut Option<String>,
    ) -> ActionOutcome {
        if error.is_unauthorized() {
            // Tokens are already gone; the view is left as it was
            return ActionOutcome::SessionEnded;
        }

        log::debug!("{message}: {error}");
        *slot(&mut self.state().errors) = Some(message.to_string());
        ActionOutcome::Failed(message.to_string())
    }
}
