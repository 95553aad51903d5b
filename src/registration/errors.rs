use crate::database::{DatabaseError, InviteStatus};
use crate::web_api::WebApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Invite code not found")]
    NotFound,
    #[error("Telegram user is already registered")]
    AlreadyRegistered,
    #[error("An invite code is required while registration is gated")]
    InviteRequired,
    #[error("Invalid invite code")]
    InvalidInvite,
    #[error("Invite code is {0}")]
    InviteUnavailable(InviteStatus),
    #[error("Invite code has expired")]
    InviteExpired,
    #[error("Username is already taken")]
    UsernameTaken,
    #[error("Web API error: {0}")]
    RemoteError(WebApiError),
    #[error("Only the creator may delete this invite code")]
    Forbidden,
    #[error("Invite code is already deleted")]
    AlreadyDeleted,
    #[error("User not found")]
    UserNotFound,
    #[error("Telegram user is not registered")]
    NotRegistered,
    #[error("A target user is required")]
    TargetRequired,
    #[error("Registration system is switched off")]
    SystemOff,
    #[error("Web user {user_id} was created but could not be stored or rolled back: {reason}")]
    OrphanedRemoteUser { user_id: String, reason: String },
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl RegistrationError {
    /// Failures of infrastructure rather than business rules.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            RegistrationError::RemoteError(_)
                | RegistrationError::OrphanedRemoteUser { .. }
                | RegistrationError::Storage(_)
        )
    }
}

impl From<WebApiError> for RegistrationError {
    fn from(e: WebApiError) -> Self {
        match e {
            WebApiError::UsernameTaken => RegistrationError::UsernameTaken,
            other => RegistrationError::RemoteError(other),
        }
    }
}
