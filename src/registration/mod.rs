use crate::core::KeyedLocks;
use crate::database::{DatabaseError, DatabaseService, InviteCode, InviteStatus, User};
use crate::web_api::{NewWebUser, WebUserApi};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

mod errors;


pub use errors::RegistrationError;

/// Whether registration currently requires an invite code.
///
/// Held in memory only, so every restart begins `On`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SystemStatus {
    #[default]
    On,
    Off,
}

impl SystemStatus {
    pub fn toggled(self) -> Self {
        match self {
            SystemStatus::On => SystemStatus::Off,
            SystemStatus::Off => SystemStatus::On,
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemStatus::On => f.write_str("on"),
            SystemStatus::Off => f.write_str("off"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub telegram_id: i64,
    pub invite_code: Option<String>,
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

/// How an admin names the user to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSelector {
    TelegramId(i64),
    UserId(String),
}

impl UserSelector {
    // Numeric targets are telegram ids, anything else is a web user id
    pub fn parse(target: &str) -> Self {
        let target = target.trim();
        match target.parse::<i64>() {
            Ok(id) => UserSelector::TelegramId(id),
            Err(_) => UserSelector::UserId(target.to_string()),
        }
    }
}

pub struct RegistrationService {
    database: Arc<DatabaseService>,
    web_api: Arc<dyn WebUserApi>,
    status: RwLock<SystemStatus>,
    locks: KeyedLocks,
}

impl RegistrationService {
    pub fn new(database: Arc<DatabaseService>, web_api: Arc<dyn WebUserApi>) -> Self {
        Self {
            database,
            web_api,
            status: RwLock::new(SystemStatus::On),
            locks: KeyedLocks::new(),
        }
    }

    pub async fn system_status(&self) -> SystemStatus {
        *self.status.read().await
    }

    pub async fn switch_status(&self) -> SystemStatus {
        let mut status = self.status.write().await;
        *status = status.toggled();
        info!(status = %*status, "System status switched");
        *status
    }

    async fn require_on(&self) -> Result<(), RegistrationError> {
        match self.system_status().await {
            SystemStatus::On => Ok(()),
            SystemStatus::Off => Err(RegistrationError::SystemOff),
        }
    }

    /// Registers a telegram user with the web application.
    ///
    /// `status` is the system status the request was parsed under. Returns the
    /// web user id.
    pub async fn register(
        &self,
        request: RegistrationRequest,
        status: SystemStatus,
    ) -> Result<String, RegistrationError> {
        let telegram_id = request.telegram_id;
        let _user_guard = self.locks.lock_telegram_id(telegram_id).await;

        match self.database.get_user_by_telegram_id(telegram_id).await {
            Ok(_) => return Err(RegistrationError::AlreadyRegistered),
            Err(DatabaseError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let (invite_code, _invite_guard) = match status {
            SystemStatus::On => {
                let code = request
                    .invite_code
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or(RegistrationError::InviteRequired)?
                    .to_string();
                let guard = self.locks.lock_invite_code(&code).await;
                self.check_invite(&code).await?;
                (Some(code), Some(guard))
            }
            SystemStatus::Off => (None, None),
        };

        let new_user = NewWebUser {
            username: request.username.clone(),
            email: request.email.clone(),
            password: request.password.clone(),
        };
        let user_id = self.web_api.create_user(&new_user).await?;

        let stored = match invite_code.as_deref() {
            Some(code) => {
                self.database
                    .create_user_with_invite(&user_id, telegram_id, code)
                    .await
            }
            None => self.database.create_user(&user_id, telegram_id, None).await,
        };

        if let Err(e) = stored {
            return Err(self.compensate_remote_user(&user_id, e).await);
        }

        info!(
            telegram_id = %telegram_id,
            user_id = %user_id,
            username = %request.username,
            invite_code = ?invite_code,
            "User registered"
        );
        Ok(user_id)
    }

    // Validates an invite for use, expiring it on the way if it is past due
    async fn check_invite(&self, code: &str) -> Result<InviteCode, RegistrationError> {
        let invite = match self.database.get_invite_code(code).await {
            Ok(invite) => invite,
            Err(DatabaseError::NotFound(_)) => return Err(RegistrationError::InvalidInvite),
            Err(e) => return Err(e.into()),
        };

        if !invite.status.can_transition_to(InviteStatus::Used) {
            return Err(RegistrationError::InviteUnavailable(invite.status));
        }

        if invite.is_expired_at(Utc::now().timestamp()) {
            self.database
                .set_invite_code_status(code, InviteStatus::Expired)
                .await?;
            warn!(code = %code, expire_time = %invite.expire_time, "Invite code expired");
            return Err(RegistrationError::InviteExpired);
        }

        Ok(invite)
    }

    // The local write failed after the web user was created; undo the remote side
    async fn compensate_remote_user(
        &self,
        user_id: &str,
        cause: DatabaseError,
    ) -> RegistrationError {
        // An id already stored locally belongs to another user's web account; leave it alone
        if let DatabaseError::DuplicateKey(_) = cause {
            match self.database.get_user_by_user_id(user_id).await {
                Ok(existing) => {
                    error!(
                        user_id = %user_id,
                        owner_telegram_id = %existing.telegram_id,
                        error = %cause,
                        "Web API returned an id that is already stored locally"
                    );
                    return RegistrationError::Storage(cause);
                }
                Err(DatabaseError::NotFound(_)) => {}
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "Could not check for a colliding web user id");
                    return RegistrationError::Storage(cause);
                }
            }
        }

        error!(user_id = %user_id, error = %cause, "Failed to store registered user, removing web user");

        if let Err(e) = self.web_api.delete_user(user_id).await {
            error!(user_id = %user_id, error = %e, "Failed to remove orphaned web user");
            return RegistrationError::OrphanedRemoteUser {
                user_id: user_id.to_string(),
                reason: format!("{cause}; rollback failed: {e}"),
            };
        }

        match cause {
            DatabaseError::Conflict(ref code) => {
                warn!(user_id = %user_id, reason = %code, "Invite spent before the user was stored");
                RegistrationError::InviteUnavailable(InviteStatus::Used)
            }
            DatabaseError::DuplicateKey(_) => RegistrationError::AlreadyRegistered,
            other => RegistrationError::Storage(other),
        }
    }

    /// Creates a web user on an admin's behalf, without binding it to a telegram id.
    pub async fn admin_register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, RegistrationError> {
        let user_id = self
            .web_api
            .create_user(&NewWebUser {
                username: username.to_string(),
                email: None,
                password: password.to_string(),
            })
            .await?;

        info!(user_id = %user_id, username = %username, "Admin registered web user");
        Ok(user_id)
    }

    /// Deletes a user from the web application and then locally.
    ///
    /// Non-admins can only delete themselves and `target` is ignored for them.
    /// The local row is kept whenever the remote delete fails.
    pub async fn delete_user(
        &self,
        requester: i64,
        target: Option<&str>,
        is_admin: bool,
    ) -> Result<User, RegistrationError> {
        let selector = if is_admin {
            let target = target
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(RegistrationError::TargetRequired)?;
            UserSelector::parse(target)
        } else {
            UserSelector::TelegramId(requester)
        };

        let missing = if is_admin {
            RegistrationError::UserNotFound
        } else {
            RegistrationError::NotRegistered
        };

        let telegram_id = match &selector {
            UserSelector::TelegramId(id) => *id,
            UserSelector::UserId(user_id) => {
                match self.database.get_user_by_user_id(user_id).await {
                    Ok(user) => user.telegram_id,
                    Err(DatabaseError::NotFound(_)) => return Err(missing),
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let _guard = self.locks.lock_telegram_id(telegram_id).await;

        // Re-read under the lock; the row may have changed while we waited
        let user = match self.database.get_user_by_telegram_id(telegram_id).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound(_)) => return Err(missing),
            Err(e) => return Err(e.into()),
        };
        if let UserSelector::UserId(user_id) = &selector {
            if &user.id != user_id {
                return Err(missing);
            }
        }

        self.web_api.delete_user(&user.id).await.map_err(|e| {
            error!(user_id = %user.id, telegram_id = %telegram_id, error = %e, "Remote delete failed, keeping local user");
            RegistrationError::RemoteError(e)
        })?;

        self.database.delete_user_by_telegram_id(telegram_id).await?;

        info!(
            requester = %requester,
            user_id = %user.id,
            telegram_id = %telegram_id,
            "User deleted"
        );
        Ok(user)
    }

    pub async fn create_invite(&self, creator: i64) -> Result<InviteCode, RegistrationError> {
        self.require_on().await?;

        let code = Uuid::new_v4().to_string();
        let invite = self.database.create_invite_code(&code, creator).await?;

        info!(code = %invite.code, creator = %creator, "Invite code issued");
        Ok(invite)
    }

    pub async fn list_invites(&self) -> Result<Vec<InviteCode>, RegistrationError> {
        self.require_on().await?;
        Ok(self.database.list_invite_codes().await?)
    }

    /// Marks an unused invite as deleted. Only its creator may do this.
    pub async fn delete_invite(
        &self,
        code: &str,
        requester: i64,
    ) -> Result<InviteCode, RegistrationError> {
        self.require_on().await?;
        let _guard = self.locks.lock_invite_code(code).await;

        let mut invite = match self.database.get_invite_code(code).await {
            Ok(invite) => invite,
            Err(DatabaseError::NotFound(_)) => return Err(RegistrationError::NotFound),
            Err(e) => return Err(e.into()),
        };

        if invite.creator != requester {
            warn!(code = %code, requester = %requester, creator = %invite.creator, "Invite deletion by non-creator");
            return Err(RegistrationError::Forbidden);
        }

        if invite.status == InviteStatus::Deleted {
            return Err(RegistrationError::AlreadyDeleted);
        }
        if !invite.status.can_transition_to(InviteStatus::Deleted) {
            return Err(RegistrationError::InviteUnavailable(invite.status));
        }

        self.database
            .set_invite_code_status(code, InviteStatus::Deleted)
            .await?;
        invite.status = InviteStatus::Deleted;

        info!(code = %code, requester = %requester, "Invite code deleted");
        Ok(invite)
    }
}
