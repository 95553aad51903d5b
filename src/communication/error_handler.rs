use crate::registration::RegistrationError;

pub fn map_registration_error_to_user_message(error: &RegistrationError) -> String {
    match error {
        RegistrationError::NotFound => "Invite code does not exist.".to_string(),
        RegistrationError::AlreadyRegistered => {
            "You are already registered, please do not register again.".to_string()
        }
        RegistrationError::InviteRequired | RegistrationError::InvalidInvite => {
            "Invalid invite code.".to_string()
        }
        RegistrationError::InviteUnavailable(status) => {
            format!("Invite code is no longer available (status: {}).", status)
        }
        RegistrationError::InviteExpired => "Invite code has expired.".to_string(),
        RegistrationError::UsernameTaken => {
            "This username is already taken, please choose another one.".to_string()
        }
        RegistrationError::Forbidden => {
            "You did not create this invite code and cannot delete it.".to_string()
        }
        RegistrationError::AlreadyDeleted => {
            "Invite code is already deleted, please do not repeat the operation.".to_string()
        }
        RegistrationError::UserNotFound => "That user does not exist.".to_string(),
        RegistrationError::NotRegistered => "You are not registered yet.".to_string(),
        RegistrationError::TargetRequired => usage::DELETE_USER.to_string(),
        RegistrationError::SystemOff => {
            "The system is switched off, please switch it on first.".to_string()
        }
        RegistrationError::RemoteError(_)
        | RegistrationError::OrphanedRemoteUser { .. }
        | RegistrationError::Storage(_) => {
            "Could not complete the request - please try again later".to_string()
        }
    }
}

pub mod usage {
    pub const REG_GATED: &str =
        "Please use the format: /reg invite_code,username,email(optional),password";
    pub const REG_OPEN: &str = "Please use the format: /reg username,email(optional),password";
    pub const REG_GATED_EMPTY: &str = "Invite code, username and password must not be empty.";
    pub const REG_OPEN_EMPTY: &str = "Username and password must not be empty.";
    pub const ADMIN_REG: &str = "Please use the format: /adminreg username,password";
    pub const DELETE_INVITE: &str =
        "Please specify the invite code to delete, e.g. /deleteinvite <code>";
    pub const DELETE_USER: &str = "Please specify the Telegram ID or user ID to delete, e.g. /deleteuser <telegram id> or /deleteuser <user id>";
}
