use crate::registration::{RegistrationRequest, SystemStatus};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    NewInvite,
    ListInvite,
    DeleteInvite(Option<String>),
    DeleteUser(Option<String>),
    Switch,
    AdminReg(String),
    Reg(String),
    Unknown(String),
}

impl Command {
    /// Parses `/name[@bot] args`. Returns `None` for text that is not a command.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let optional = |args: &str| {
            args.split_whitespace().next().map(str::to_string)
        };

        let command = match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "newinvite" => Command::NewInvite,
            "listinvite" => Command::ListInvite,
            "deleteinvite" => Command::DeleteInvite(optional(args)),
            "deleteuser" => Command::DeleteUser((!args.is_empty()).then(|| args.to_string())),
            "switch" => Command::Switch,
            "adminreg" => Command::AdminReg(args.to_string()),
            "reg" => Command::Reg(args.to_string()),
            _ => Command::Unknown(name),
        };
        Some(command)
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::NewInvite
                | Command::ListInvite
                | Command::DeleteInvite(_)
                | Command::Switch
                | Command::AdminReg(_)
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("wrong number of fields")]
    Format,
    #[error("required field is empty")]
    MissingFields,
}

fn fields(args: &str) -> Vec<String> {
    args.split(',').map(|f| f.trim().to_string()).collect()
}

/// `/reg` arguments, whose shape depends on whether invites are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub invite_code: Option<String>,
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

impl RegistrationForm {
    // On:  code,username[,email],password
    // Off: username[,email],password
    // The password is always the last field.
    pub fn parse(args: &str, status: SystemStatus) -> Result<Self, FormError> {
        if !args.contains(',') {
            return Err(FormError::Format);
        }
        let mut parts = fields(args);

        let invite_code = match status {
            SystemStatus::On => {
                if parts.len() < 3 {
                    return Err(FormError::Format);
                }
                Some(parts.remove(0))
            }
            SystemStatus::Off => None,
        };

        let password = parts.pop().unwrap_or_default();
        let username = parts.first().cloned().unwrap_or_default();
        let email = parts.get(1).filter(|e| !e.is_empty()).cloned();

        if username.is_empty()
            || password.is_empty()
            || invite_code.as_deref().is_some_and(str::is_empty)
        {
            return Err(FormError::MissingFields);
        }

        Ok(Self {
            invite_code,
            username,
            email,
            password,
        })
    }

    pub fn into_request(self, telegram_id: i64) -> RegistrationRequest {
        RegistrationRequest {
            telegram_id,
            invite_code: self.invite_code,
            username: self.username,
            email: self.email,
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRegForm {
    pub username: String,
    pub password: String,
}

impl AdminRegForm {
    pub fn parse(args: &str) -> Result<Self, FormError> {
        let parts = fields(args);
        if parts.len() < 2 {
            return Err(FormError::Format);
        }
        let (username, password) = (parts[0].clone(), parts[1].clone());
        if username.is_empty() || password.is_empty() {
            return Err(FormError::MissingFields);
        }
        Ok(Self { username, password })
    }
}
