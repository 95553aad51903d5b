use crate::communication::commands::{AdminRegForm, Command, FormError, RegistrationForm};
use crate::communication::error_handler::{map_registration_error_to_user_message, usage};
use crate::database::InviteCode;
use crate::registration::{RegistrationError, RegistrationService, SystemStatus};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const NOT_ADMIN: &str = "You are not an admin and cannot perform this operation.";

/// Turns one inbound command into one reply text.
pub struct CommandDispatcher {
    registration: Arc<RegistrationService>,
    admin_ids: Vec<i64>,
    error_sender: mpsc::Sender<String>,
}

impl CommandDispatcher {
    pub fn new(
        registration: Arc<RegistrationService>,
        admin_ids: Vec<i64>,
        error_sender: mpsc::Sender<String>,
    ) -> Self {
        Self {
            registration,
            admin_ids,
            error_sender,
        }
    }

    fn is_admin(&self, telegram_id: i64) -> bool {
        self.admin_ids.contains(&telegram_id)
    }

    pub async fn handle(&self, telegram_id: i64, text: &str) -> String {
        let Some(command) = Command::parse(text) else {
            return "Unrecognised message. Send /help to see the available commands."
                .to_string();
        };

        let is_admin = self.is_admin(telegram_id);
        if command.requires_admin() && !is_admin {
            warn!(telegram_id = %telegram_id, command = command_name(&command), "Admin command from non-admin");
            return NOT_ADMIN.to_string();
        }

        let reply = match command {
            Command::Start => Ok(self.start_message().await),
            Command::Help => Ok(help_message(is_admin)),
            Command::NewInvite => self
                .registration
                .create_invite(telegram_id)
                .await
                .map(|invite| format!("New invite code generated: {}", invite.code)),
            Command::ListInvite => self
                .registration
                .list_invites()
                .await
                .map(|invites| format_invite_list(&invites)),
            Command::DeleteInvite(None) => Ok(usage::DELETE_INVITE.to_string()),
            Command::DeleteInvite(Some(code)) => self
                .registration
                .delete_invite(&code, telegram_id)
                .await
                .map(|invite| format!("Invite code {} has been deleted.", invite.code)),
            Command::DeleteUser(target) => self.delete_user(telegram_id, target, is_admin).await,
            Command::Switch => {
                let status = self.registration.switch_status().await;
                info!(telegram_id = %telegram_id, status = %status, "Admin switched system status");
                Ok(format!("System switched to: {}", status))
            }
            Command::AdminReg(args) => self.admin_register(&args).await,
            Command::Reg(args) => self.register(telegram_id, &args).await,
            Command::Unknown(name) => Ok(format!(
                "Unknown command /{}. Send /help to see the available commands.",
                name
            )),
        };

        match reply {
            Ok(reply) => reply,
            Err(e) => {
                self.report(telegram_id, text, &e).await;
                map_registration_error_to_user_message(&e)
            }
        }
    }

    async fn start_message(&self) -> String {
        match self.registration.system_status().await {
            SystemStatus::On => format!(
                "Welcome to the registration system.\nPlease register with an invite code.\n{}",
                usage::REG_GATED
            ),
            SystemStatus::Off => format!(
                "Welcome to the registration system.\nPlease register with a username and password.\n{}",
                usage::REG_OPEN
            ),
        }
    }

    async fn register(&self, telegram_id: i64, args: &str) -> Result<String, RegistrationError> {
        let status = self.registration.system_status().await;
        let form = match RegistrationForm::parse(args, status) {
            Ok(form) => form,
            Err(e) => {
                warn!(telegram_id = %telegram_id, status = %status, error = %e, "Malformed registration");
                return Ok(match (status, e) {
                    (SystemStatus::On, FormError::Format) => usage::REG_GATED,
                    (SystemStatus::Off, FormError::Format) => usage::REG_OPEN,
                    (SystemStatus::On, FormError::MissingFields) => usage::REG_GATED_EMPTY,
                    (SystemStatus::Off, FormError::MissingFields) => usage::REG_OPEN_EMPTY,
                }
                .to_string());
            }
        };

        let username = form.username.clone();
        self.registration
            .register(form.into_request(telegram_id), status)
            .await?;
        Ok(format!("Registration successful! Your username is: {}.", username))
    }

    async fn admin_register(&self, args: &str) -> Result<String, RegistrationError> {
        let form = match AdminRegForm::parse(args) {
            Ok(form) => form,
            Err(_) => return Ok(usage::ADMIN_REG.to_string()),
        };

        self.registration
            .admin_register(&form.username, &form.password)
            .await?;
        Ok(format!(
            "User registered by admin successfully! Username: {}.",
            form.username
        ))
    }

    async fn delete_user(
        &self,
        telegram_id: i64,
        target: Option<String>,
        is_admin: bool,
    ) -> Result<String, RegistrationError> {
        if is_admin && target.is_none() {
            return Ok(usage::DELETE_USER.to_string());
        }

        let user = self
            .registration
            .delete_user(telegram_id, target.as_deref(), is_admin)
            .await?;
        Ok(if is_admin {
            format!(
                "User {} (Telegram ID: {}) has been deleted successfully!",
                user.id, user.telegram_id
            )
        } else {
            format!("User {} has been deleted successfully!", user.telegram_id)
        })
    }

    // Business-rule failures are expected; infrastructure failures also go to the alert channel
    async fn report(&self, telegram_id: i64, text: &str, error: &RegistrationError) {
        if !error.is_operational() {
            warn!(telegram_id = %telegram_id, error = %error, "Command rejected");
            return;
        }

        error!(telegram_id = %telegram_id, error = %error, "Command failed");
        let command = text.split_whitespace().next().unwrap_or_default();
        let alert = format!(
            "❌ Command Failed\n\nUser: {}\nCommand: {}\nError: {}",
            telegram_id, command, error
        );
        let _ = self.error_sender.send(alert).await;
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Start => "start",
        Command::Help => "help",
        Command::NewInvite => "newinvite",
        Command::ListInvite => "listinvite",
        Command::DeleteInvite(_) => "deleteinvite",
        Command::DeleteUser(_) => "deleteuser",
        Command::Switch => "switch",
        Command::AdminReg(_) => "adminreg",
        Command::Reg(_) => "reg",
        Command::Unknown(_) => "unknown",
    }
}

fn help_message(is_admin: bool) -> String {
    let mut help = String::from(
        "Available commands:\n\
         /start - show the welcome message\n\
         /reg - register an account\n\
         /deleteuser - delete your account\n\
         /help - show this message",
    );
    if is_admin {
        help.push_str(
            "\n\nAdmin commands:\n\
             /newinvite - generate an invite code\n\
             /listinvite - list all invite codes\n\
             /deleteinvite <code> - delete an invite code you created\n\
             /deleteuser <telegram id|user id> - delete a user\n\
             /switch - toggle invite-only registration\n\
             /adminreg <username>,<password> - register a user directly",
        );
    }
    help
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| ts.to_string())
}

pub fn format_invite_list(invites: &[InviteCode]) -> String {
    if invites.is_empty() {
        return "No invite codes yet.".to_string();
    }

    let mut response = String::from("Invite codes:\n");
    for invite in invites {
        response.push_str(&format!(
            "Code: {}\nStatus: {}\nCreated: {}\nExpires: {}\nCreator ID: {}\n---\n",
            invite.code,
            invite.status,
            format_timestamp(invite.create_time),
            format_timestamp(invite.expire_time),
            invite.creator
        ));
    }
    response
}
